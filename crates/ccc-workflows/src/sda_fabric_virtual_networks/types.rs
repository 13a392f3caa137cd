//! Virtual network and anycast gateway shapes.

use ccc_orch_common::FabricType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Controller field names paired with playbook field names for gateway
/// attributes fixed at creation.
pub const GATEWAY_IMMUTABLE_FIELDS: &[(&str, &str)] = &[
    ("vlanName", "vlan_name"),
    ("vlanId", "vlan_id"),
    ("trafficType", "traffic_type"),
    ("poolType", "pool_type"),
    ("isCriticalPool", "is_critical_pool"),
    ("autoGenerateVlanName", "auto_generate_vlan_name"),
];

/// Gateway attributes an update may change.
pub const GATEWAY_MUTABLE_FIELDS: &[(&str, &str)] = &[
    ("tcpMssAdjustment", "tcp_mss_adjustment"),
    ("securityGroupName", "security_group_name"),
    ("isLayer2FloodingEnabled", "is_layer_2_flooding_enabled"),
    ("isWirelessPool", "is_wireless_pool"),
    ("isIpDirectedBroadcast", "is_ip_directed_broadcast"),
    ("isIntraSubnetRoutingEnabled", "is_intra_subnet_routing_enabled"),
    ("isMultipleIpToMacAddresses", "is_multiple_ip_to_mac_addresses"),
    (
        "isSupplicantBasedExtendedNodeOnboarding",
        "is_supplicant_based_extended_node_onboarding",
    ),
    (
        "isGroupBasedPolicyEnforcementEnabled",
        "is_group_based_policy_enforcement_enabled",
    ),
];

/// A fabric site or zone named in a playbook, resolved to its fabric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricLocation {
    pub site_name_hierarchy: String,
    pub fabric_type: FabricType,
    pub fabric_id: String,
}

/// Desired layer 3 virtual network.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualNetworkWant {
    /// Position in the block, for messages.
    pub index: usize,
    pub name: String,
    pub locations: Vec<FabricLocation>,
    pub anchored_fabric_id: Option<String>,
}

impl VirtualNetworkWant {
    pub fn fabric_ids(&self) -> Vec<String> {
        self.locations.iter().map(|l| l.fabric_id.clone()).collect()
    }
}

/// Desired anycast gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct AnycastGatewayWant {
    pub index: usize,
    pub location: FabricLocation,
    pub vn_name: String,
    pub ip_pool_name: String,
    /// The validated playbook entry; attribute comparison reads from it.
    pub entry: Value,
}

impl AnycastGatewayWant {
    pub fn label(&self) -> String {
        format!(
            "{}/{} on {}",
            self.vn_name, self.ip_pool_name, self.location.site_name_hierarchy
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FabricVnWant {
    pub virtual_networks: Vec<VirtualNetworkWant>,
    pub anycast_gateways: Vec<AnycastGatewayWant>,
}

/// A virtual network as `sda.get_layer3_virtual_networks` returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkRecord {
    pub id: String,
    pub virtual_network_name: String,
    #[serde(default)]
    pub fabric_ids: Option<Vec<String>>,
    #[serde(default)]
    pub anchored_site_id: Option<String>,
}

impl VirtualNetworkRecord {
    pub fn fabric_ids(&self) -> &[String] {
        self.fabric_ids.as_deref().unwrap_or_default()
    }
}

/// An anycast gateway; attributes are kept as returned so an update can
/// send the full object back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnycastGatewayRecord {
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl AnycastGatewayRecord {
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        obj.extend(self.attributes.clone());
        Value::Object(obj)
    }
}

/// Current state, index-aligned with [`FabricVnWant`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FabricVnHave {
    pub virtual_networks: Vec<Option<VirtualNetworkRecord>>,
    pub anycast_gateways: Vec<Option<AnycastGatewayRecord>>,
}

/// What one block did to one object kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSummary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_gateway_record_keeps_attributes() {
        let raw = json!({"id": "g1", "vlanId": 1021, "isWirelessPool": false, "securityGroupName": null});
        let record: AnycastGatewayRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.id, "g1");
        assert!(!record.attributes.contains_key("id"));
        assert_eq!(record.to_value(), raw);
    }

    #[test]
    fn test_virtual_network_null_fabrics() {
        let record: VirtualNetworkRecord = serde_json::from_value(json!({
            "id": "vn-1",
            "virtualNetworkName": "VN1",
            "fabricIds": null
        }))
        .unwrap();
        assert!(record.fabric_ids().is_empty());
        assert_eq!(record.anchored_site_id, None);
    }
}
