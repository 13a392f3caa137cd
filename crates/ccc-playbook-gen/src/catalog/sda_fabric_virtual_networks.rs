//! Layer 3 virtual networks and anycast gateways of SDA fabrics.
//!
//! Output replays through the `sda_fabric_virtual_networks` workflow:
//!
//! ```yaml
//! config:
//! - virtual_networks:
//!   - vn_name: VN_1
//!     fabric_site_locations:
//!     - site_name_hierarchy: Global/USA/SJC
//!       fabric_type: fabric_site
//! - anycast_gateways:
//!   - vn_name: VN_1
//!     fabric_site_location: {...}
//!     ip_pool_name: POOL_1
//! ```

use crate::component::{fetch_all, query_params, Component};
use crate::generator::Catalog;
use crate::resolve::ResolutionTable;
use crate::temp_spec::{NamedTransform, TempField, TempSpec};
use async_trait::async_trait;
use ccc_orch_common::{ArgSpec, FieldSpec, FieldType, Format, OrchResult, RunContext};
use ccc_types::CccVersion;
use serde_json::Value;

pub const MODULE_NAME: &str = "sda_fabric_virtual_networks_playbook_generator";

const SITE_FILTER: &str = "fabric_site_name_hierarchy";

const VN_QUERY: &[(&str, &str)] = &[("vn_name", "virtualNetworkName")];

const GATEWAY_QUERY: &[(&str, &str)] = &[
    ("vn_name", "virtualNetworkName"),
    ("ip_pool_name", "ipPoolName"),
    ("vlan_id", "vlanId"),
    ("vlan_name", "vlanName"),
];

pub fn catalog() -> Catalog {
    Catalog::new(MODULE_NAME, CccVersion::new(vec![2, 3, 7, 9]))
        .global_filter(
            SITE_FILTER,
            FieldSpec::list(FieldType::Str).format(Format::SiteHierarchy),
        )
        .component(VirtualNetworks::new())
        .component(AnycastGateways::new())
}

fn location_spec() -> TempSpec {
    TempSpec::new()
        .field("site_name_hierarchy", TempField::str())
        .field("fabric_type", TempField::str())
}

fn site_filter(global: &Value) -> Vec<String> {
    global
        .get(SITE_FILTER)
        .and_then(Value::as_array)
        .map(|sites| sites.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

pub struct VirtualNetworks {
    spec: TempSpec,
}

impl VirtualNetworks {
    pub fn new() -> Self {
        Self {
            spec: TempSpec::new()
                .field("vn_name", TempField::str().from("virtualNetworkName"))
                .field(
                    "fabric_site_locations",
                    TempField::list_of(location_spec())
                        .from("fabricIds")
                        .special(NamedTransform::ResolveFabricSites),
                )
                .field(
                    "anchored_site_name",
                    TempField::str()
                        .from("anchoredSiteId")
                        .special(NamedTransform::ResolveAnchoredSite),
                ),
        }
    }
}

impl Default for VirtualNetworks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for VirtualNetworks {
    fn name(&self) -> &'static str {
        "virtual_networks"
    }

    fn filter_spec(&self) -> ArgSpec {
        ArgSpec::new().field("vn_name", FieldSpec::str().required())
    }

    fn temp_spec(&self) -> &TempSpec {
        &self.spec
    }

    async fn fetch(&self, ctx: &RunContext, filters: &[Value]) -> OrchResult<Vec<Value>> {
        let queries: Vec<Value> = filters.iter().map(|f| query_params(f, VN_QUERY)).collect();
        fetch_all(ctx, "sda", "get_layer3_virtual_networks", &queries).await
    }

    /// A virtual network matches when any of its fabrics, or its anchor,
    /// sits on a listed site.
    fn matches_global(&self, raw: &Value, global: &Value, table: &ResolutionTable) -> bool {
        let sites = site_filter(global);
        if sites.is_empty() {
            return true;
        }
        let on_site = |v: &Value| v.as_str().is_some_and(|id| table.fabric_on_any_site(id, &sites));
        raw.get("fabricIds")
            .and_then(Value::as_array)
            .is_some_and(|ids| ids.iter().any(on_site))
            || raw.get("anchoredSiteId").is_some_and(on_site)
    }
}

pub struct AnycastGateways {
    spec: TempSpec,
}

impl AnycastGateways {
    pub fn new() -> Self {
        Self {
            spec: TempSpec::new()
                .field("vn_name", TempField::str().from("virtualNetworkName"))
                .field(
                    "fabric_site_location",
                    TempField::dict_of(location_spec())
                        .from("fabricId")
                        .special(NamedTransform::ResolveFabricSite),
                )
                .field("ip_pool_name", TempField::str().from("ipPoolName"))
                .field("tcp_mss_adjustment", TempField::int().from("tcpMssAdjustment"))
                .field("traffic_type", TempField::str().from("trafficType"))
                .field("pool_type", TempField::str().from("poolType"))
                .field("vlan_name", TempField::str().from("vlanName"))
                .field("vlan_id", TempField::int().from("vlanId"))
                .field("security_group_name", TempField::str().from("securityGroupName"))
                .field("auto_generate_vlan_name", TempField::bool().from("autoGenerateVlanName"))
                .field("is_critical_pool", TempField::bool().from("isCriticalPool"))
                .field("is_layer_2_flooding_enabled", TempField::bool().from("isLayer2FloodingEnabled"))
                .field("is_wireless_pool", TempField::bool().from("isWirelessPool"))
                .field("is_ip_directed_broadcast", TempField::bool().from("isIpDirectedBroadcast"))
                .field(
                    "is_intra_subnet_routing_enabled",
                    TempField::bool().from("isIntraSubnetRoutingEnabled"),
                )
                .field(
                    "is_multiple_ip_to_mac_addresses",
                    TempField::bool().from("isMultipleIpToMacAddresses"),
                )
                .field(
                    "is_supplicant_based_extended_node_onboarding",
                    TempField::bool().from("isSupplicantBasedExtendedNodeOnboarding"),
                )
                .field(
                    "is_group_based_policy_enforcement_enabled",
                    TempField::bool().from("isGroupBasedPolicyEnforcementEnabled"),
                ),
        }
    }
}

impl Default for AnycastGateways {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for AnycastGateways {
    fn name(&self) -> &'static str {
        "anycast_gateways"
    }

    fn filter_spec(&self) -> ArgSpec {
        ArgSpec::new()
            .field("vn_name", FieldSpec::str())
            .field("ip_pool_name", FieldSpec::str())
            .field("vlan_id", FieldSpec::int().range(2, 4093))
            .field("vlan_name", FieldSpec::str())
    }

    fn temp_spec(&self) -> &TempSpec {
        &self.spec
    }

    async fn fetch(&self, ctx: &RunContext, filters: &[Value]) -> OrchResult<Vec<Value>> {
        let queries: Vec<Value> = filters.iter().map(|f| query_params(f, GATEWAY_QUERY)).collect();
        fetch_all(ctx, "sda", "get_anycast_gateways", &queries).await
    }

    fn matches_global(&self, raw: &Value, global: &Value, table: &ResolutionTable) -> bool {
        let sites = site_filter(global);
        sites.is_empty()
            || raw
                .get("fabricId")
                .and_then(Value::as_str)
                .is_some_and(|id| table.fabric_on_any_site(id, &sites))
    }
}
