//! Test fixtures for common workflow patterns
//!
//! Builders for controller objects in the shapes Catalyst Center returns
//! them, plus helpers that wire a [`MockCcc`] into a run.

use crate::mock::MockCcc;
use ccc_orch_common::{ModuleArgs, ModuleRunner, RunContext, RunResult, VirtualClock};
use serde_json::{json, Value};
use std::sync::{Arc, Once};

/// Version reported by default fixtures.
pub const DEFAULT_VERSION: &str = "2.3.7.9";

/// Module arguments pointing at a test controller.
pub fn module_args(state: &str, config: Vec<Value>) -> ModuleArgs {
    ModuleArgs::new("ccc.test.local")
        .with_version(DEFAULT_VERSION)
        .with_state(state)
        .with_config(config)
}

/// A run context over `mock` with a virtual clock, so polling loops
/// finish instantly.
pub fn run_context(mock: Arc<MockCcc>, args: ModuleArgs) -> (RunContext, Arc<VirtualClock>) {
    let clock = Arc::new(VirtualClock::new());
    let ctx = RunContext::new(mock, args).with_clock(clock.clone());
    (ctx, clock)
}

/// Runs a module once against `mock`.
pub async fn run_module(runner: &dyn ModuleRunner, mock: &Arc<MockCcc>, args: ModuleArgs) -> (RunResult, RunContext) {
    let (mut ctx, _clock) = run_context(mock.clone(), args);
    let result = runner.run(&mut ctx).await;
    (result, ctx)
}

/// Routes `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Network device as returned by `devices.get_device_list`.
#[derive(Debug, Clone)]
pub struct DeviceFixture {
    value: Value,
}

impl DeviceFixture {
    /// Reachable, managed Catalyst 9300 switch.
    pub fn new(id: &str) -> Self {
        Self {
            value: json!({
                "id": id,
                "hostname": format!("{}.example.com", id),
                "managementIpAddress": null,
                "serialNumber": format!("FOC{}", id.to_uppercase()),
                "platformId": "C9300-48U",
                "family": "Switches and Hubs",
                "reachabilityStatus": "Reachable",
                "collectionStatus": "Managed",
                "softwareType": "IOS-XE"
            }),
        }
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.value["managementIpAddress"] = json!(ip);
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.value["hostname"] = json!(hostname);
        self
    }

    pub fn with_serial(mut self, serial: &str) -> Self {
        self.value["serialNumber"] = json!(serial);
        self
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.value["platformId"] = json!(platform);
        self
    }

    pub fn with_family(mut self, family: &str) -> Self {
        self.value["family"] = json!(family);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.value["reachabilityStatus"] = json!("Unreachable");
        self
    }

    pub fn build(self) -> Value {
        self.value
    }
}

/// Site as returned by `site_design.get_sites`.
pub fn site(id: &str, name_hierarchy: &str, site_type: &str) -> Value {
    json!({
        "id": id,
        "name": name_hierarchy.rsplit('/').next().unwrap_or(name_hierarchy),
        "nameHierarchy": name_hierarchy,
        "type": site_type
    })
}

/// Fabric site or zone as returned by `sda.get_fabric_sites` / `get_fabric_zones`.
pub fn fabric(id: &str, site_id: &str) -> Value {
    json!({
        "id": id,
        "siteId": site_id,
        "authenticationProfileName": "No Authentication",
        "isPubSubEnabled": false
    })
}

/// Answers `site_design.get_sites` from a fixed site list, honouring the
/// `nameHierarchy` and `id` filters and paging.
pub fn serve_sites(mock: &MockCcc, sites: Vec<Value>) {
    mock.on("site_design", "get_sites", move |params| {
        let filtered: Vec<Value> = sites
            .iter()
            .filter(|s| match params.get("nameHierarchy").and_then(Value::as_str) {
                Some(name) => s["nameHierarchy"] == json!(name),
                None => true,
            })
            .filter(|s| match params.get("id").and_then(Value::as_str) {
                Some(id) => s["id"] == json!(id),
                None => true,
            })
            .cloned()
            .collect();
        Ok(json!({ "response": page(&filtered, params) }))
    });
}

/// Answers both fabric list endpoints, honouring `siteId` and `id` filters.
pub fn serve_fabrics(mock: &MockCcc, fabric_sites: Vec<Value>, fabric_zones: Vec<Value>) {
    serve_list(mock, "sda", "get_fabric_sites", fabric_sites, &["siteId", "id"]);
    serve_list(mock, "sda", "get_fabric_zones", fabric_zones, &["siteId", "id"]);
}

/// Answers `family.function` from a fixed list.
///
/// A request param named in `keys` must equal the item's value for the item
/// to be returned; results are paged like the controller pages them.
pub fn serve_list(mock: &MockCcc, family: &str, function: &str, items: Vec<Value>, keys: &'static [&'static str]) {
    mock.on(family, function, move |params| {
        let filtered: Vec<Value> = items
            .iter()
            .filter(|item| {
                keys.iter().all(|k| match params.get(*k) {
                    None | Some(Value::Null) => true,
                    Some(wanted) => &item[*k] == wanted,
                })
            })
            .cloned()
            .collect();
        Ok(json!({ "response": page(&filtered, params) }))
    });
}

/// Layer 3 virtual network as returned by `sda.get_layer3_virtual_networks`.
pub fn virtual_network(id: &str, name: &str, fabric_ids: &[&str], anchored_site_id: Option<&str>) -> Value {
    json!({
        "id": id,
        "virtualNetworkName": name,
        "fabricIds": fabric_ids,
        "anchoredSiteId": anchored_site_id
    })
}

/// Anycast gateway as returned by `sda.get_anycast_gateways`.
pub fn anycast_gateway(id: &str, fabric_id: &str, vn_name: &str, ip_pool_name: &str, vlan_id: u16) -> Value {
    json!({
        "id": id,
        "fabricId": fabric_id,
        "virtualNetworkName": vn_name,
        "ipPoolName": ip_pool_name,
        "tcpMssAdjustment": 1400,
        "vlanName": format!("VLAN_{}", vlan_id),
        "vlanId": vlan_id,
        "trafficType": "DATA",
        "poolType": null,
        "securityGroupName": null,
        "isCriticalPool": false,
        "isLayer2FloodingEnabled": false,
        "isWirelessPool": false,
        "isIpDirectedBroadcast": false,
        "isIntraSubnetRoutingEnabled": false,
        "isMultipleIpToMacAddresses": false,
        "isSupplicantBasedExtendedNodeOnboarding": false,
        "isGroupBasedPolicyEnforcementEnabled": false,
        "autoGenerateVlanName": false
    })
}

/// Answers `devices.get_device_list`, honouring the identifying filters.
pub fn serve_devices(mock: &MockCcc, devices: Vec<Value>) {
    mock.on("devices", "get_device_list", move |params| {
        let wanted = |key: &str, device: &Value| -> bool {
            match params.get(key) {
                None | Some(Value::Null) => true,
                Some(Value::Array(items)) => items.contains(&device[key]),
                Some(v) => &device[key] == v,
            }
        };
        let filtered: Vec<Value> = devices
            .iter()
            .filter(|d| ["managementIpAddress", "hostname", "serialNumber", "id"].iter().all(|k| wanted(*k, *d)))
            .cloned()
            .collect();
        Ok(json!({ "response": page(&filtered, params) }))
    });
}

/// Slice of `items` selected by the 1-based `offset` and `limit` params.
pub fn page(items: &[Value], params: &Value) -> Vec<Value> {
    let number = |v: &Value| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()));
    let offset = params.get("offset").and_then(number).unwrap_or(1).max(1) as usize;
    let limit = params.get("limit").and_then(number).unwrap_or(500) as usize;
    items.iter().skip(offset - 1).take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccc_client::CccApi;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_device_builder() {
        let device = DeviceFixture::new("d1").with_ip("10.0.0.1").unreachable().build();
        assert_eq!(device["managementIpAddress"], json!("10.0.0.1"));
        assert_eq!(device["reachabilityStatus"], json!("Unreachable"));
        assert_eq!(device["serialNumber"], json!("FOCD1"));
    }

    #[test]
    fn test_page() {
        let items: Vec<Value> = (0..7).map(|i| json!(i)).collect();
        assert_eq!(page(&items, &json!({"offset": 1, "limit": 5})).len(), 5);
        assert_eq!(page(&items, &json!({"offset": 6, "limit": 5})), vec![json!(5), json!(6)]);
        assert_eq!(page(&items, &json!({"offset": "11", "limit": "5"})).len(), 0);
    }

    #[tokio::test]
    async fn test_serve_sites_filters() {
        let mock = MockCcc::default();
        serve_sites(
            &mock,
            vec![site("s1", "Global/USA", "area"), site("s2", "Global/USA/SJC", "building")],
        );
        let resp = mock
            .invoke("site_design", "get_sites", &json!({"nameHierarchy": "Global/USA/SJC"}), false)
            .await
            .unwrap();
        assert_eq!(resp["response"][0]["id"], json!("s2"));
        assert_eq!(resp["response"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_serve_list_filters_on_keys() {
        let mock = MockCcc::default();
        serve_list(
            &mock,
            "sda",
            "get_anycast_gateways",
            vec![
                anycast_gateway("g1", "f1", "VN1", "POOL_1", 1021),
                anycast_gateway("g2", "f1", "VN2", "POOL_2", 1022),
            ],
            &["fabricId", "virtualNetworkName"],
        );
        let resp = mock
            .invoke("sda", "get_anycast_gateways", &json!({"fabricId": "f1", "virtualNetworkName": "VN2"}), false)
            .await
            .unwrap();
        assert_eq!(resp["response"].as_array().unwrap().len(), 1);
        assert_eq!(resp["response"][0]["id"], json!("g2"));
    }

    #[tokio::test]
    async fn test_serve_devices_filters() {
        let mock = MockCcc::default();
        serve_devices(
            &mock,
            vec![
                DeviceFixture::new("d1").with_ip("10.0.0.1").build(),
                DeviceFixture::new("d2").with_ip("10.0.0.2").build(),
            ],
        );
        let resp = mock
            .invoke(
                "devices",
                "get_device_list",
                &json!({"managementIpAddress": ["10.0.0.2"], "offset": 1, "limit": 500}),
                false,
            )
            .await
            .unwrap();
        assert_eq!(resp["response"][0]["id"], json!("d2"));
    }
}
