//! Maps SDK-style `(family, function)` names to REST routes.

use std::collections::HashMap;

/// HTTP verb of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns true if the verb carries a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

/// A single REST route. Path segments in braces are filled from params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub path: &'static str,
}

impl Route {
    pub const fn new(method: Method, path: &'static str) -> Self {
        Self { method, path }
    }

    /// Names of the `{placeholders}` in the path.
    pub fn path_params(&self) -> Vec<&'static str> {
        self.path
            .split('/')
            .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
            .collect()
    }
}

/// Lookup table from `(family, function)` to [`Route`].
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

fn key(family: &str, function: &str) -> String {
    format!("{}.{}", family, function)
}

macro_rules! routes {
    ($( $family:literal . $function:literal => $method:ident $path:literal ),* $(,)?) => {
        vec![ $( (key($family, $function), Route::new(Method::$method, concat!("/dna/intent/api/v1", $path))) ),* ]
    };
}

impl RouteTable {
    /// The routes used by the bundled workflows.
    pub fn standard() -> Self {
        let entries = routes![
            "task"."get_task_by_id" => Get "/task/{task_id}",
            "task"."get_tasks_by_id" => Get "/tasks/{id}",
            "platform"."release_summary" => Get "/dnac-release",
            "sites"."get_site" => Get "/site",
            "site_design"."get_sites" => Get "/sites",
            "site_design"."get_site_assigned_network_devices" => Get "/networkDevices/assignedToSite",
            "devices"."get_device_list" => Get "/network-device",
            "device_onboarding_pnp"."get_device_list" => Get "/onboarding/pnp-device",
            "system_settings"."get_authentication_and_policy_servers" => Get "/authentication-policy-servers",
            "system_settings"."add_authentication_and_policy_server_access_configuration" => Post "/authentication-policy-servers",
            "system_settings"."edit_authentication_and_policy_server_access_configuration" => Put "/authentication-policy-servers/{id}",
            "system_settings"."delete_authentication_and_policy_server_access_configuration" => Delete "/authentication-policy-servers/{id}",
            "system_settings"."accept_cisco_ise_server_certificate_for_cisco_ise_server_integration" => Put "/integrate-ise/{id}",
            "compliance"."run_compliance" => Post "/compliance/",
            "compliance"."get_compliance_status" => Get "/compliance",
            "compliance"."get_compliance_detail" => Get "/compliance/detail",
            "compliance"."commit_device_configuration" => Post "/network-device-config/write-memory",
            "device_replacement"."return_replacement_devices_with_details" => Get "/device-replacement",
            "device_replacement"."mark_device_for_replacement" => Post "/device-replacement",
            "device_replacement"."unmark_device_for_replacement" => Put "/device-replacement",
            "device_replacement"."deploy_device_replacement_workflow" => Post "/device-replacement/workflow",
            "sda"."get_fabric_sites" => Get "/sda/fabricSites",
            "sda"."get_fabric_zones" => Get "/sda/fabricZones",
            "sda"."get_layer3_virtual_networks" => Get "/sda/layer3VirtualNetworks",
            "sda"."add_layer3_virtual_networks" => Post "/sda/layer3VirtualNetworks",
            "sda"."update_layer3_virtual_networks" => Put "/sda/layer3VirtualNetworks",
            "sda"."delete_layer3_virtual_networks" => Delete "/sda/layer3VirtualNetworks",
            "sda"."get_anycast_gateways" => Get "/sda/anycastGateways",
            "sda"."add_anycast_gateways" => Post "/sda/anycastGateways",
            "sda"."update_anycast_gateways" => Put "/sda/anycastGateways",
            "sda"."delete_anycast_gateway_by_id" => Delete "/sda/anycastGateways/{id}",
        ];
        Self {
            routes: entries.into_iter().collect(),
        }
    }

    /// Registers or replaces a route.
    pub fn insert(&mut self, family: &str, function: &str, route: Route) {
        self.routes.insert(key(family, function), route);
    }

    pub fn get(&self, family: &str, function: &str) -> Option<&Route> {
        self.routes.get(&key(family, function))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_lookup() {
        let table = RouteTable::standard();
        let route = table.get("task", "get_task_by_id").unwrap();
        assert_eq!(route.method, Method::Get);
        assert_eq!(route.path, "/dna/intent/api/v1/task/{task_id}");
        assert!(table.get("task", "nope").is_none());
    }

    #[test]
    fn test_path_params() {
        let route = Route::new(Method::Delete, "/dna/intent/api/v1/sda/anycastGateways/{id}");
        assert_eq!(route.path_params(), vec!["id"]);
        assert!(!route.method.has_body());
    }

    #[test]
    fn test_insert_override() {
        let mut table = RouteTable::standard();
        let before = table.len();
        table.insert("custom", "ping", Route::new(Method::Get, "/ping"));
        assert_eq!(table.len(), before + 1);
        assert_eq!(table.get("custom", "ping").unwrap().path, "/ping");
    }
}
