//! Name to identifier resolution with a per-run cache.
//!
//! Sites, devices, and fabrics are looked up once and remembered. The
//! cache never creates entries on read; a miss is a call to the
//! controller, and a confirmed absence is cached as `None` only where a
//! second call could not change the answer within one run.

use crate::error::{OrchError, OrchResult};
use crate::paginate::{paginate, PageOptions};
use crate::task::TASKS_BY_ID_THRESHOLD;
use ccc_client::api::response_items;
use ccc_client::CccApi;
use ccc_types::CccVersion;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A site as both site APIs describe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    pub id: String,
    #[serde(alias = "siteNameHierarchy")]
    pub name_hierarchy: String,
    #[serde(rename = "type", default)]
    pub site_type: Option<String>,
}

/// A managed network device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub hostname: Option<String>,
    pub management_ip_address: Option<String>,
    pub serial_number: Option<String>,
    pub platform_id: Option<String>,
    pub family: Option<String>,
    pub reachability_status: Option<String>,
    pub collection_status: Option<String>,
    pub software_type: Option<String>,
}

impl DeviceInfo {
    /// Reachable and managed; only such devices take part in device-level
    /// operations.
    pub fn is_operable(&self) -> bool {
        let reachable = self
            .reachability_status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("reachable"));
        let managed = self
            .collection_status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("managed") || s.eq_ignore_ascii_case("in progress"));
        reachable && managed
    }

    /// Best human label: IP, then hostname, then id.
    pub fn label(&self) -> &str {
        self.management_ip_address
            .as_deref()
            .or(self.hostname.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Which of the identifying attributes to search by.
///
/// Resolution tries IP, then hostname, then serial number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQuery {
    pub ip: Option<String>,
    pub hostname: Option<String>,
    pub serial: Option<String>,
}

impl DeviceQuery {
    pub fn by_ip(ip: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            ..Default::default()
        }
    }

    pub fn by_hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            ..Default::default()
        }
    }

    pub fn by_serial(serial: impl Into<String>) -> Self {
        Self {
            serial: Some(serial.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ip.is_none() && self.hostname.is_none() && self.serial.is_none()
    }

    fn keys(&self) -> Vec<(&'static str, &str)> {
        let mut keys = Vec::new();
        if let Some(ip) = &self.ip {
            keys.push(("managementIpAddress", ip.as_str()));
        }
        if let Some(h) = &self.hostname {
            keys.push(("hostname", h.as_str()));
        }
        if let Some(s) = &self.serial {
            keys.push(("serialNumber", s.as_str()));
        }
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FabricType {
    FabricSite,
    FabricZone,
}

impl FabricType {
    /// Playbook spelling, `fabric_site` or `fabric_zone`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FabricType::FabricSite => "fabric_site",
            FabricType::FabricZone => "fabric_zone",
        }
    }
}

/// The fabric a site belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricInfo {
    pub id: String,
    pub site_id: String,
    pub fabric_type: FabricType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FabricRecord {
    id: String,
    site_id: String,
}

/// Lookup cache for one run.
#[derive(Debug, Default)]
pub struct Lookups {
    strict: bool,
    sites_by_name: HashMap<String, SiteInfo>,
    sites_by_id: HashMap<String, SiteInfo>,
    devices: HashMap<String, DeviceInfo>,
    fabrics_by_site: HashMap<String, Option<FabricInfo>>,
    fabrics_by_id: HashMap<String, FabricInfo>,
}

impl Lookups {
    /// `strict` turns malformed response items into errors instead of
    /// skipping them.
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Default::default()
        }
    }

    /// Resolves a site hierarchy name such as `Global/USA/SJC`.
    pub async fn site_by_name(
        &mut self,
        client: &dyn CccApi,
        version: &CccVersion,
        name: &str,
    ) -> OrchResult<Option<SiteInfo>> {
        if let Some(site) = self.sites_by_name.get(name) {
            return Ok(Some(site.clone()));
        }

        let items = if version.at_most(&threshold()) {
            match client.invoke("sites", "get_site", &json!({ "name": name }), false).await {
                Ok(resp) => response_items(&resp),
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e.into()),
            }
        } else {
            paginate(
                client,
                "site_design",
                "get_sites",
                &json!({ "nameHierarchy": name }),
                PageOptions::default(),
            )
            .await?
        };

        let sites: Vec<SiteInfo> = self.decode_all(&items, "site")?;
        let found = sites.into_iter().find(|s| s.name_hierarchy == name);
        if let Some(site) = &found {
            debug!(site = name, id = %site.id, "Resolved site");
            self.remember_site(site.clone());
        }
        Ok(found)
    }

    /// Resolves a site id to its hierarchy name.
    pub async fn site_by_id(
        &mut self,
        client: &dyn CccApi,
        version: &CccVersion,
        id: &str,
    ) -> OrchResult<Option<SiteInfo>> {
        if let Some(site) = self.sites_by_id.get(id) {
            return Ok(Some(site.clone()));
        }

        let items = if version.at_most(&threshold()) {
            match client.invoke("sites", "get_site", &json!({ "siteId": id }), false).await {
                Ok(resp) => response_items(&resp),
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e.into()),
            }
        } else {
            paginate(
                client,
                "site_design",
                "get_sites",
                &json!({ "id": id }),
                PageOptions::default(),
            )
            .await?
        };

        let sites: Vec<SiteInfo> = self.decode_all(&items, "site")?;
        let found = sites.into_iter().find(|s| s.id == id);
        if let Some(site) = &found {
            self.remember_site(site.clone());
        }
        Ok(found)
    }

    /// Resolves one device, trying IP, then hostname, then serial number.
    ///
    /// The result is cached under every attribute it carries.
    pub async fn device(&mut self, client: &dyn CccApi, query: &DeviceQuery) -> OrchResult<Option<DeviceInfo>> {
        if query.is_empty() {
            return Err(OrchError::invalid_input(
                "one of ip_address, hostname or serial_number is required to identify a device",
            ));
        }

        for (param, value) in query.keys() {
            if let Some(device) = self.devices.get(&cache_key(param, value)) {
                return Ok(Some(device.clone()));
            }
        }

        for (param, value) in query.keys() {
            let resp = client
                .invoke("devices", "get_device_list", &json!({ param: value }), false)
                .await?;
            let devices: Vec<DeviceInfo> = self.decode_all(&response_items(&resp), "device")?;
            if let Some(device) = devices.into_iter().next() {
                debug!(query = value, id = %device.id, "Resolved device");
                self.remember_device(device.clone());
                return Ok(Some(device));
            }
        }
        Ok(None)
    }

    /// Resolves a set of management IPs. Unknown IPs are simply absent
    /// from the result.
    pub async fn devices_by_ips(&mut self, client: &dyn CccApi, ips: &[String]) -> OrchResult<Vec<DeviceInfo>> {
        if ips.is_empty() {
            return Ok(Vec::new());
        }
        let items = paginate(
            client,
            "devices",
            "get_device_list",
            &json!({ "managementIpAddress": ips }),
            PageOptions::default(),
        )
        .await?;
        let devices: Vec<DeviceInfo> = self.decode_all(&items, "device")?;
        for device in &devices {
            self.remember_device(device.clone());
        }
        Ok(devices)
    }

    /// Resolves devices by id.
    pub async fn devices_by_ids(&mut self, client: &dyn CccApi, ids: &[String]) -> OrchResult<Vec<DeviceInfo>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = paginate(
            client,
            "devices",
            "get_device_list",
            &json!({ "id": ids }),
            PageOptions::default(),
        )
        .await?;
        let devices: Vec<DeviceInfo> = self.decode_all(&items, "device")?;
        for device in &devices {
            self.remember_device(device.clone());
        }
        Ok(devices)
    }

    /// Ids of the devices assigned to a site.
    pub async fn site_device_ids(&mut self, client: &dyn CccApi, site_id: &str) -> OrchResult<Vec<String>> {
        let items = paginate(
            client,
            "site_design",
            "get_site_assigned_network_devices",
            &json!({ "siteId": site_id }),
            PageOptions::default(),
        )
        .await?;
        Ok(items
            .iter()
            .filter_map(|item| {
                item.get("deviceId")
                    .or_else(|| item.get("networkDeviceId"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect())
    }

    /// The fabric site or fabric zone built on `site_id`, if any.
    pub async fn fabric_for_site(&mut self, client: &dyn CccApi, site_id: &str) -> OrchResult<Option<FabricInfo>> {
        if let Some(cached) = self.fabrics_by_site.get(site_id) {
            return Ok(cached.clone());
        }
        let found = self
            .find_fabric(client, &json!({ "siteId": site_id }), |r| r.site_id == site_id)
            .await?;
        self.fabrics_by_site.insert(site_id.to_string(), found.clone());
        if let Some(f) = &found {
            self.fabrics_by_id.insert(f.id.clone(), f.clone());
        }
        Ok(found)
    }

    /// A fabric site or zone by its fabric id.
    pub async fn fabric_by_id(&mut self, client: &dyn CccApi, fabric_id: &str) -> OrchResult<Option<FabricInfo>> {
        if let Some(cached) = self.fabrics_by_id.get(fabric_id) {
            return Ok(Some(cached.clone()));
        }
        let found = self
            .find_fabric(client, &json!({ "id": fabric_id }), |r| r.id == fabric_id)
            .await?;
        if let Some(f) = &found {
            self.fabrics_by_id.insert(f.id.clone(), f.clone());
            self.fabrics_by_site.insert(f.site_id.clone(), Some(f.clone()));
        }
        Ok(found)
    }

    /// Looks in fabric sites first, then fabric zones.
    async fn find_fabric(
        &self,
        client: &dyn CccApi,
        params: &Value,
        matches: impl Fn(&FabricRecord) -> bool,
    ) -> OrchResult<Option<FabricInfo>> {
        for (function, fabric_type) in [
            ("get_fabric_sites", FabricType::FabricSite),
            ("get_fabric_zones", FabricType::FabricZone),
        ] {
            let resp = client.invoke("sda", function, params, false).await?;
            let records: Vec<FabricRecord> = self.decode_all(&response_items(&resp), "fabric")?;
            if let Some(record) = records.into_iter().find(|r| matches(r)) {
                return Ok(Some(FabricInfo {
                    id: record.id,
                    site_id: record.site_id,
                    fabric_type,
                }));
            }
        }
        Ok(None)
    }

    fn remember_site(&mut self, site: SiteInfo) {
        self.sites_by_id.insert(site.id.clone(), site.clone());
        self.sites_by_name.insert(site.name_hierarchy.clone(), site);
    }

    fn remember_device(&mut self, device: DeviceInfo) {
        let keys = DeviceQuery {
            ip: device.management_ip_address.clone(),
            hostname: device.hostname.clone(),
            serial: device.serial_number.clone(),
        };
        for (param, value) in keys.keys() {
            self.devices.insert(cache_key(param, value), device.clone());
        }
    }

    fn decode_all<T: DeserializeOwned>(&self, items: &[Value], what: &str) -> OrchResult<Vec<T>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<T>(item.clone()) {
                Ok(v) => out.push(v),
                Err(e) if self.strict => {
                    return Err(OrchError::transport(what, "decode", e.to_string()));
                }
                Err(e) => warn!(what, error = %e, "Skipping malformed item"),
            }
        }
        Ok(out)
    }
}

fn threshold() -> CccVersion {
    TASKS_BY_ID_THRESHOLD
        .parse()
        .unwrap_or_else(|_| CccVersion::new(vec![2, 3, 5, 3]))
}

fn cache_key(param: &str, value: &str) -> String {
    format!("{}={}", param, value)
}
