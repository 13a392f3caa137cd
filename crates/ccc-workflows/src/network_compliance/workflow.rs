use super::types::*;
use async_trait::async_trait;
use ccc_client::api::response_items;
use ccc_orch_common::{
    ArgSpec, BatchDriver, BatchOperation, DeviceInfo, FieldSpec, FieldType, Format, ModuleDescriptor, OrchError,
    OrchResult, PredicateTable, RunContext, State, Workflow,
};
use ccc_types::CccVersion;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, instrument, warn};

pub const MODULE_NAME: &str = "network_compliance";

/// Largest device list one `run_compliance` call accepts.
pub const MAX_BATCH_SIZE: usize = 100;

/// Device ids per `get_compliance_status` query.
const STATUS_CHUNK: usize = 50;

pub fn schema() -> ArgSpec {
    ArgSpec::new()
        .field("ip_address_list", FieldSpec::list(FieldType::Str).format(Format::Ip))
        .field("site_name", FieldSpec::str().format(Format::SiteHierarchy))
        .field(
            "run_compliance_categories",
            FieldSpec::list(FieldType::Str).choices(COMPLIANCE_CATEGORIES.iter().copied()),
        )
        .field(
            "run_compliance_batch_size",
            FieldSpec::int().range(1, MAX_BATCH_SIZE as i64).default(MAX_BATCH_SIZE as i64),
        )
        .field("sync_device_config", FieldSpec::bool().default(false))
}

/// Runs compliance checks over a device selection.
pub struct NetworkCompliance {
    desc: ModuleDescriptor,
    predicates: PredicateTable,
}

impl NetworkCompliance {
    pub fn new() -> Self {
        Self {
            desc: ModuleDescriptor::new(
                MODULE_NAME,
                vec![State::Merged],
                schema(),
                CccVersion::new(vec![2, 3, 5, 3]),
            ),
            predicates: PredicateTable::new(),
        }
    }

    /// Latest compliance state of each device.
    async fn compliance_statuses(
        &self,
        ctx: &RunContext,
        device_ids: &[String],
    ) -> OrchResult<BTreeMap<String, ComplianceStatus>> {
        let mut statuses = BTreeMap::new();
        for chunk in device_ids.chunks(STATUS_CHUNK) {
            let resp = ctx
                .invoke(
                    "compliance",
                    "get_compliance_status",
                    &json!({ "deviceUuid": chunk.join(",") }),
                    false,
                )
                .await?;
            for item in response_items(&resp) {
                let Some(device) = item.get("deviceUuid").and_then(Value::as_str) else {
                    continue;
                };
                let status = item
                    .get("complianceStatus")
                    .and_then(Value::as_str)
                    .map(ComplianceStatus::parse)
                    .unwrap_or(ComplianceStatus::Other);
                statuses.insert(device.to_string(), status);
            }
        }
        for id in device_ids {
            statuses.entry(id.clone()).or_insert(ComplianceStatus::Other);
        }
        Ok(statuses)
    }

    /// Writes the running configuration of `device_ids` to startup.
    async fn sync_config(&self, ctx: &mut RunContext, device_ids: &[String]) -> OrchResult<()> {
        info!(devices = device_ids.len(), "Syncing device configuration");
        ctx.run_task(
            "compliance",
            "commit_device_configuration",
            &json!({ "deviceId": device_ids }),
            &self.predicates,
            "Failed to sync device configuration",
        )
        .await?;
        Ok(())
    }
}

impl Default for NetworkCompliance {
    fn default() -> Self {
        Self::new()
    }
}

fn strings(block: &Value, key: &str) -> Vec<String> {
    block
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Splits devices into eligible and skipped, dropping repeats.
fn partition_devices(devices: Vec<DeviceInfo>) -> (Vec<DeviceInfo>, Vec<DeviceInfo>) {
    let mut seen = HashSet::new();
    devices
        .into_iter()
        .filter(|d| seen.insert(d.id.clone()))
        .partition(DeviceInfo::is_operable)
}

/// Devices per compliance task; the largest batch when unset.
fn batch_size(block: &Value) -> usize {
    block
        .get("run_compliance_batch_size")
        .and_then(Value::as_u64)
        .map_or(MAX_BATCH_SIZE, |n| usize::try_from(n).unwrap_or(MAX_BATCH_SIZE))
}

#[async_trait]
impl Workflow for NetworkCompliance {
    type Want = ComplianceWant;
    type Have = ComplianceHave;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.desc
    }

    async fn get_want(&self, _ctx: &mut RunContext, block: &Value, _state: State) -> OrchResult<ComplianceWant> {
        let want = ComplianceWant {
            ip_addresses: strings(block, "ip_address_list"),
            site_name: block.get("site_name").and_then(Value::as_str).map(str::to_string),
            categories: strings(block, "run_compliance_categories"),
            batch_size: batch_size(block),
            sync_device_config: block.get("sync_device_config").and_then(Value::as_bool).unwrap_or(false),
        };
        if want.ip_addresses.is_empty() && want.site_name.is_none() {
            return Err(OrchError::invalid_input(
                "ip_address_list or site_name is required to select devices",
            ));
        }
        Ok(want)
    }

    #[instrument(skip_all)]
    async fn get_have(&self, ctx: &mut RunContext, want: &ComplianceWant, _state: State) -> OrchResult<ComplianceHave> {
        let mut devices = Vec::new();
        let mut not_found = Vec::new();

        if !want.ip_addresses.is_empty() {
            let found = ctx.devices_by_ips(&want.ip_addresses).await?;
            let known: HashSet<&str> = found
                .iter()
                .filter_map(|d| d.management_ip_address.as_deref())
                .collect();
            not_found = want
                .ip_addresses
                .iter()
                .filter(|ip| !known.contains(ip.as_str()))
                .cloned()
                .collect();
            devices.extend(found);
        }

        if let Some(site_name) = &want.site_name {
            let site = ctx
                .site_by_name(site_name)
                .await?
                .ok_or_else(|| OrchError::precondition(format!("site '{}' does not exist", site_name)))?;
            let ids = ctx.site_device_ids(&site.id).await?;
            if !ids.is_empty() {
                devices.extend(ctx.devices_by_ids(&ids).await?);
            }
        }

        if !not_found.is_empty() {
            warn!(ips = ?not_found, "No device with these management addresses");
        }
        let (eligible, skipped) = partition_devices(devices);
        for device in &skipped {
            info!(device = device.label(), "Device is not reachable and managed, skipping");
        }
        Ok(ComplianceHave {
            eligible,
            skipped,
            not_found,
        })
    }

    async fn get_diff_merged(&self, ctx: &mut RunContext, want: &ComplianceWant, have: &ComplianceHave) -> OrchResult<()> {
        if have.is_empty() {
            return Err(OrchError::precondition("no devices match the selection"));
        }
        if have.eligible.is_empty() {
            ctx.result.push_response(json!({
                "compliance": {
                    "success": [],
                    "failed": [],
                    "skipped": have.skipped_ids(),
                    "not_found": have.not_found,
                }
            }));
            ctx.result.set_msg("No reachable and managed device to run compliance on");
            return Ok(());
        }

        let op = BatchOperation::new(
            "run compliance",
            "compliance",
            "run_compliance",
            json!({
                "triggerFull": want.trigger_full(),
                "categories": want.categories,
            }),
        )
        .with_predicates(self.predicates.clone());
        let report = BatchDriver::new(want.batch_size)
            .run(ctx, &op, &have.eligible_ids(), have.skipped_ids())
            .await?;

        let statuses = if report.succeeded.is_empty() {
            BTreeMap::new()
        } else {
            self.compliance_statuses(ctx, &report.succeeded).await?
        };
        let categories = ComplianceCategories::from_statuses(&statuses);

        let mut synced = Vec::new();
        if want.sync_device_config && !categories.non_compliant.is_empty() {
            self.sync_config(ctx, &categories.non_compliant).await?;
            synced = categories.non_compliant.clone();
        }

        let mut summary = report.cohorts();
        if let Value::Object(obj) = &mut summary {
            obj.insert("not_found".to_string(), json!(have.not_found));
            obj.insert("categories".to_string(), json!(categories));
            obj.insert("synced".to_string(), json!(synced));
        }
        ctx.result.push_response(json!({ "compliance": summary }));

        report.check(&op.name)?;
        info!(
            compliant = categories.compliant.len(),
            non_compliant = categories.non_compliant.len(),
            other = categories.other.len(),
            "Compliance run complete"
        );
        Ok(())
    }
}
