use super::types::*;
use async_trait::async_trait;
use ccc_client::api::response_items;
use ccc_orch_common::{
    ArgSpec, DeviceInfo, DeviceQuery, ErrorKind, FieldSpec, Format, ModuleDescriptor, OrchError, OrchResult,
    PredicateTable, RunContext, State, Workflow,
};
use ccc_types::CccVersion;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const MODULE_NAME: &str = "rma";

pub fn schema() -> ArgSpec {
    ArgSpec::new()
        .field("faulty_device_name", FieldSpec::str())
        .field("faulty_device_ip_address", FieldSpec::str().format(Format::Ip))
        .field("faulty_device_serial_number", FieldSpec::str())
        .field("replacement_device_name", FieldSpec::str())
        .field("replacement_device_serial_number", FieldSpec::str())
        .field("resync_retry_count", FieldSpec::int().range(1, 1000).default(200))
        .field("resync_retry_interval", FieldSpec::int().range(1, 300).default(2))
}

/// Return material authorization: swaps a faulty device for a
/// same-platform device waiting in Plug and Play.
pub struct Rma {
    desc: ModuleDescriptor,
    predicates: PredicateTable,
}

impl Rma {
    pub fn new() -> Self {
        Self {
            desc: ModuleDescriptor::new(
                MODULE_NAME,
                vec![State::Replaced],
                schema(),
                CccVersion::new(vec![2, 3, 5, 3]),
            ),
            predicates: PredicateTable::new(),
        }
    }

    async fn fetch_record(&self, ctx: &RunContext, faulty_serial: &str) -> OrchResult<Option<ReplacementRecord>> {
        let resp = ctx
            .invoke(
                "device_replacement",
                "return_replacement_devices_with_details",
                &json!({ "faultyDeviceSerialNumber": faulty_serial }),
                false,
            )
            .await?;
        let records: Vec<ReplacementRecord> = ctx.decode_items(&response_items(&resp), "device replacement")?;
        Ok(records
            .into_iter()
            .find(|r| r.faulty_device_serial_number == faulty_serial))
    }

    async fn fetch_pnp_device(&self, ctx: &RunContext, want: &RmaWant) -> OrchResult<Option<PnpDevice>> {
        let params = match (&want.replacement_serial, &want.replacement_name) {
            (Some(serial), _) => json!({ "serialNumber": serial }),
            (None, Some(name)) => json!({ "hostname": name }),
            (None, None) => return Ok(None),
        };
        let resp = ctx
            .invoke("device_onboarding_pnp", "get_device_list", &params, false)
            .await?;
        Ok(response_items(&resp).iter().find_map(PnpDevice::from_value))
    }

    /// Polls the replacement record until the faulty device is ready.
    #[instrument(skip_all, fields(faulty = %faulty_serial))]
    async fn await_ready(&self, ctx: &RunContext, want: &RmaWant, faulty_serial: &str) -> OrchResult<()> {
        let interval = Duration::from_secs(want.resync_retry_interval);
        let mut last = String::from("unmarked");

        for check in 1..=want.resync_retry_count {
            if let Some(record) = self.fetch_record(ctx, faulty_serial).await? {
                let status = record.status();
                if status == ReplacementStatus::Ready {
                    info!(checks = check, "Faulty device ready for replacement");
                    return Ok(());
                }
                if status.is_dead_end() {
                    return Err(OrchError::precondition(format!(
                        "faulty device {} cannot be replaced: replacement status is {}",
                        faulty_serial, status
                    )));
                }
                last = status.to_string();
            }
            if check < want.resync_retry_count {
                ctx.clock().sleep(interval).await;
            }
        }
        Err(OrchError::precondition(format!(
            "faulty device {} is not READY-FOR-REPLACEMENT after {} checks (status {})",
            faulty_serial, want.resync_retry_count, last
        )))
    }

    async fn mark(&self, ctx: &mut RunContext, faulty: &DeviceInfo) -> OrchResult<()> {
        info!(device = faulty.label(), "Marking device for replacement");
        ctx.run_task(
            "device_replacement",
            "mark_device_for_replacement",
            &json!({ "payload": [{
                "faultyDeviceId": faulty.id,
                "replacementStatus": "MARKED-FOR-REPLACEMENT",
            }]}),
            &self.predicates,
            "Failed to mark device for replacement",
        )
        .await?;
        Ok(())
    }

    /// Undoes a mark made by this run.
    async fn unmark(&self, ctx: &mut RunContext, faulty: &DeviceInfo, faulty_serial: &str) -> OrchResult<()> {
        let mut entry = json!({
            "faultyDeviceId": faulty.id,
            "replacementStatus": "MARKED-FOR-REPLACEMENT",
        });
        if let Some(record) = self.fetch_record(ctx, faulty_serial).await? {
            entry["id"] = json!(record.id);
        }
        ctx.run_task(
            "device_replacement",
            "unmark_device_for_replacement",
            &json!({ "payload": [entry] }),
            &self.predicates,
            "Failed to unmark device for replacement",
        )
        .await?;
        Ok(())
    }

    async fn deploy(&self, ctx: &mut RunContext, faulty_serial: &str, replacement_serial: &str) -> OrchResult<()> {
        info!(faulty = faulty_serial, replacement = replacement_serial, "Deploying device replacement");
        ctx.run_task(
            "device_replacement",
            "deploy_device_replacement_workflow",
            &json!({
                "faultyDeviceSerialNumber": faulty_serial,
                "replacementDeviceSerialNumber": replacement_serial,
            }),
            &self.predicates,
            "Device replacement failed",
        )
        .await?;
        Ok(())
    }
}

impl Default for Rma {
    fn default() -> Self {
        Self::new()
    }
}

fn text(block: &Value, key: &str) -> Option<String> {
    block.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Checks that `replacement` can stand in for `faulty`.
fn check_replaceable(faulty: &DeviceInfo, replacement: &PnpDevice) -> OrchResult<()> {
    let reachable = faulty
        .reachability_status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("reachable"));
    if reachable {
        return Err(OrchError::precondition(format!(
            "faulty device {} is reachable; only unreachable devices can be replaced",
            faulty.label()
        )));
    }
    let faulty_platform = faulty.platform_id.as_deref().unwrap_or_default();
    let replacement_platform = replacement.pid.as_deref().unwrap_or_default();
    if faulty_platform.is_empty() || faulty_platform != replacement_platform {
        return Err(OrchError::precondition(format!(
            "replacement device {} is a '{}', but faulty device {} is a '{}'",
            replacement.serial_number,
            replacement_platform,
            faulty.label(),
            faulty_platform
        )));
    }
    Ok(())
}

/// Whether a failure after marking should release the mark. A timeout
/// leaves the controller mid-operation, so the mark stays.
fn should_unmark(err: &OrchError) -> bool {
    matches!(err.kind(), ErrorKind::TaskFailure | ErrorKind::PreconditionUnmet)
}

#[async_trait]
impl Workflow for Rma {
    type Want = RmaWant;
    type Have = RmaHave;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.desc
    }

    async fn get_want(&self, _ctx: &mut RunContext, block: &Value, _state: State) -> OrchResult<RmaWant> {
        let want = RmaWant {
            faulty: DeviceQuery {
                ip: text(block, "faulty_device_ip_address"),
                hostname: text(block, "faulty_device_name"),
                serial: text(block, "faulty_device_serial_number"),
            },
            replacement_name: text(block, "replacement_device_name"),
            replacement_serial: text(block, "replacement_device_serial_number"),
            resync_retry_count: block.get("resync_retry_count").and_then(Value::as_u64).unwrap_or(200),
            resync_retry_interval: block.get("resync_retry_interval").and_then(Value::as_u64).unwrap_or(2),
        };

        let mut problems = Vec::new();
        if want.faulty.is_empty() {
            problems.push(
                "one of faulty_device_name, faulty_device_ip_address or faulty_device_serial_number is required",
            );
        }
        if want.replacement_name.is_none() && want.replacement_serial.is_none() {
            problems.push("one of replacement_device_name or replacement_device_serial_number is required");
        }
        if !problems.is_empty() {
            return Err(OrchError::invalid_input(problems.join("; ")));
        }
        Ok(want)
    }

    #[instrument(skip_all)]
    async fn get_have(&self, ctx: &mut RunContext, want: &RmaWant, _state: State) -> OrchResult<RmaHave> {
        let faulty = ctx.device(&want.faulty).await?;
        let faulty_serial = faulty
            .as_ref()
            .and_then(|d| d.serial_number.clone())
            .or_else(|| want.faulty.serial.clone());
        let record = match &faulty_serial {
            Some(serial) => self.fetch_record(ctx, serial).await?,
            None => None,
        };
        let replacement = self.fetch_pnp_device(ctx, want).await?;
        Ok(RmaHave {
            faulty,
            replacement,
            record,
        })
    }

    async fn get_diff_replaced(&self, ctx: &mut RunContext, want: &RmaWant, have: &RmaHave) -> OrchResult<()> {
        let replacement_serial = have
            .replacement
            .as_ref()
            .map(|r| r.serial_number.clone())
            .or_else(|| want.replacement_serial.clone())
            .unwrap_or_default();

        if let Some(record) = &have.record {
            let same_replacement = record
                .replacement_device_serial_number
                .as_deref()
                .map_or(true, |s| s == replacement_serial);
            if record.status() == ReplacementStatus::Replaced && same_replacement {
                info!(faulty = %record.faulty_device_serial_number, "Device already replaced");
                ctx.result.push_response(json!(RmaOutcome {
                    faulty_device_serial_number: record.faulty_device_serial_number.clone(),
                    replacement_device_serial_number: replacement_serial,
                    status: "already_replaced",
                }));
                ctx.result.set_msg(format!(
                    "Device {} has already been replaced",
                    record.faulty_device_serial_number
                ));
                return Ok(());
            }
        }

        let faulty = have
            .faulty
            .as_ref()
            .ok_or_else(|| OrchError::precondition("faulty device not found in the inventory"))?;
        let replacement = have.replacement.as_ref().ok_or_else(|| {
            OrchError::precondition(format!(
                "replacement device {} not found in Plug and Play",
                want.replacement_serial
                    .as_deref()
                    .or(want.replacement_name.as_deref())
                    .unwrap_or_default()
            ))
        })?;
        check_replaceable(faulty, replacement)?;
        let faulty_serial = faulty
            .serial_number
            .clone()
            .or_else(|| want.faulty.serial.clone())
            .ok_or_else(|| OrchError::precondition(format!("faulty device {} has no serial number", faulty.label())))?;

        let marked_here = match have.record.as_ref().map(ReplacementRecord::status) {
            None => {
                self.mark(ctx, faulty).await?;
                true
            }
            Some(ReplacementStatus::Marked | ReplacementStatus::ReadinessRequested | ReplacementStatus::Ready) => false,
            Some(status) if status.is_dead_end() => {
                return Err(OrchError::precondition(format!(
                    "faulty device {} cannot be replaced: replacement status is {}",
                    faulty_serial, status
                )));
            }
            Some(status) => {
                info!(faulty = %faulty_serial, status = %status, "Replacement already under way");
                ctx.result.push_response(json!(RmaOutcome {
                    faulty_device_serial_number: faulty_serial.clone(),
                    replacement_device_serial_number: replacement_serial,
                    status: "replacement_in_progress",
                }));
                ctx.result.set_msg(format!("Replacement of {} is already {}", faulty_serial, status));
                return Ok(());
            }
        };

        let outcome = match self.await_ready(ctx, want, &faulty_serial).await {
            Ok(()) => self.deploy(ctx, &faulty_serial, &replacement_serial).await,
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            if marked_here && should_unmark(&e) {
                warn!(faulty = %faulty_serial, error = %e, "Replacement failed, unmarking device");
                if let Err(undo) = self.unmark(ctx, faulty, &faulty_serial).await {
                    warn!(error = %undo, "Unmark failed");
                }
            }
            return Err(e);
        }

        ctx.result.push_response(json!(RmaOutcome {
            faulty_device_serial_number: faulty_serial.clone(),
            replacement_device_serial_number: replacement_serial.clone(),
            status: "replacement_started",
        }));
        ctx.result.set_msg(format!(
            "Replacement of {} with {} started",
            faulty_serial, replacement_serial
        ));
        Ok(())
    }

    async fn verify_diff_replaced(&self, _ctx: &mut RunContext, _want: &RmaWant, have: &RmaHave) -> OrchResult<()> {
        match have.record.as_ref().map(ReplacementRecord::status) {
            Some(ReplacementStatus::Replaced | ReplacementStatus::InProgress | ReplacementStatus::Scheduled) => Ok(()),
            Some(status) => Err(OrchError::verification(format!("replacement status is {}", status))),
            None => Err(OrchError::verification("no replacement record for the faulty device")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn faulty(reachability: &str, platform: &str) -> DeviceInfo {
        DeviceInfo {
            id: "dev-1".into(),
            hostname: Some("edge-1".into()),
            management_ip_address: Some("10.0.0.1".into()),
            serial_number: Some("FOC1".into()),
            platform_id: Some(platform.into()),
            family: None,
            reachability_status: Some(reachability.into()),
            collection_status: Some("Managed".into()),
            software_type: None,
        }
    }

    fn pnp(pid: &str) -> PnpDevice {
        PnpDevice {
            id: "pnp-1".into(),
            serial_number: "FOC2".into(),
            hostname: None,
            pid: Some(pid.into()),
            state: Some("Unclaimed".into()),
        }
    }

    #[test]
    fn test_schema_is_well_formed() {
        schema().check().unwrap();
    }

    #[test]
    fn test_same_platform_required() {
        assert!(check_replaceable(&faulty("Unreachable", "C9300-48U"), &pnp("C9300-48U")).is_ok());
        let err = check_replaceable(&faulty("Unreachable", "C9300-48U"), &pnp("C9300-24U")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionUnmet);
        assert!(err.to_string().contains("C9300-24U"));
    }

    #[test]
    fn test_reachable_device_not_replaceable() {
        let err = check_replaceable(&faulty("Reachable", "C9300-48U"), &pnp("C9300-48U")).unwrap_err();
        assert!(err.to_string().contains("is reachable"));
    }

    #[test]
    fn test_unmark_only_on_permanent_failures() {
        assert!(should_unmark(&OrchError::task_failure("t1", "boom")));
        assert!(should_unmark(&OrchError::precondition("not ready")));
        assert!(!should_unmark(&OrchError::TaskTimeout {
            task_id: "t1".into(),
            timeout_secs: 10,
            note: String::new(),
        }));
    }
}
