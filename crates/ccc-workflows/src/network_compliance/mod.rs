//! Compliance checks over a device selection.
//!
//! Devices come from `ip_address_list`, from the devices assigned to
//! `site_name`, or both. Unreachable or unmanaged devices are reported as
//! `skipped` and never submitted. The rest are submitted in batches of
//! `run_compliance_batch_size`; a failed batch is retried one device at a
//! time. When any device still fails the run reports `failed` with both
//! cohorts in the response.
//!
//! With `sync_device_config`, non-compliant devices have their running
//! configuration written to startup in one task.

mod types;
mod workflow;

pub use types::{
    ComplianceCategories, ComplianceHave, ComplianceStatus, ComplianceWant, COMPLIANCE_CATEGORIES,
};
pub use workflow::{schema, NetworkCompliance, MAX_BATCH_SIZE, MODULE_NAME};
