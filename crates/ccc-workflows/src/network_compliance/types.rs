//! Compliance run shapes.

use ccc_orch_common::DeviceInfo;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Categories `compliance.run_compliance` accepts.
pub const COMPLIANCE_CATEGORIES: &[&str] = &[
    "INTENT",
    "RUNNING_CONFIG",
    "IMAGE",
    "PSIRT",
    "EOX",
    "NETWORK_SETTINGS",
];

/// Compliance state reported for one device, folded into three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Other,
}

impl ComplianceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "COMPLIANT" => ComplianceStatus::Compliant,
            "NON_COMPLIANT" => ComplianceStatus::NonCompliant,
            _ => ComplianceStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "COMPLIANT",
            ComplianceStatus::NonCompliant => "NON_COMPLIANT",
            ComplianceStatus::Other => "OTHER",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired compliance run for one config block.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceWant {
    pub ip_addresses: Vec<String>,
    pub site_name: Option<String>,
    /// Empty means a full run over every category.
    pub categories: Vec<String>,
    pub batch_size: usize,
    pub sync_device_config: bool,
}

impl ComplianceWant {
    pub fn trigger_full(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Devices selected by a block, split by eligibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplianceHave {
    pub eligible: Vec<DeviceInfo>,
    /// Known but unreachable or unmanaged.
    pub skipped: Vec<DeviceInfo>,
    /// Requested IP addresses with no matching device.
    pub not_found: Vec<String>,
}

impl ComplianceHave {
    pub fn eligible_ids(&self) -> Vec<String> {
        self.eligible.iter().map(|d| d.id.clone()).collect()
    }

    pub fn skipped_ids(&self) -> Vec<String> {
        self.skipped.iter().map(|d| d.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty() && self.skipped.is_empty()
    }
}

/// Device ids per compliance bucket, as reported in the module response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceCategories {
    #[serde(rename = "COMPLIANT")]
    pub compliant: Vec<String>,
    #[serde(rename = "NON_COMPLIANT")]
    pub non_compliant: Vec<String>,
    #[serde(rename = "OTHER")]
    pub other: Vec<String>,
}

impl ComplianceCategories {
    pub fn from_statuses(statuses: &BTreeMap<String, ComplianceStatus>) -> Self {
        let mut out = Self::default();
        for (device, status) in statuses {
            let bucket = match status {
                ComplianceStatus::Compliant => &mut out.compliant,
                ComplianceStatus::NonCompliant => &mut out.non_compliant,
                ComplianceStatus::Other => &mut out.other,
            };
            bucket.push(device.clone());
        }
        out
    }
}
