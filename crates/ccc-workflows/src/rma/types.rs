//! Device replacement shapes.

use ccc_orch_common::{DeviceInfo, DeviceQuery};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Replacement workflow states as the controller reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementStatus {
    Marked,
    ReadinessRequested,
    ReadinessFailed,
    Ready,
    InProgress,
    Scheduled,
    Replaced,
    Error,
    Unknown(String),
}

impl ReplacementStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "MARKED-FOR-REPLACEMENT" => ReplacementStatus::Marked,
            "NETWORK_READINESS_REQUESTED" => ReplacementStatus::ReadinessRequested,
            "NETWORK_READINESS_FAILED" => ReplacementStatus::ReadinessFailed,
            "READY-FOR-REPLACEMENT" => ReplacementStatus::Ready,
            "REPLACEMENT-IN-PROGRESS" => ReplacementStatus::InProgress,
            "REPLACEMENT-SCHEDULED" => ReplacementStatus::Scheduled,
            "REPLACED" => ReplacementStatus::Replaced,
            "ERROR" => ReplacementStatus::Error,
            other => ReplacementStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReplacementStatus::Marked => "MARKED-FOR-REPLACEMENT",
            ReplacementStatus::ReadinessRequested => "NETWORK_READINESS_REQUESTED",
            ReplacementStatus::ReadinessFailed => "NETWORK_READINESS_FAILED",
            ReplacementStatus::Ready => "READY-FOR-REPLACEMENT",
            ReplacementStatus::InProgress => "REPLACEMENT-IN-PROGRESS",
            ReplacementStatus::Scheduled => "REPLACEMENT-SCHEDULED",
            ReplacementStatus::Replaced => "REPLACED",
            ReplacementStatus::Error => "ERROR",
            ReplacementStatus::Unknown(s) => s,
        }
    }

    /// States from which the device can never become ready.
    pub fn is_dead_end(&self) -> bool {
        matches!(self, ReplacementStatus::ReadinessFailed | ReplacementStatus::Error)
    }
}

impl fmt::Display for ReplacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired replacement for one config block.
#[derive(Debug, Clone, PartialEq)]
pub struct RmaWant {
    pub faulty: DeviceQuery,
    pub replacement_name: Option<String>,
    pub replacement_serial: Option<String>,
    /// Readiness checks before giving up.
    pub resync_retry_count: u64,
    /// Seconds between readiness checks.
    pub resync_retry_interval: u64,
}

/// A device waiting in Plug and Play.
#[derive(Debug, Clone, PartialEq)]
pub struct PnpDevice {
    pub id: String,
    pub serial_number: String,
    pub hostname: Option<String>,
    pub pid: Option<String>,
    pub state: Option<String>,
}

impl PnpDevice {
    /// Reads the `{id, deviceInfo: {...}}` shape PnP returns.
    pub fn from_value(value: &Value) -> Option<Self> {
        let info = value.get("deviceInfo")?;
        let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id: value.get("id").and_then(Value::as_str)?.to_string(),
            serial_number: text("serialNumber")?,
            hostname: text("hostname"),
            pid: text("pid"),
            state: text("state"),
        })
    }
}

/// A replacement workflow record from
/// `device_replacement.return_replacement_devices_with_details`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementRecord {
    pub id: String,
    pub faulty_device_id: Option<String>,
    pub faulty_device_serial_number: String,
    #[serde(default)]
    pub faulty_device_platform: Option<String>,
    #[serde(default)]
    pub replacement_device_serial_number: Option<String>,
    pub replacement_status: String,
}

impl ReplacementRecord {
    pub fn status(&self) -> ReplacementStatus {
        ReplacementStatus::parse(&self.replacement_status)
    }
}

/// Current state of one block's devices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RmaHave {
    pub faulty: Option<DeviceInfo>,
    pub replacement: Option<PnpDevice>,
    pub record: Option<ReplacementRecord>,
}

/// Response entry for one replacement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RmaOutcome {
    pub faulty_device_serial_number: String,
    pub replacement_device_serial_number: String,
    pub status: &'static str,
}
