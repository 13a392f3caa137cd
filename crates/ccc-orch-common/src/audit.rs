//! Structured audit records for state-changing controller calls.
//!
//! Every call made with `op_modifies = true` produces an [`AuditRecord`]
//! emitted on the `ccc_audit` tracing target as one JSON document, so the
//! change history of a run can be reconstructed from logs alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of change an audited call makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    ResourceCreate,
    ResourceModify,
    ResourceDelete,
    /// Device-level operations (compliance runs, RMA, config sync).
    DeviceOperation,
    /// Anything else that changes controller state.
    ConfigurationChange,
}

impl AuditCategory {
    /// Guesses a category from an SDK function name.
    pub fn for_function(function: &str) -> Self {
        let f = function.to_ascii_lowercase();
        if f.starts_with("add_") || f.starts_with("create_") {
            AuditCategory::ResourceCreate
        } else if f.starts_with("edit_") || f.starts_with("update_") {
            AuditCategory::ResourceModify
        } else if f.starts_with("delete_") || f.starts_with("remove_") {
            AuditCategory::ResourceDelete
        } else if f.contains("device") || f.contains("compliance") {
            AuditCategory::DeviceOperation
        } else {
            AuditCategory::ConfigurationChange
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditCategory::ResourceCreate => write!(f, "RESOURCE_CREATE"),
            AuditCategory::ResourceModify => write!(f, "RESOURCE_MODIFY"),
            AuditCategory::ResourceDelete => write!(f, "RESOURCE_DELETE"),
            AuditCategory::DeviceOperation => write!(f, "DEVICE_OPERATION"),
            AuditCategory::ConfigurationChange => write!(f, "CONFIGURATION_CHANGE"),
        }
    }
}

/// Outcome of an audited call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
    /// The call was accepted and a task is running.
    InProgress,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Failure => write!(f, "failure"),
            AuditOutcome::InProgress => write!(f, "in_progress"),
        }
    }
}

/// One audited controller call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub category: AuditCategory,
    /// Module that made the call.
    pub source: String,
    /// `family.function`.
    pub action: String,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Redacted call parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    pub fn new(category: AuditCategory, source: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            source: source.into(),
            action: action.into(),
            outcome: AuditOutcome::InProgress,
            object_id: None,
            details: None,
            error: None,
        }
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Usually the task id returned by the call.
    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the error and marks the outcome as a failure.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.outcome = AuditOutcome::Failure;
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization_failed","message":"{}"}}"#, e))
    }
}

/// Emits an [`AuditRecord`] on the `ccc_audit` target.
///
/// Successes log at INFO, in-progress records at DEBUG, failures at WARN.
#[macro_export]
macro_rules! audit_log {
    ($record:expr) => {
        let record = $record;
        match record.outcome {
            $crate::audit::AuditOutcome::Success => {
                tracing::info!(
                    target: "ccc_audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
            $crate::audit::AuditOutcome::InProgress => {
                tracing::debug!(
                    target: "ccc_audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
            $crate::audit::AuditOutcome::Failure => {
                tracing::warn!(
                    target: "ccc_audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    error = record.error.as_deref().unwrap_or(""),
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_category_from_function() {
        assert_eq!(
            AuditCategory::for_function("add_authentication_and_policy_server_access_configuration"),
            AuditCategory::ResourceCreate
        );
        assert_eq!(AuditCategory::for_function("update_layer3_virtual_networks"), AuditCategory::ResourceModify);
        assert_eq!(AuditCategory::for_function("delete_anycast_gateway_by_id"), AuditCategory::ResourceDelete);
        assert_eq!(AuditCategory::for_function("run_compliance"), AuditCategory::DeviceOperation);
        assert_eq!(AuditCategory::for_function("deploy_workflow"), AuditCategory::ConfigurationChange);
    }

    #[test]
    fn test_error_marks_failure() {
        let record = AuditRecord::new(AuditCategory::ResourceCreate, "ise_radius_integration", "system_settings.add")
            .with_error("HTTP 500");
        assert_eq!(record.outcome, AuditOutcome::Failure);
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let record = AuditRecord::new(AuditCategory::DeviceOperation, "network_compliance", "compliance.run_compliance")
            .with_outcome(AuditOutcome::Success)
            .with_object_id("task-1")
            .with_details(json!({"deviceUuids": ["d1"]}));
        let value: serde_json::Value = serde_json::from_str(&record.to_json()).unwrap();
        assert_eq!(value["category"], json!("DEVICE_OPERATION"));
        assert_eq!(value["object_id"], json!("task-1"));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_audit_macro_expands() {
        audit_log!(AuditRecord::new(AuditCategory::ResourceDelete, "test", "sda.delete").with_outcome(AuditOutcome::Success));
    }
}
