//! Narrow response DTOs for the task endpoints.
//!
//! Catalyst Center returns loosely-typed JSON. Workflows deal with most of it
//! as [`serde_json::Value`], but the task-polling payloads are decoded into
//! typed structs here so the poller can reason about them without string
//! lookups.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An opaque task handle returned by a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts a task id from a mutating call's response.
    ///
    /// Accepts `{"response": {"taskId": ..}}`, a bare `{"taskId": ..}`, and
    /// the lower-case `taskid` spelling some older endpoints use.
    pub fn from_response(response: &Value) -> Option<Self> {
        let body = response.get("response").unwrap_or(response);
        ["taskId", "taskid"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .filter(|id| !id.is_empty())
            .map(TaskId::new)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId::new(s)
    }
}

/// Payload of the legacy `/task/{id}` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDetails {
    pub is_error: bool,
    pub failure_reason: Option<String>,
    pub progress: String,
    pub data: Option<String>,
    pub error_code: Option<String>,
    pub end_time: Option<Value>,
    pub start_time: Option<Value>,
}

impl TaskDetails {
    /// Returns true if the controller has stamped an end time.
    pub fn has_ended(&self) -> bool {
        matches!(&self.end_time, Some(v) if !v.is_null())
    }

    /// Best available human-readable failure reason.
    pub fn failure_message(&self) -> String {
        self.failure_reason
            .clone()
            .or_else(|| self.error_code.clone())
            .unwrap_or_else(|| self.progress.clone())
    }
}

/// Status carried by the newer `/tasks/{id}` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskRecordStatus {
    Pending,
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

impl Default for TaskRecordStatus {
    fn default() -> Self {
        TaskRecordStatus::Pending
    }
}

/// Payload of the newer `/tasks/{id}` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRecord {
    pub id: String,
    pub status: TaskRecordStatus,
    pub result_location: Option<String>,
    pub start_time: Option<Value>,
    pub end_time: Option<Value>,
}
