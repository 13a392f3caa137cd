//! The structured result every module returns.

use crate::error::OrchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// At least one change was applied.
    Success,
    /// Nothing to do; the controller already matched.
    Ok,
    /// Input rejected before any call was made.
    Invalid,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Ok => "ok",
            RunStatus::Invalid => "invalid",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::Invalid | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{changed, failed, msg, response, diagnostics}` as handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub changed: bool,
    pub failed: bool,
    pub msg: Value,
    pub response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Value>,
}

impl Default for RunResult {
    fn default() -> Self {
        Self {
            changed: false,
            failed: false,
            msg: Value::String(String::new()),
            response: Value::Array(Vec::new()),
            diagnostics: None,
        }
    }
}

impl RunResult {
    /// Appends an entry to `response`, turning a mapping into a list if needed.
    pub fn push_response(&mut self, entry: Value) {
        self.response = match std::mem::take(&mut self.response) {
            Value::Array(mut items) => {
                items.push(entry);
                Value::Array(items)
            }
            Value::Null => Value::Array(vec![entry]),
            other => Value::Array(vec![other, entry]),
        };
    }

    pub fn set_msg(&mut self, msg: impl Into<Value>) {
        self.msg = msg.into();
    }

    /// Records a fatal error. `changed` is left as is so partial work stays visible.
    pub fn record_error(&mut self, err: &OrchError) {
        self.failed = true;
        self.msg = Value::String(err.to_string());
    }

    /// The `msg` as text, for logs and assertions.
    pub fn msg_text(&self) -> String {
        match &self.msg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
