//! The Catalyst Center API contract and its HTTP implementation.
//!
//! - [`CccApi`]: the trait every workflow talks to
//! - [`routes`]: the `(family, function)` to REST route table
//! - [`http`]: the reqwest-backed client

pub mod http;
pub mod routes;

pub use http::{ClientConfig, HttpClient};
pub use routes::{Route, RouteTable};

use crate::error::{CccError, CccResult};
use crate::types::{TaskDetails, TaskId, TaskRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Catalyst Center operations the orchestration core depends on.
///
/// Only [`invoke`](CccApi::invoke) is required. The task and version
/// helpers are expressed in terms of it so fakes only need to answer
/// `(family, function)` calls.
#[async_trait]
pub trait CccApi: Send + Sync {
    /// Performs one REST call.
    ///
    /// `op_modifies` marks calls that change controller state; it is used
    /// for logging and for the "no mutation in check mode" accounting.
    async fn invoke(
        &self,
        family: &str,
        function: &str,
        params: &Value,
        op_modifies: bool,
    ) -> CccResult<Value>;

    /// Fetches a task through the legacy `/task/{id}` endpoint.
    async fn get_task_details(&self, task_id: &TaskId) -> CccResult<TaskDetails> {
        let resp = self
            .invoke(
                "task",
                "get_task_by_id",
                &json!({ "task_id": task_id.as_str() }),
                false,
            )
            .await?;
        decode_response(&resp, "task.get_task_by_id")
    }

    /// Fetches a task through the newer `/tasks/{id}` endpoint.
    async fn get_tasks_by_id(&self, task_id: &TaskId) -> CccResult<TaskRecord> {
        let resp = self
            .invoke(
                "task",
                "get_tasks_by_id",
                &json!({ "id": task_id.as_str() }),
                false,
            )
            .await?;
        decode_response(&resp, "task.get_tasks_by_id")
    }

    /// Returns the controller's display version string.
    async fn ccc_version(&self) -> CccResult<String> {
        let resp = self
            .invoke("platform", "release_summary", &json!({}), false)
            .await?;
        let body = resp.get("response").unwrap_or(&resp);
        ["displayVersion", "installedVersion"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| CccError::decode("platform.release_summary", "no version field"))
    }
}

/// Decodes the `response` member of a reply (or the whole reply if absent).
pub fn decode_response<T: DeserializeOwned>(resp: &Value, context: &str) -> CccResult<T> {
    let body = resp.get("response").unwrap_or(resp).clone();
    serde_json::from_value(body).map_err(|e| CccError::decode(context, e.to_string()))
}

/// Returns the list carried under `response`, or an empty list.
///
/// Accepts both `{"response": [..]}` and a single object under `response`.
pub fn response_items(resp: &Value) -> Vec<Value> {
    match resp.get("response").unwrap_or(resp) {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        Value::Object(obj) if obj.is_empty() => Vec::new(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskRecordStatus;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct Canned {
        reply: Value,
        calls: Mutex<Vec<(String, String, Value)>>,
    }

    #[async_trait]
    impl CccApi for Canned {
        async fn invoke(
            &self,
            family: &str,
            function: &str,
            params: &Value,
            _op_modifies: bool,
        ) -> CccResult<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((family.to_string(), function.to_string(), params.clone()));
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_default_task_details_goes_through_invoke() {
        let api = Canned {
            reply: json!({"response": {"isError": false, "progress": "done", "endTime": 1}}),
            calls: Mutex::new(Vec::new()),
        };
        let details = api.get_task_details(&TaskId::new("t-9")).await.unwrap();
        assert!(details.has_ended());

        let calls = api.calls.lock().unwrap();
        assert_eq!(calls[0].0, "task");
        assert_eq!(calls[0].1, "get_task_by_id");
        assert_eq!(calls[0].2, json!({"task_id": "t-9"}));
    }

    #[tokio::test]
    async fn test_default_tasks_by_id() {
        let api = Canned {
            reply: json!({"response": {"id": "t-1", "status": "SUCCESS"}}),
            calls: Mutex::new(Vec::new()),
        };
        let record = api.get_tasks_by_id(&TaskId::new("t-1")).await.unwrap();
        assert_eq!(record.status, TaskRecordStatus::Success);
    }

    #[tokio::test]
    async fn test_version_probe() {
        let api = Canned {
            reply: json!({"response": {"displayVersion": "2.3.7.9", "installedVersion": "2.3.7.9.70301"}}),
            calls: Mutex::new(Vec::new()),
        };
        assert_eq!(api.ccc_version().await.unwrap(), "2.3.7.9");
    }

    #[test]
    fn test_response_items() {
        assert_eq!(response_items(&json!({"response": [1, 2]})).len(), 2);
        assert_eq!(response_items(&json!({"response": []})).len(), 0);
        assert_eq!(response_items(&json!({"response": {}})).len(), 0);
        assert_eq!(response_items(&json!({"response": {"id": "a"}})).len(), 1);
    }
}
