//! A scripted, in-memory Catalyst Center.
//!
//! [`MockCcc`] answers `(family, function)` calls from registered
//! responders and keeps a log of every call. Task endpoints and the
//! version probe are built in: a responder registered with
//! [`MockCcc::on_task`] issues a fresh task id per call and the polling
//! endpoints replay the [`TaskScript`] attached to it.

use async_trait::async_trait;
use ccc_client::{CccApi, CccError, CccResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

type ReplyFn = Box<dyn Fn(&Value) -> CccResult<Value> + Send + Sync>;
type TaskFn = Box<dyn Fn(&Value) -> TaskScript + Send + Sync>;

enum Responder {
    Reply(ReplyFn),
    Task(TaskFn),
}

/// One call as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub family: String,
    pub function: String,
    pub params: Value,
    pub op_modifies: bool,
}

impl RecordedCall {
    /// `family.function`
    pub fn name(&self) -> String {
        format!("{}.{}", self.family, self.function)
    }
}

/// The sequence of task-detail payloads a task reports.
///
/// Each poll returns the next payload; the last one repeats forever.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskScript {
    replies: Vec<Value>,
}

impl TaskScript {
    pub fn new(replies: Vec<Value>) -> Self {
        Self { replies }
    }

    /// Completes on the first poll with `progress`.
    pub fn succeeds(progress: &str) -> Self {
        Self::new(vec![json!({"isError": false, "progress": progress, "endTime": 1700000000000u64})])
    }

    /// Reports `pending` in-progress polls before succeeding.
    pub fn succeeds_after(pending: usize, progress: &str) -> Self {
        let mut replies = vec![json!({"isError": false, "progress": "In progress"}); pending];
        replies.extend(Self::succeeds(progress).replies);
        Self::new(replies)
    }

    /// Fails on the first poll with `reason`.
    pub fn fails(reason: &str) -> Self {
        Self::new(vec![json!({
            "isError": true,
            "failureReason": reason,
            "progress": reason,
            "endTime": 1700000000000u64
        })])
    }

    /// Never reaches a terminal state.
    pub fn never_finishes(progress: &str) -> Self {
        Self::new(vec![json!({"isError": false, "progress": progress})])
    }

    fn reply(&self, poll: usize) -> Value {
        self.replies
            .get(poll)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_else(|| json!({"isError": false, "progress": ""}))
    }
}

struct TaskEntry {
    script: TaskScript,
    polls: usize,
}

/// A scripted Catalyst Center implementing [`CccApi`].
pub struct MockCcc {
    version: Mutex<String>,
    responders: Mutex<HashMap<String, Responder>>,
    tasks: Mutex<HashMap<String, TaskEntry>>,
    task_order: Mutex<Vec<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for MockCcc {
    fn default() -> Self {
        Self::new("2.3.7.9")
    }
}

impl MockCcc {
    pub fn new(version: &str) -> Self {
        Self {
            version: Mutex::new(version.to_string()),
            responders: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            task_order: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_version(&self, version: &str) {
        *lock(&self.version) = version.to_string();
    }

    /// Answers `family.function` with whatever `reply` returns.
    pub fn on<F>(&self, family: &str, function: &str, reply: F) -> &Self
    where
        F: Fn(&Value) -> CccResult<Value> + Send + Sync + 'static,
    {
        lock(&self.responders).insert(key(family, function), Responder::Reply(Box::new(reply)));
        self
    }

    /// Answers `family.function` with a fixed `{"response": response}`.
    pub fn on_response(&self, family: &str, function: &str, response: Value) -> &Self {
        self.on(family, function, move |_| Ok(json!({ "response": response.clone() })))
    }

    /// Answers `family.function` with an HTTP error.
    pub fn on_error(&self, family: &str, function: &str, status: u16, body: &str) -> &Self {
        let (f, fun, body) = (family.to_string(), function.to_string(), body.to_string());
        self.on(family, function, move |_| Err(CccError::http(f.clone(), fun.clone(), status, body.clone())))
    }

    /// Makes `family.function` start a task whose progress follows the
    /// script chosen for each call's params.
    pub fn on_task<F>(&self, family: &str, function: &str, script: F) -> &Self
    where
        F: Fn(&Value) -> TaskScript + Send + Sync + 'static,
    {
        lock(&self.responders).insert(key(family, function), Responder::Task(Box::new(script)));
        self
    }

    /// Registers a task directly, for poller tests that skip the start call.
    pub fn add_task(&self, task_id: &str, script: TaskScript) {
        lock(&self.tasks).insert(task_id.to_string(), TaskEntry { script, polls: 0 });
        lock(&self.task_order).push(task_id.to_string());
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Calls made with `op_modifies = true`.
    pub fn mutations(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.op_modifies).collect()
    }

    pub fn calls_to(&self, family: &str, function: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.family == family && c.function == function)
            .collect()
    }

    pub fn call_count(&self, family: &str, function: &str) -> usize {
        self.calls_to(family, function).len()
    }

    /// Task ids issued so far, in issue order.
    pub fn task_ids(&self) -> Vec<String> {
        lock(&self.task_order).clone()
    }

    /// How often a task has been polled.
    pub fn polls(&self, task_id: &str) -> usize {
        lock(&self.tasks).get(task_id).map(|t| t.polls).unwrap_or(0)
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn start_task(&self, script: TaskScript) -> Value {
        let id = {
            let order = lock(&self.task_order);
            format!("mock-task-{:04}", order.len() + 1)
        };
        self.add_task(&id, script);
        json!({"response": {"taskId": id, "url": format!("/api/v1/task/{}", id)}, "version": "1.0"})
    }

    /// Next scripted payload for a task; advances its poll counter.
    fn poll(&self, family: &str, function: &str, task_id: &str) -> CccResult<Value> {
        let mut tasks = lock(&self.tasks);
        let entry = tasks
            .get_mut(task_id)
            .ok_or_else(|| CccError::http(family, function, 404, format!("task {} not found", task_id)))?;
        let reply = entry.script.reply(entry.polls);
        entry.polls += 1;
        Ok(reply)
    }

    fn task_details(&self, params: &Value) -> CccResult<Value> {
        let task_id = params["task_id"].as_str().unwrap_or_default();
        let mut details = self.poll("task", "get_task_by_id", task_id)?;
        if let Value::Object(obj) = &mut details {
            obj.insert("id".to_string(), json!(task_id));
        }
        Ok(json!({ "response": details }))
    }

    fn task_record(&self, params: &Value) -> CccResult<Value> {
        let task_id = params["id"].as_str().unwrap_or_default();
        let details = self.poll("task", "get_tasks_by_id", task_id)?;
        let status = if details["isError"].as_bool().unwrap_or(false) {
            "FAILURE"
        } else if details.get("endTime").is_some_and(|v| !v.is_null()) {
            "SUCCESS"
        } else {
            "PENDING"
        };
        Ok(json!({"response": {"id": task_id, "status": status}}))
    }

    /// `get_task_by_id` calls made during `get_tasks_by_id` failure lookups
    /// must not advance the script twice, so they read without polling.
    fn peek_details(&self, params: &Value) -> CccResult<Value> {
        let task_id = params["task_id"].as_str().unwrap_or_default();
        let tasks = lock(&self.tasks);
        let entry = tasks
            .get(task_id)
            .ok_or_else(|| CccError::http("task", "get_task_by_id", 404, format!("task {} not found", task_id)))?;
        Ok(json!({ "response": entry.script.reply(entry.polls.saturating_sub(1)) }))
    }
}

#[async_trait]
impl CccApi for MockCcc {
    async fn invoke(&self, family: &str, function: &str, params: &Value, op_modifies: bool) -> CccResult<Value> {
        debug!(family, function, op_modifies, "mock call");
        lock(&self.calls).push(RecordedCall {
            family: family.to_string(),
            function: function.to_string(),
            params: params.clone(),
            op_modifies,
        });

        match (family, function) {
            ("platform", "release_summary") => {
                let version = lock(&self.version).clone();
                return Ok(json!({"response": {"displayVersion": version, "installedVersion": version}}));
            }
            ("task", "get_task_by_id") => {
                let polled_by_id = lock(&self.calls)
                    .iter()
                    .rev()
                    .nth(1)
                    .is_some_and(|c| c.function == "get_tasks_by_id");
                return if polled_by_id {
                    self.peek_details(params)
                } else {
                    self.task_details(params)
                };
            }
            ("task", "get_tasks_by_id") => return self.task_record(params),
            _ => {}
        }

        let script = {
            let responders = lock(&self.responders);
            match responders.get(&key(family, function)) {
                Some(Responder::Reply(reply)) => return reply(params),
                Some(Responder::Task(script)) => script(params),
                None => {
                    return Err(CccError::UnknownFunction {
                        family: family.to_string(),
                        function: function.to_string(),
                    })
                }
            }
        };
        Ok(self.start_task(script))
    }
}

fn key(family: &str, function: &str) -> String {
    format!("{}.{}", family, function)
}

/// Locks a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccc_client::{TaskId, TaskRecordStatus};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_task_lifecycle() {
        let mock = MockCcc::default();
        mock.on_task("sda", "add_layer3_virtual_networks", |_| TaskScript::succeeds_after(1, "done"));

        let resp = mock
            .invoke("sda", "add_layer3_virtual_networks", &json!({"payload": []}), true)
            .await
            .unwrap();
        let task_id = TaskId::from_response(&resp).unwrap();
        assert_eq!(mock.task_ids(), vec![task_id.to_string()]);

        let first = mock.get_task_details(&task_id).await.unwrap();
        assert_eq!(first.progress, "In progress");
        let second = mock.get_task_details(&task_id).await.unwrap();
        assert_eq!(second.progress, "done");
        assert!(second.has_ended());
        assert_eq!(mock.polls(task_id.as_str()), 2);
        assert_eq!(mock.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_tasks_by_id_status() {
        let mock = MockCcc::default();
        mock.add_task("t-ok", TaskScript::succeeds("done"));
        mock.add_task("t-bad", TaskScript::fails("nope"));
        mock.add_task("t-slow", TaskScript::never_finishes("working"));

        assert_eq!(mock.get_tasks_by_id(&TaskId::new("t-ok")).await.unwrap().status, TaskRecordStatus::Success);
        assert_eq!(mock.get_tasks_by_id(&TaskId::new("t-bad")).await.unwrap().status, TaskRecordStatus::Failure);
        assert_eq!(mock.get_tasks_by_id(&TaskId::new("t-slow")).await.unwrap().status, TaskRecordStatus::Pending);

        // The failure-reason lookup after a FAILURE does not advance the script.
        let details = mock.get_task_details(&TaskId::new("t-bad")).await.unwrap();
        assert_eq!(details.failure_reason.as_deref(), Some("nope"));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let mock = MockCcc::default();
        let err = mock.invoke("sites", "get_site", &json!({}), false).await.unwrap_err();
        assert!(matches!(err, CccError::UnknownFunction { .. }));
        assert_eq!(mock.call_count("sites", "get_site"), 1);
    }

    #[tokio::test]
    async fn test_version_probe() {
        let mock = MockCcc::new("2.3.5.3");
        assert_eq!(mock.ccc_version().await.unwrap(), "2.3.5.3");
        mock.set_version("2.3.7.9");
        assert_eq!(mock.ccc_version().await.unwrap(), "2.3.7.9");
    }

    #[tokio::test]
    async fn test_on_error() {
        let mock = MockCcc::default();
        mock.on_error("sda", "get_fabric_sites", 500, "internal");
        let err = mock.invoke("sda", "get_fabric_sites", &json!({}), false).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
