//! Asynchronous task polling.
//!
//! Mutating Catalyst Center calls return a task handle. The poller follows
//! that handle until it reaches a terminal state or the time budget runs out:
//!
//! ```text
//! PENDING -> IN_PROGRESS -> SUCCESS
//!                        -> FAILED
//!                        -> TIMED_OUT
//! ```
//!
//! Two endpoint flavours exist. Controllers up to and including
//! [`TASKS_BY_ID_THRESHOLD`] only offer the legacy `/task/{id}` shape, whose
//! success is recognised by scanning `progress` for version-specific
//! phrases held in a [`PredicateTable`]. Newer controllers report an explicit
//! status through `/tasks/{id}`.

use crate::clock::Clock;
use crate::error::{OrchError, OrchResult};
use ccc_client::{CccApi, TaskId, TaskRecordStatus};
use ccc_types::{CccVersion, VersionRange};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Last controller version that only offers the legacy task endpoint.
pub const TASKS_BY_ID_THRESHOLD: &str = "2.3.5.3";

/// Lifecycle state of a task handle as observed by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    InProgress,
    Success,
    Failed,
    TimedOut,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failed | TaskState::TimedOut)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "PENDING",
            TaskState::InProgress => "IN_PROGRESS",
            TaskState::Success => "SUCCESS",
            TaskState::Failed => "FAILED",
            TaskState::TimedOut => "TIMED_OUT",
        };
        f.write_str(s)
    }
}

/// Terminal result of polling one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    pub state: TaskState,
    pub message: String,
    pub details: Value,
    #[serde(skip)]
    pub elapsed: Duration,
    #[serde(skip)]
    pub timeout: Duration,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.state == TaskState::Success
    }

    /// Converts failure and timeout outcomes into errors.
    pub fn into_result(self) -> OrchResult<TaskOutcome> {
        match self.state {
            TaskState::Failed => Err(OrchError::task_failure(self.task_id.as_str(), self.message)),
            TaskState::TimedOut => Err(OrchError::TaskTimeout {
                task_id: self.task_id.to_string(),
                timeout_secs: self.timeout.as_secs(),
                note: if self.message.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", self.message)
                },
            }),
            _ => Ok(self),
        }
    }
}

/// Time budget for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollSettings {
    pub fn new(timeout_secs: u64, interval_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            interval: Duration::from_secs(interval_secs),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(1200, 2)
    }
}

/// Which task endpoint to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFlavour {
    /// `/task/{id}` with progress predicates.
    TaskDetails,
    /// `/tasks/{id}` with an explicit status.
    TasksById,
}

impl PollFlavour {
    pub fn for_version(version: &CccVersion) -> Self {
        let threshold = CccVersion::new(vec![2, 3, 5, 3]);
        if version.at_most(&threshold) {
            PollFlavour::TaskDetails
        } else {
            PollFlavour::TasksById
        }
    }
}

/// Success phrases indexed by controller version range.
///
/// Lookups return the union of every entry whose range contains the version,
/// lower-cased for case-insensitive matching.
#[derive(Debug, Clone, Default)]
pub struct PredicateTable {
    entries: Vec<(VersionRange, Vec<String>)>,
}

impl PredicateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(mut self, range: VersionRange, predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .push((range, predicates.into_iter().map(Into::into).collect()));
        self
    }

    /// Phrases that apply to every version.
    pub fn always<I, S>(predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().with(VersionRange::any(), predicates)
    }

    pub fn for_version(&self, version: &CccVersion) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (range, predicates) in &self.entries {
            if !range.contains(version) {
                continue;
            }
            for p in predicates {
                let p = p.to_lowercase();
                if !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out
    }
}

/// Polls task handles against a time budget.
pub struct TaskPoller<'a> {
    client: &'a dyn CccApi,
    clock: &'a dyn Clock,
    cancel: &'a CancellationToken,
    settings: PollSettings,
}

impl<'a> TaskPoller<'a> {
    pub fn new(
        client: &'a dyn CccApi,
        clock: &'a dyn Clock,
        cancel: &'a CancellationToken,
        settings: PollSettings,
    ) -> Self {
        Self {
            client,
            clock,
            cancel,
            settings,
        }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Polls with the flavour appropriate for `version`.
    pub async fn await_for_version(
        &self,
        version: &CccVersion,
        task_id: &TaskId,
        predicates: &PredicateTable,
        failure_prefix: &str,
    ) -> OrchResult<TaskOutcome> {
        match PollFlavour::for_version(version) {
            PollFlavour::TaskDetails => {
                self.await_task(task_id, &predicates.for_version(version), failure_prefix)
                    .await
            }
            PollFlavour::TasksById => self.await_task_by_id(task_id, failure_prefix).await,
        }
    }

    /// Polls the legacy endpoint until `progress` matches a success phrase,
    /// `isError` is set, or the budget is spent.
    ///
    /// With no success phrases, a task that has an end time and no error is
    /// treated as successful.
    #[instrument(skip(self, task_id, success_predicates), fields(task_id = %task_id))]
    pub async fn await_task(
        &self,
        task_id: &TaskId,
        success_predicates: &[String],
        failure_prefix: &str,
    ) -> OrchResult<TaskOutcome> {
        let start = self.clock.now();
        let predicates: Vec<String> = success_predicates.iter().map(|p| p.to_lowercase()).collect();

        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.outcome(task_id, TaskState::TimedOut, "interrupted", Value::Null, start));
            }

            let details = self.client.get_task_details(task_id).await?;
            debug!(progress = %details.progress, is_error = details.is_error, "Polled task");
            let raw = serde_json::to_value(&details).unwrap_or(Value::Null);

            if details.is_error {
                let message = prefixed(failure_prefix, &details.failure_message());
                warn!(%message, "Task failed");
                return Ok(self.outcome(task_id, TaskState::Failed, message, raw, start));
            }

            let progress = details.progress.to_lowercase();
            let matched = predicates.iter().any(|p| progress.contains(p.as_str()));
            if matched || (predicates.is_empty() && details.has_ended()) {
                info!(progress = %details.progress, "Task completed");
                return Ok(self.outcome(task_id, TaskState::Success, details.progress.clone(), raw, start));
            }

            match self.remaining(start) {
                Some(wait) => self.clock.sleep(wait).await,
                None => {
                    warn!(timeout_secs = self.settings.timeout.as_secs(), "Task timed out");
                    return Ok(self.outcome(task_id, TaskState::TimedOut, "", raw, start));
                }
            }
        }
    }

    /// Polls the `/tasks/{id}` endpoint until it reports SUCCESS or FAILURE.
    #[instrument(skip(self, task_id), fields(task_id = %task_id))]
    pub async fn await_task_by_id(
        &self,
        task_id: &TaskId,
        failure_prefix: &str,
    ) -> OrchResult<TaskOutcome> {
        let start = self.clock.now();

        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.outcome(task_id, TaskState::TimedOut, "interrupted", Value::Null, start));
            }

            let record = self.client.get_tasks_by_id(task_id).await?;
            debug!(status = ?record.status, "Polled task");
            let raw = serde_json::to_value(&record).unwrap_or(Value::Null);

            match record.status {
                TaskRecordStatus::Success => {
                    info!("Task completed");
                    return Ok(self.outcome(task_id, TaskState::Success, "SUCCESS", raw, start));
                }
                TaskRecordStatus::Failure => {
                    let reason = match self.client.get_task_details(task_id).await {
                        Ok(details) if !details.failure_message().is_empty() => details.failure_message(),
                        _ => "task reported FAILURE".to_string(),
                    };
                    let message = prefixed(failure_prefix, &reason);
                    warn!(%message, "Task failed");
                    return Ok(self.outcome(task_id, TaskState::Failed, message, raw, start));
                }
                TaskRecordStatus::Pending | TaskRecordStatus::Unknown => {}
            }

            match self.remaining(start) {
                Some(wait) => self.clock.sleep(wait).await,
                None => {
                    warn!(timeout_secs = self.settings.timeout.as_secs(), "Task timed out");
                    return Ok(self.outcome(task_id, TaskState::TimedOut, "", raw, start));
                }
            }
        }
    }

    /// Next sleep, capped so the loop never overruns the deadline by more
    /// than one poll; `None` once the budget is spent.
    fn remaining(&self, start: Duration) -> Option<Duration> {
        let elapsed = self.clock.now().saturating_sub(start);
        if elapsed >= self.settings.timeout {
            return None;
        }
        Some(self.settings.interval.min(self.settings.timeout - elapsed))
    }

    fn outcome(
        &self,
        task_id: &TaskId,
        state: TaskState,
        message: impl Into<String>,
        details: Value,
        start: Duration,
    ) -> TaskOutcome {
        TaskOutcome {
            task_id: task_id.clone(),
            state,
            message: message.into(),
            details,
            elapsed: self.clock.now().saturating_sub(start),
            timeout: self.settings.timeout,
        }
    }
}

fn prefixed(prefix: &str, reason: &str) -> String {
    if prefix.is_empty() {
        reason.to_string()
    } else {
        format!("{}: {}", prefix, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use async_trait::async_trait;
    use ccc_client::CccResult;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves task replies from a script, repeating the last one.
    struct ScriptedTask {
        replies: Mutex<Vec<Value>>,
        polls: Mutex<usize>,
    }

    impl ScriptedTask {
        fn new(replies: Vec<Value>) -> Self {
            Self {
                replies: Mutex::new(replies),
                polls: Mutex::new(0),
            }
        }

        fn polls(&self) -> usize {
            *self.polls.lock().unwrap()
        }
    }

    #[async_trait]
    impl CccApi for ScriptedTask {
        async fn invoke(&self, _: &str, _: &str, _: &Value, _: bool) -> CccResult<Value> {
            *self.polls.lock().unwrap() += 1;
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies[0].clone()
            };
            Ok(json!({ "response": reply }))
        }
    }

    fn v(s: &str) -> CccVersion {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_success_on_predicate_match() {
        let api = ScriptedTask::new(vec![
            json!({"isError": false, "progress": "In progress"}),
            json!({"isError": false, "progress": "AAA server Operation Successful"}),
        ]);
        let clock = VirtualClock::new();
        let cancel = CancellationToken::new();
        let poller = TaskPoller::new(&api, &clock, &cancel, PollSettings::new(10, 2));

        let outcome = poller
            .await_task(&TaskId::new("t1"), &["operation successful".to_string()], "")
            .await
            .unwrap();
        assert_eq!(outcome.state, TaskState::Success);
        assert_eq!(api.polls(), 2);
        assert_eq!(clock.now(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_error_wins_over_predicate() {
        let api = ScriptedTask::new(vec![json!({
            "isError": true,
            "progress": "operation successful",
            "failureReason": "Device unreachable"
        })]);
        let clock = VirtualClock::new();
        let cancel = CancellationToken::new();
        let poller = TaskPoller::new(&api, &clock, &cancel, PollSettings::new(10, 2));

        let outcome = poller
            .await_task(&TaskId::new("t2"), &["operation successful".to_string()], "Failed to add server")
            .await
            .unwrap();
        assert_eq!(outcome.state, TaskState::Failed);
        assert_eq!(outcome.message, "Failed to add server: Device unreachable");
        assert!(outcome.into_result().is_err());
    }

    #[tokio::test]
    async fn test_timeout_within_one_interval() {
        let api = ScriptedTask::new(vec![json!({"isError": false, "progress": "still working"})]);
        let clock = VirtualClock::new();
        let cancel = CancellationToken::new();
        let poller = TaskPoller::new(&api, &clock, &cancel, PollSettings::new(10, 3));

        let outcome = poller
            .await_task(&TaskId::new("t3"), &["done".to_string()], "")
            .await
            .unwrap();
        assert_eq!(outcome.state, TaskState::TimedOut);
        assert!(clock.now() >= Duration::from_secs(10));
        assert!(clock.now() <= Duration::from_secs(13));
        // the last sleep is trimmed to the deadline
        assert_eq!(clock.sleeps().last(), Some(&Duration::from_secs(1)));

        let err = outcome.into_result().unwrap_err();
        assert!(err.to_string().contains("t3"));
    }

    #[tokio::test]
    async fn test_cancellation_reports_timeout() {
        let api = ScriptedTask::new(vec![json!({"isError": false, "progress": "working"})]);
        let clock = VirtualClock::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let poller = TaskPoller::new(&api, &clock, &cancel, PollSettings::default());

        let outcome = poller.await_task(&TaskId::new("t4"), &[], "").await.unwrap();
        assert_eq!(outcome.state, TaskState::TimedOut);
        assert_eq!(api.polls(), 0);
        assert!(outcome.into_result().unwrap_err().to_string().contains("interrupted"));
    }

    #[tokio::test]
    async fn test_end_time_without_predicates() {
        let api = ScriptedTask::new(vec![json!({"isError": false, "progress": "xyz", "endTime": 17})]);
        let clock = VirtualClock::new();
        let cancel = CancellationToken::new();
        let poller = TaskPoller::new(&api, &clock, &cancel, PollSettings::default());
        let outcome = poller.await_task(&TaskId::new("t5"), &[], "").await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_tasks_by_id_flavour() {
        let api = ScriptedTask::new(vec![
            json!({"id": "t6", "status": "PENDING"}),
            json!({"id": "t6", "status": "SUCCESS"}),
        ]);
        let clock = VirtualClock::new();
        let cancel = CancellationToken::new();
        let poller = TaskPoller::new(&api, &clock, &cancel, PollSettings::default());
        let outcome = poller
            .await_for_version(&v("2.3.7.6"), &TaskId::new("t6"), &PredicateTable::new(), "")
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(api.polls(), 2);
    }

    #[test]
    fn test_flavour_threshold() {
        assert_eq!(PollFlavour::for_version(&v("2.3.5.3")), PollFlavour::TaskDetails);
        assert_eq!(PollFlavour::for_version(&v("2.2.3.3")), PollFlavour::TaskDetails);
        assert_eq!(PollFlavour::for_version(&v("2.3.7.6")), PollFlavour::TasksById);
    }

    #[test]
    fn test_predicate_table_by_version() {
        let table = PredicateTable::new()
            .with(VersionRange::up_to(v("2.3.5.3")), ["Sucessfully"])
            .with(VersionRange::from(v("2.3.7.6")), ["Successfully"])
            .with(VersionRange::any(), ["operation successful"]);
        assert_eq!(
            table.for_version(&v("2.3.5.3")),
            vec!["sucessfully".to_string(), "operation successful".to_string()]
        );
        assert_eq!(
            table.for_version(&v("2.3.7.9")),
            vec!["successfully".to_string(), "operation successful".to_string()]
        );
    }
}
