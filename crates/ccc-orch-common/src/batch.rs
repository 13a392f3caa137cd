//! Fan-out of device-list operations across batches.
//!
//! The driver splits the device list, starts every batch before polling
//! any of them, and gives each failed batch one more chance with its
//! devices submitted one at a time. Devices filtered out before batching
//! are carried through as `skipped` and never counted as failures.

use crate::context::RunContext;
use crate::error::{OrchError, OrchResult};
use crate::task::{PredicateTable, TaskState};
use ccc_client::TaskId;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// A controller operation that takes a list of device ids.
#[derive(Debug, Clone)]
pub struct BatchOperation {
    /// Human name used in logs and messages, e.g. `run compliance`.
    pub name: String,
    pub family: String,
    pub function: String,
    /// Payload key that carries the device list.
    pub members_key: String,
    /// Payload template; the members key is overwritten per batch.
    pub params: Value,
    pub predicates: PredicateTable,
    pub failure_prefix: String,
}

impl BatchOperation {
    pub fn new(
        name: impl Into<String>,
        family: impl Into<String>,
        function: impl Into<String>,
        params: Value,
    ) -> Self {
        let name = name.into();
        Self {
            failure_prefix: format!("{} failed", name),
            name,
            family: family.into(),
            function: function.into(),
            members_key: "deviceUuids".to_string(),
            params,
            predicates: PredicateTable::new(),
        }
    }

    pub fn with_members_key(mut self, key: impl Into<String>) -> Self {
        self.members_key = key.into();
        self
    }

    pub fn with_predicates(mut self, predicates: PredicateTable) -> Self {
        self.predicates = predicates;
        self
    }

    /// Payload for one batch: a fresh copy of the template with the
    /// members substituted.
    fn params_for(&self, members: &[String]) -> Value {
        let mut payload = match &self.params {
            Value::Object(obj) => obj.clone(),
            _ => Map::new(),
        };
        payload.insert(self.members_key.clone(), json!(members));
        Value::Object(payload)
    }
}

/// Bookkeeping for one slice of a fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDescriptor {
    pub batch_index: usize,
    pub members: Vec<String>,
    pub params: Value,
    pub task_id: Option<TaskId>,
    pub terminal_status: TaskState,
    pub message: String,
    /// Index of the batch this single-device retry came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<usize>,
}

impl BatchDescriptor {
    fn new(batch_index: usize, members: Vec<String>, params: Value, retry_of: Option<usize>) -> Self {
        Self {
            batch_index,
            members,
            params,
            task_id: None,
            terminal_status: TaskState::Pending,
            message: String::new(),
            retry_of,
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.terminal_status = TaskState::Failed;
        self.message = message.into();
    }
}

/// Aggregated outcome of a batched operation.
///
/// `succeeded`, `failed` and `skipped` are disjoint; the first two
/// together cover every device that was submitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub batches: Vec<BatchDescriptor>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn changed(&self) -> bool {
        !self.succeeded.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    /// `{success, failed, skipped}` device cohorts for the module response.
    pub fn cohorts(&self) -> Value {
        json!({
            "success": self.succeeded,
            "failed": self.failed,
            "skipped": self.skipped,
        })
    }

    /// `Err(PartialBatchFailure)` if any device failed.
    pub fn check(&self, operation: &str) -> OrchResult<()> {
        if self.is_partial() {
            return Err(OrchError::PartialBatchFailure {
                operation: operation.to_string(),
                succeeded: self.succeeded.len(),
                failed: self.failed.len(),
            });
        }
        Ok(())
    }
}

/// Runs a [`BatchOperation`] over a device list.
#[derive(Debug, Clone, Copy)]
pub struct BatchDriver {
    batch_size: usize,
}

impl BatchDriver {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Starts, polls, and retries the batches, then aggregates cohorts.
    ///
    /// `devices` must already be filtered to eligible ones; `skipped` is
    /// reported as given. A repeated id is submitted once, at its first
    /// position.
    #[instrument(skip_all, fields(operation = %op.name, devices = devices.len(), batch_size = self.batch_size))]
    pub async fn run(
        &self,
        ctx: &mut RunContext,
        op: &BatchOperation,
        devices: &[String],
        skipped: Vec<String>,
    ) -> OrchResult<BatchReport> {
        let mut seen = HashSet::new();
        let devices: Vec<String> = devices.iter().filter(|d| seen.insert(d.as_str())).cloned().collect();

        let mut batches: Vec<BatchDescriptor> = devices
            .chunks(self.batch_size)
            .enumerate()
            .map(|(i, members)| BatchDescriptor::new(i, members.to_vec(), op.params_for(members), None))
            .collect();

        info!(batches = batches.len(), "Starting batches");
        start_all(ctx, op, &mut batches).await;
        poll_all(ctx, op, &mut batches).await;

        let mut retries: Vec<BatchDescriptor> = Vec::new();
        for batch in batches.iter().filter(|b| b.terminal_status == TaskState::Failed) {
            warn!(batch = batch.batch_index, message = %batch.message, "Batch failed, retrying one device at a time");
            for member in &batch.members {
                let members = vec![member.clone()];
                let params = op.params_for(&members);
                retries.push(BatchDescriptor::new(
                    batches.len() + retries.len(),
                    members,
                    params,
                    Some(batch.batch_index),
                ));
            }
        }

        if !retries.is_empty() {
            start_all(ctx, op, &mut retries).await;
            poll_all(ctx, op, &mut retries).await;
            batches.extend(retries);
        }

        let ok: HashSet<&str> = batches
            .iter()
            .filter(|b| b.terminal_status == TaskState::Success)
            .flat_map(|b| b.members.iter().map(String::as_str))
            .collect();
        let (succeeded, failed): (Vec<String>, Vec<String>) =
            devices.iter().cloned().partition(|d| ok.contains(d.as_str()));

        info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            skipped = skipped.len(),
            "Batched operation finished"
        );

        Ok(BatchReport {
            batches,
            succeeded,
            failed,
            skipped,
        })
    }
}

/// Issues every start call in order before any polling.
async fn start_all(ctx: &RunContext, op: &BatchOperation, batches: &mut [BatchDescriptor]) {
    for batch in batches.iter_mut() {
        match ctx.invoke_task(&op.family, &op.function, &batch.params).await {
            Ok(task_id) => {
                info!(batch = batch.batch_index, members = batch.members.len(), task_id = %task_id, "Batch started");
                batch.task_id = Some(task_id);
                batch.terminal_status = TaskState::InProgress;
            }
            Err(e) => batch.fail(e.to_string()),
        }
    }
}

/// Polls every started batch to a terminal state, in input order.
async fn poll_all(ctx: &mut RunContext, op: &BatchOperation, batches: &mut [BatchDescriptor]) {
    for batch in batches.iter_mut() {
        let Some(task_id) = batch.task_id.clone() else {
            continue;
        };
        if batch.terminal_status.is_terminal() {
            continue;
        }
        match ctx.await_task(&task_id, &op.predicates, &op.failure_prefix).await {
            Ok(outcome) => {
                batch.terminal_status = outcome.state;
                batch.message = outcome.message;
                if outcome.state == TaskState::Success {
                    ctx.mark_changed();
                }
            }
            Err(e) => batch.fail(e.to_string()),
        }
        info!(batch = batch.batch_index, status = %batch.terminal_status, "Batch finished");
    }
}
