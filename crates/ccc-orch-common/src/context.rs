//! Per-run state threaded through the workflow stages.

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::clock::{Clock, TokioClock};
use crate::config::ModuleArgs;
use crate::error::{ErrorKind, OrchError, OrchResult};
use crate::lookup::{DeviceInfo, DeviceQuery, FabricInfo, Lookups, SiteInfo};
use crate::paginate::{paginate, PageOptions};
use crate::result::{RunResult, RunStatus};
use crate::schema::{ArgSpec, NO_LOG_PLACEHOLDER};
use crate::task::{PollSettings, PredicateTable, TaskOutcome, TaskPoller};
use ccc_client::{CccApi, TaskId};
use ccc_types::CccVersion;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything one module invocation owns.
///
/// Desired and current state are typed per workflow and live in the
/// runner; the context carries what every stage shares.
pub struct RunContext {
    client: Arc<dyn CccApi>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    pub args: ModuleArgs,
    pub validated_config: Vec<Value>,
    pub result: RunResult,
    pub status: RunStatus,
    pub msg: String,
    pub lookups: Lookups,
    module: String,
    schema: ArgSpec,
    ccc_version: Option<CccVersion>,
}

impl RunContext {
    pub fn new(client: Arc<dyn CccApi>, args: ModuleArgs) -> Self {
        let lookups = Lookups::new(args.validate_response_schema);
        Self {
            client,
            clock: Arc::new(TokioClock::new()),
            cancel: CancellationToken::new(),
            args,
            validated_config: Vec::new(),
            result: RunResult::default(),
            status: RunStatus::Ok,
            msg: String::new(),
            lookups,
            module: String::new(),
            schema: ModuleArgs::common_spec(),
            ccc_version: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Tags the context with the running module and its block schema.
    pub fn bind_module(&mut self, name: &str, schema: &ArgSpec) {
        self.module = name.to_string();
        self.schema = schema.clone();
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn client(&self) -> &dyn CccApi {
        self.client.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.args.poll_settings()
    }

    /// Controller version: probed if known, otherwise the declared one.
    pub fn version(&self) -> CccVersion {
        self.ccc_version
            .clone()
            .or_else(|| self.args.declared_version().ok())
            .unwrap_or_else(|| CccVersion::new(vec![2, 2, 3, 3]))
    }

    pub fn set_version(&mut self, version: CccVersion) {
        self.ccc_version = Some(version);
    }

    /// Asks the controller for its version and remembers it.
    pub async fn probe_version(&mut self) -> OrchResult<CccVersion> {
        let raw = self.client.ccc_version().await?;
        let version: CccVersion = raw.parse().map_err(|_| {
            OrchError::transport("platform", "release_summary", format!("unparseable version '{}'", raw))
        })?;
        info!(version = %version, "Catalyst Center version");
        self.ccc_version = Some(version.clone());
        Ok(version)
    }

    /// Makes one call. State-changing calls are audited.
    pub async fn invoke(
        &self,
        family: &str,
        function: &str,
        params: &Value,
        op_modifies: bool,
    ) -> OrchResult<Value> {
        info!(module = %self.module, family, function, op_modifies, "Calling Catalyst Center");
        let reply = self.client.invoke(family, function, params, op_modifies).await;

        if op_modifies {
            let record = AuditRecord::new(
                AuditCategory::for_function(function),
                self.module.clone(),
                format!("{}.{}", family, function),
            )
            .with_details(self.redact(params));
            match &reply {
                Ok(resp) => {
                    let record = match TaskId::from_response(resp) {
                        Some(task) => record.with_object_id(task.as_str()).with_outcome(AuditOutcome::InProgress),
                        None => record.with_outcome(AuditOutcome::Success),
                    };
                    audit_log!(record);
                }
                Err(e) => {
                    audit_log!(record.with_error(e.to_string()));
                }
            }
        }

        let resp = reply.map_err(OrchError::from)?;
        debug!(family, function, response = %self.redact(&resp), "Catalyst Center response");
        Ok(resp)
    }

    /// Makes a state-changing call and returns the task handle it produced.
    pub async fn invoke_task(&self, family: &str, function: &str, params: &Value) -> OrchResult<TaskId> {
        let resp = self.invoke(family, function, params, true).await?;
        TaskId::from_response(&resp).ok_or_else(|| {
            OrchError::transport(family, function, format!("no task id in response: {}", resp))
        })
    }

    /// Polls a task with the flavour matching the controller version.
    pub async fn await_task(
        &self,
        task_id: &TaskId,
        predicates: &PredicateTable,
        failure_prefix: &str,
    ) -> OrchResult<TaskOutcome> {
        let version = self.version();
        self.poller()
            .await_for_version(&version, task_id, predicates, failure_prefix)
            .await
    }

    /// Starts a task, polls it to a terminal state, and marks the run
    /// changed on success.
    pub async fn run_task(
        &mut self,
        family: &str,
        function: &str,
        params: &Value,
        predicates: &PredicateTable,
        failure_prefix: &str,
    ) -> OrchResult<TaskOutcome> {
        let task_id = self.invoke_task(family, function, params).await?;
        let outcome = self.await_task(&task_id, predicates, failure_prefix).await?.into_result()?;
        self.mark_changed();
        Ok(outcome)
    }

    pub fn poller(&self) -> TaskPoller<'_> {
        TaskPoller::new(self.client.as_ref(), self.clock.as_ref(), &self.cancel, self.poll_settings())
    }

    /// Records that a state-changing call succeeded.
    pub fn mark_changed(&mut self) {
        self.result.changed = true;
    }

    pub async fn paginate(&self, family: &str, function: &str, params: &Value) -> OrchResult<Vec<Value>> {
        self.paginate_with(family, function, params, PageOptions::default()).await
    }

    pub async fn paginate_with(
        &self,
        family: &str,
        function: &str,
        params: &Value,
        options: PageOptions,
    ) -> OrchResult<Vec<Value>> {
        paginate(self.client.as_ref(), family, function, params, options).await
    }

    /// Decodes a response item.
    ///
    /// With `validate_response_schema` a shape mismatch is an error;
    /// otherwise it is logged and reported as "not found".
    pub fn decode<T: DeserializeOwned>(&self, value: &Value, context: &str) -> OrchResult<Option<T>> {
        if value.is_null() || value.as_array().is_some_and(|a| a.is_empty()) {
            return Ok(None);
        }
        match serde_json::from_value::<T>(value.clone()) {
            Ok(v) => Ok(Some(v)),
            Err(e) if self.args.validate_response_schema => {
                Err(OrchError::transport(context, "decode", e.to_string()))
            }
            Err(e) => {
                warn!(context, error = %e, "Unexpected response shape, treating as not found");
                Ok(None)
            }
        }
    }

    /// Decodes a list of items, dropping malformed ones in lenient mode.
    pub fn decode_items<T: DeserializeOwned>(&self, items: &[Value], context: &str) -> OrchResult<Vec<T>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let Some(v) = self.decode(item, context)? {
                out.push(v);
            }
        }
        Ok(out)
    }

    /// Copy of `value` with secrets replaced.
    pub fn redact(&self, value: &Value) -> Value {
        scrub_secrets(&self.schema.redact(value))
    }

    /// Attaches redacted diagnostics to the result.
    pub fn set_diagnostics(&mut self, diagnostics: Value) {
        self.result.diagnostics = Some(self.redact(&diagnostics));
    }

    /// Records a fatal error.
    pub fn fail(&mut self, err: &OrchError) {
        self.status = if err.kind() == ErrorKind::InvalidInput {
            RunStatus::Invalid
        } else {
            RunStatus::Failed
        };
        self.msg = err.to_string();
        self.result.record_error(err);
    }

    pub async fn site_by_name(&mut self, name: &str) -> OrchResult<Option<SiteInfo>> {
        let version = self.version();
        self.lookups.site_by_name(self.client.as_ref(), &version, name).await
    }

    pub async fn site_by_id(&mut self, id: &str) -> OrchResult<Option<SiteInfo>> {
        let version = self.version();
        self.lookups.site_by_id(self.client.as_ref(), &version, id).await
    }

    pub async fn device(&mut self, query: &DeviceQuery) -> OrchResult<Option<DeviceInfo>> {
        self.lookups.device(self.client.as_ref(), query).await
    }

    pub async fn devices_by_ips(&mut self, ips: &[String]) -> OrchResult<Vec<DeviceInfo>> {
        self.lookups.devices_by_ips(self.client.as_ref(), ips).await
    }

    pub async fn devices_by_ids(&mut self, ids: &[String]) -> OrchResult<Vec<DeviceInfo>> {
        self.lookups.devices_by_ids(self.client.as_ref(), ids).await
    }

    /// Ids of the devices assigned to a site.
    pub async fn site_device_ids(&mut self, site_id: &str) -> OrchResult<Vec<String>> {
        self.lookups.site_device_ids(self.client.as_ref(), site_id).await
    }

    pub async fn fabric_for_site(&mut self, site_id: &str) -> OrchResult<Option<FabricInfo>> {
        self.lookups.fabric_for_site(self.client.as_ref(), site_id).await
    }

    pub async fn fabric_by_id(&mut self, fabric_id: &str) -> OrchResult<Option<FabricInfo>> {
        self.lookups.fabric_by_id(self.client.as_ref(), fabric_id).await
    }
}

fn is_secret_key(key: &str) -> bool {
    let k = key.to_ascii_lowercase();
    k.contains("secret") || k.contains("password") || k.ends_with("key")
}

/// Replaces values of controller-side secret fields.
fn scrub_secrets(value: &Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| {
                    let scrubbed = if is_secret_key(k) && (v.is_string() || v.is_number()) {
                        Value::String(NO_LOG_PLACEHOLDER.to_string())
                    } else {
                        scrub_secrets(v)
                    };
                    (k.clone(), scrubbed)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(scrub_secrets).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::task::TaskState;
    use async_trait::async_trait;
    use ccc_client::{CccError, CccResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    struct Fake {
        calls: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl CccApi for Fake {
        async fn invoke(&self, family: &str, function: &str, _params: &Value, op_modifies: bool) -> CccResult<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((format!("{}.{}", family, function), op_modifies));
            match function {
                "add_thing" => Ok(json!({"response": {"taskId": "task-7"}})),
                "get_task_by_id" => Ok(json!({"response": {"isError": false, "progress": "thing created"}})),
                "release_summary" => Ok(json!({"response": {"displayVersion": "2.3.5.3"}})),
                "no_task" => Ok(json!({"response": {}})),
                _ => Err(CccError::http(family, function, 500, "boom")),
            }
        }
    }

    fn ctx() -> (RunContext, Arc<Fake>) {
        let fake = Arc::new(Fake {
            calls: Mutex::new(Vec::new()),
        });
        let ctx = RunContext::new(fake.clone(), ModuleArgs::new("h"))
            .with_clock(Arc::new(VirtualClock::new()));
        (ctx, fake)
    }

    #[tokio::test]
    async fn test_run_task_marks_changed() {
        let (mut ctx, _fake) = ctx();
        ctx.probe_version().await.unwrap();
        let outcome = ctx
            .run_task("things", "add_thing", &json!({}), &PredicateTable::always(["created"]), "")
            .await
            .unwrap();
        assert_eq!(outcome.state, TaskState::Success);
        assert!(ctx.result.changed);
    }

    #[tokio::test]
    async fn test_missing_task_id_is_error() {
        let (ctx, _fake) = ctx();
        let err = ctx.invoke_task("things", "no_task", &json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!ctx.result.changed);
    }

    #[tokio::test]
    async fn test_failed_call_is_transport_error() {
        let (ctx, fake) = ctx();
        let err = ctx.invoke("things", "explode", &json!({}), true).await.unwrap_err();
        assert!(err.to_string().contains("things.explode"));
        assert_eq!(fake.calls.lock().unwrap()[0], ("things.explode".to_string(), true));
    }

    #[test]
    fn test_decode_strict_and_lenient() {
        #[derive(serde::Deserialize, Debug)]
        struct Thing {
            #[allow(dead_code)]
            id: String,
        }

        let (mut ctx, _fake) = ctx();
        assert!(ctx.decode::<Thing>(&json!({"name": 1}), "things").is_err());
        assert!(ctx.decode::<Thing>(&json!([]), "things").unwrap().is_none());

        ctx.args.validate_response_schema = false;
        assert!(ctx.decode::<Thing>(&json!({"name": 1}), "things").unwrap().is_none());
        assert!(ctx.decode::<Thing>(&json!({"id": "a"}), "things").unwrap().is_some());
    }

    #[test]
    fn test_redact_scrubs_controller_secrets() {
        let (ctx, _fake) = ctx();
        let redacted = ctx.redact(&json!({
            "ipAddress": "10.0.0.1",
            "sharedSecret": "s3cr3t",
            "encryptionKey": "0123456789abcdef",
            "nested": [{"password": "pw"}]
        }));
        assert_eq!(redacted["ipAddress"], json!("10.0.0.1"));
        assert_eq!(redacted["sharedSecret"], json!(NO_LOG_PLACEHOLDER));
        assert_eq!(redacted["encryptionKey"], json!(NO_LOG_PLACEHOLDER));
        assert_eq!(redacted["nested"][0]["password"], json!(NO_LOG_PLACEHOLDER));
    }

    #[test]
    fn test_fail_sets_status() {
        let (mut ctx, _fake) = ctx();
        ctx.fail(&OrchError::invalid_input("x"));
        assert_eq!(ctx.status, RunStatus::Invalid);
        ctx.fail(&OrchError::precondition("y"));
        assert_eq!(ctx.status, RunStatus::Failed);
        assert!(ctx.result.failed);
        assert_eq!(ctx.msg, "y");
    }
}
