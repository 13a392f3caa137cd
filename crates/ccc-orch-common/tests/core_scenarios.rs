//! End-to-end behaviour of the orchestration core against the scripted
//! controller: task timeout, version gate, pagination boundaries and
//! lookup caching.

use async_trait::async_trait;
use ccc_orch_common::{
    Clock, ModuleDescriptor, ModuleRunner, OrchResult, PredicateTable, RunContext, RunStatus, State, Workflow,
    WorkflowRunner,
};
use ccc_orch_common::{ArgSpec, FieldSpec, PageOptions};
use ccc_types::CccVersion;
use ccc_workflow_test::{
    assert_call_count, assert_msg_contains, assert_no_mutations, assert_outcome, init_tracing, module_args,
    run_context, serve_sites, site, MockCcc, TaskScript,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Creates one named widget per block through a task.
struct Widgets {
    desc: ModuleDescriptor,
}

impl Widgets {
    fn requiring(version: &str) -> Self {
        Self {
            desc: ModuleDescriptor::new(
                "widgets",
                vec![State::Merged],
                ArgSpec::new().field("name", FieldSpec::str().required()),
                version.parse().unwrap(),
            ),
        }
    }
}

#[async_trait]
impl Workflow for Widgets {
    type Want = String;
    type Have = ();

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.desc
    }

    async fn get_want(&self, _ctx: &mut RunContext, block: &Value, _state: State) -> OrchResult<String> {
        Ok(block["name"].as_str().unwrap_or_default().to_string())
    }

    async fn get_have(&self, _ctx: &mut RunContext, _want: &String, _state: State) -> OrchResult<()> {
        Ok(())
    }

    async fn get_diff_merged(&self, ctx: &mut RunContext, want: &String, _have: &()) -> OrchResult<()> {
        let outcome = ctx
            .run_task(
                "widgets",
                "create_widget",
                &json!({ "name": want }),
                &PredicateTable::always(["created"]),
                "Widget creation failed",
            )
            .await?;
        ctx.result.push_response(json!({ want.as_str(): outcome.message }));
        Ok(())
    }
}

#[tokio::test]
async fn test_task_timeout_is_bounded() {
    init_tracing();
    let mock = Arc::new(MockCcc::default());
    mock.on_task("widgets", "create_widget", |_| TaskScript::never_finishes("still working"));

    let args = module_args("merged", vec![json!({"name": "w1"})]).with_timeouts(10, 2);
    let (mut ctx, clock) = run_context(mock.clone(), args);
    let runner = WorkflowRunner::new(Widgets::requiring("2.3.7.6"));
    let result = runner.run(&mut ctx).await;

    assert_outcome(&result, false, true).unwrap();
    assert_eq!(ctx.status, RunStatus::Failed);
    assert_msg_contains(&result, "timeout").unwrap();
    let task_id = mock.task_ids()[0].clone();
    assert_msg_contains(&result, &task_id).unwrap();

    let elapsed = clock.now();
    assert!(elapsed >= Duration::from_secs(10), "{:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(12), "{:?}", elapsed);

    // No retry of the start call.
    assert_call_count(&mock, "widgets", "create_widget", 1).unwrap();
}

#[tokio::test]
async fn test_task_timeout_legacy_polling() {
    let mock = Arc::new(MockCcc::new("2.3.5.3"));
    mock.on_task("widgets", "create_widget", |_| TaskScript::never_finishes("still working"));

    let args = module_args("merged", vec![json!({"name": "w1"})]).with_timeouts(10, 2);
    let (mut ctx, clock) = run_context(mock.clone(), args);
    let result = WorkflowRunner::new(Widgets::requiring("2.3.5.3")).run(&mut ctx).await;

    assert_outcome(&result, false, true).unwrap();
    assert_msg_contains(&result, "timeout").unwrap();
    assert!(clock.now() <= Duration::from_secs(12));
    assert!(mock.call_count("task", "get_task_by_id") >= 5);
    assert_call_count(&mock, "task", "get_tasks_by_id", 0).unwrap();
}

#[tokio::test]
async fn test_version_gate_stops_before_any_call() {
    let mock = Arc::new(MockCcc::new("2.3.7.9"));
    mock.on_task("widgets", "create_widget", |_| TaskScript::succeeds("created"));

    let args = module_args("merged", vec![json!({"name": "w1"})]);
    let (mut ctx, _clock) = run_context(mock.clone(), args);
    let result = WorkflowRunner::new(Widgets::requiring("2.3.7.10")).run(&mut ctx).await;

    assert_outcome(&result, false, true).unwrap();
    assert_msg_contains(&result, "2.3.7.10").unwrap();
    assert_msg_contains(&result, "2.3.7.9").unwrap();
    assert_eq!(mock.calls().len(), 1);
    assert_call_count(&mock, "platform", "release_summary", 1).unwrap();
}

#[tokio::test]
async fn test_task_success_and_idempotent_status() {
    let mock = Arc::new(MockCcc::default());
    mock.on_task("widgets", "create_widget", |_| TaskScript::succeeds_after(2, "Widget created"));

    let args = module_args("merged", vec![json!({"name": "w1"}), json!({"name": "w2"})]);
    let (mut ctx, _clock) = run_context(mock.clone(), args);
    let result = WorkflowRunner::new(Widgets::requiring("2.3.7.6")).run(&mut ctx).await;

    assert_outcome(&result, true, false).unwrap();
    assert_eq!(ctx.status, RunStatus::Success);
    assert_eq!(result.response.as_array().map(Vec::len), Some(2));
    // Terminal handles are never polled again.
    for task_id in mock.task_ids() {
        assert_eq!(mock.polls(&task_id), 3);
    }
}

#[tokio::test]
async fn test_invalid_block_never_mutates() {
    let mock = Arc::new(MockCcc::default());
    mock.on_task("widgets", "create_widget", |_| TaskScript::succeeds("created"));

    let args = module_args("merged", vec![json!({"name": "w1"}), json!({"name": 5, "extra": true})]);
    let (mut ctx, _clock) = run_context(mock.clone(), args);
    let result = WorkflowRunner::new(Widgets::requiring("2.3.7.6")).run(&mut ctx).await;

    assert_outcome(&result, false, true).unwrap();
    assert_eq!(ctx.status, RunStatus::Invalid);
    assert_no_mutations(&mock).unwrap();
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_pagination_boundaries() {
    for (total, expected_calls) in [(0usize, 1usize), (499, 1), (500, 2), (501, 2), (1000, 3)] {
        let mock = Arc::new(MockCcc::default());
        let sites: Vec<Value> = (0..total)
            .map(|i| site(&format!("s{}", i), &format!("Global/Area{}", i), "area"))
            .collect();
        serve_sites(&mock, sites);

        let (ctx, _clock) = run_context(mock.clone(), module_args("merged", vec![]));
        let items = ctx.paginate("site_design", "get_sites", &json!({})).await.unwrap();
        assert_eq!(items.len(), total);
        assert_eq!(mock.call_count("site_design", "get_sites"), expected_calls, "total={}", total);

        let offsets: Vec<Value> = mock
            .calls_to("site_design", "get_sites")
            .iter()
            .map(|c| c.params["offset"].clone())
            .collect();
        let expected: Vec<Value> = (0..expected_calls).map(|i| json!(1 + 500 * i)).collect();
        assert_eq!(offsets, expected);
    }
}

#[tokio::test]
async fn test_pagination_string_knobs() {
    let mock = Arc::new(MockCcc::default());
    serve_sites(&mock, vec![site("s1", "Global/A", "area")]);
    let (ctx, _clock) = run_context(mock.clone(), module_args("merged", vec![]));
    ctx.paginate_with("site_design", "get_sites", &json!({}), PageOptions::default().with_strings())
        .await
        .unwrap();
    let call = &mock.calls_to("site_design", "get_sites")[0];
    assert_eq!(call.params["offset"], json!("1"));
    assert_eq!(call.params["limit"], json!("500"));
}

#[tokio::test]
async fn test_pagination_error_names_offset() {
    let mock = Arc::new(MockCcc::default());
    mock.on_error("site_design", "get_sites", 500, "internal error");
    let (ctx, _clock) = run_context(mock.clone(), module_args("merged", vec![]));
    let err = ctx.paginate("site_design", "get_sites", &json!({})).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("site_design.get_sites"), "{}", msg);
    assert!(msg.contains("offset=1"), "{}", msg);
}

#[tokio::test]
async fn test_site_lookup_cached_per_run() {
    let mock = Arc::new(MockCcc::default());
    serve_sites(&mock, vec![site("s1", "Global/USA/SJC", "building")]);
    let (mut ctx, _clock) = run_context(mock.clone(), module_args("merged", vec![]));
    ctx.set_version(CccVersion::new(vec![2, 3, 7, 9]));

    let first = ctx.site_by_name("Global/USA/SJC").await.unwrap().unwrap();
    let second = ctx.site_by_name("Global/USA/SJC").await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.id, "s1");
    assert!(ctx.site_by_name("Global/USA/NYC").await.unwrap().is_none());
    assert_eq!(mock.call_count("site_design", "get_sites"), 2);
}
