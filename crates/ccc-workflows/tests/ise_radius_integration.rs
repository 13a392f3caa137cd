//! Authentication and policy server runs against a controller that keeps
//! the servers it is given.

use ccc_orch_common::{RunStatus, WorkflowRunner};
use ccc_workflow_test::{
    assert_call_count, assert_msg_contains, assert_mutation_count, assert_no_mutations, assert_outcome, init_tracing,
    module_args, run_module, MockCcc, TaskScript,
};
use ccc_workflows::ise_radius_integration::IseRadiusIntegration;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type Store = Arc<Mutex<Vec<Value>>>;

/// Fields the controller never hands back.
const SECRET_FIELDS: &[&str] = &["sharedSecret", "encryptionKey", "messageKey", "ciscoIseDtos"];

/// A controller whose server list follows add, edit and delete calls.
/// New ISE servers start in `INPROGRESS` until their certificate is
/// accepted.
fn server_controller(version: &str) -> (Arc<MockCcc>, Store) {
    let mock = Arc::new(MockCcc::new(version));
    let store: Store = Arc::new(Mutex::new(Vec::new()));

    let servers = store.clone();
    mock.on("system_settings", "get_authentication_and_policy_servers", move |_| {
        Ok(json!({ "response": servers.lock().unwrap().clone() }))
    });

    let servers = store.clone();
    mock.on_task(
        "system_settings",
        "add_authentication_and_policy_server_access_configuration",
        move |params| {
            let mut servers = servers.lock().unwrap();
            let mut record = params.clone();
            let obj = record.as_object_mut().unwrap();
            for key in SECRET_FIELDS {
                obj.remove(*key);
            }
            obj.insert("instanceUuid".into(), json!(format!("server-{}", servers.len() + 1)));
            let ise = obj.get("isIseEnabled").and_then(Value::as_bool).unwrap_or(false);
            obj.insert("state".into(), json!(if ise { "INPROGRESS" } else { "ACTIVE" }));
            servers.push(record);
            TaskScript::succeeds("Operation successful")
        },
    );

    let servers = store.clone();
    mock.on_task(
        "system_settings",
        "edit_authentication_and_policy_server_access_configuration",
        move |params| {
            let mut servers = servers.lock().unwrap();
            if let Some(record) = servers.iter_mut().find(|s| s["instanceUuid"] == params["id"]) {
                for (key, value) in params.as_object().unwrap() {
                    if key != "id" && !SECRET_FIELDS.contains(&key.as_str()) {
                        record[key] = value.clone();
                    }
                }
            }
            TaskScript::succeeds("Operation successful")
        },
    );

    let servers = store.clone();
    mock.on_task(
        "system_settings",
        "delete_authentication_and_policy_server_access_configuration",
        move |params| {
            servers.lock().unwrap().retain(|s| s["instanceUuid"] != params["id"]);
            TaskScript::succeeds("Operation successful")
        },
    );

    let servers = store.clone();
    mock.on(
        "system_settings",
        "accept_cisco_ise_server_certificate_for_cisco_ise_server_integration",
        move |params| {
            let mut servers = servers.lock().unwrap();
            if let Some(record) = servers.iter_mut().find(|s| s["instanceUuid"] == params["id"]) {
                record["state"] = json!("ACTIVE");
            }
            Ok(json!({"response": {}}))
        },
    );

    (mock, store)
}

fn runner() -> WorkflowRunner<IseRadiusIntegration> {
    WorkflowRunner::new(IseRadiusIntegration::new())
}

fn aaa_server(timeout: u64) -> Value {
    json!({
        "authentication_policy_server": [{
            "server_type": "AAA",
            "server_ip_address": "10.0.0.1",
            "shared_secret": "radius-secret",
            "protocol": "RADIUS",
            "retries": 3,
            "timeout": timeout
        }]
    })
}

fn ise_server(wait: u64, trusted: bool) -> Value {
    json!({
        "authentication_policy_server": [{
            "server_type": "ISE",
            "server_ip_address": "10.0.0.2",
            "shared_secret": "ise-secret",
            "role": "primary",
            "trusted_server": trusted,
            "ise_integration_wait_time": wait,
            "cisco_ise_dtos": [{
                "user_name": "admin",
                "password": "ise-password",
                "fqdn": "ise.example.com",
                "ip_address": "10.0.0.2",
                "subscriber_name": "pxgrid_client"
            }]
        }]
    })
}

#[tokio::test]
async fn test_create_then_update_is_idempotent() {
    init_tracing();
    let (mock, store) = server_controller("2.3.5.3");

    // Run 1: absent, created.
    let (result, ctx) = run_module(&runner(), &mock, module_args("merged", vec![aaa_server(4)])).await;
    assert_outcome(&result, true, false).unwrap();
    assert_eq!(ctx.status, RunStatus::Success);
    assert_call_count(
        &mock,
        "system_settings",
        "add_authentication_and_policy_server_access_configuration",
        1,
    )
    .unwrap();
    assert_eq!(result.response[0]["authentication_policy_server"][0]["status"], json!("created"));
    assert_eq!(store.lock().unwrap()[0]["timeoutSeconds"], json!(4));

    // Run 2: nothing to do.
    mock.clear_calls();
    let (result, ctx) = run_module(&runner(), &mock, module_args("merged", vec![aaa_server(4)])).await;
    assert_outcome(&result, false, false).unwrap();
    assert_eq!(ctx.status, RunStatus::Ok);
    assert_no_mutations(&mock).unwrap();

    // Run 3: timeout changed, edited in place.
    mock.clear_calls();
    let (result, _) = run_module(&runner(), &mock, module_args("merged", vec![aaa_server(5)])).await;
    assert_outcome(&result, true, false).unwrap();
    let edits = mock.calls_to(
        "system_settings",
        "edit_authentication_and_policy_server_access_configuration",
    );
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].params["id"], json!("server-1"));
    assert_eq!(edits[0].params["timeoutSeconds"], json!(5));
    assert_eq!(store.lock().unwrap().len(), 1);

    // Run 4: converged again.
    mock.clear_calls();
    let (result, _) = run_module(&runner(), &mock, module_args("merged", vec![aaa_server(5)])).await;
    assert_outcome(&result, false, false).unwrap();
    assert_no_mutations(&mock).unwrap();
}

#[tokio::test]
async fn test_keywrap_without_authenticator_key_never_mutates() {
    let (mock, _) = server_controller("2.3.7.9");
    let config = json!({
        "authentication_policy_server": [{
            "server_ip_address": "10.0.0.1",
            "shared_secret": "radius-secret",
            "encryption_scheme": "KEYWRAP",
            "encryption_key": "0123456789abcdef"
        }]
    });

    let (result, ctx) = run_module(&runner(), &mock, module_args("merged", vec![config])).await;
    assert_outcome(&result, false, true).unwrap();
    assert_eq!(ctx.status, RunStatus::Invalid);
    assert_msg_contains(&result, "message_authenticator_code_key").unwrap();
    assert_no_mutations(&mock).unwrap();
}

#[tokio::test]
async fn test_secrets_stay_out_of_the_result() {
    let (mock, _) = server_controller("2.3.7.9");
    let (result, _) = run_module(&runner(), &mock, module_args("merged", vec![aaa_server(4)])).await;
    assert_outcome(&result, true, false).unwrap();
    let text = serde_json::to_string(&result).unwrap();
    assert!(!text.contains("radius-secret"));
}

#[tokio::test]
async fn test_server_type_cannot_change() {
    let (mock, _) = server_controller("2.3.7.9");
    run_module(&runner(), &mock, module_args("merged", vec![aaa_server(4)])).await;

    let mut config = ise_server(20, true);
    config["authentication_policy_server"][0]["server_ip_address"] = json!("10.0.0.1");
    config["authentication_policy_server"][0]["cisco_ise_dtos"][0]["ip_address"] = json!("10.0.0.1");
    mock.clear_calls();
    let (result, _) = run_module(&runner(), &mock, module_args("merged", vec![config])).await;
    assert_outcome(&result, false, true).unwrap();
    assert_msg_contains(&result, "server_type").unwrap();
    assert_no_mutations(&mock).unwrap();
}

/// `aaa_server(4)` with `key` set on its single entry.
fn aaa_server_with(key: &str, value: Value) -> Value {
    let mut config = aaa_server(4);
    config["authentication_policy_server"][0][key] = value;
    config
}

#[tokio::test]
async fn test_ports_and_role_cannot_change() {
    let (mock, store) = server_controller("2.3.7.9");
    run_module(&runner(), &mock, module_args("merged", vec![aaa_server(4)])).await;
    let created = store.lock().unwrap()[0].clone();

    for (key, value) in [
        ("authentication_port", json!(1645)),
        ("accounting_port", json!(1646)),
        ("role", json!("primary")),
    ] {
        mock.clear_calls();
        let config = aaa_server_with(key, value);
        let (result, ctx) = run_module(&runner(), &mock, module_args("merged", vec![config])).await;
        assert_outcome(&result, false, true).unwrap();
        assert_eq!(ctx.status, RunStatus::Invalid, "{}", key);
        assert_msg_contains(&result, &format!("authentication_policy_server[0].{}", key)).unwrap();
        assert_no_mutations(&mock).unwrap();
    }
    assert_eq!(store.lock().unwrap()[0], created);
}

#[tokio::test]
async fn test_tacacs_port_cannot_change() {
    let (mock, store) = server_controller("2.3.7.9");
    let tacacs = aaa_server_with("protocol", json!("TACACS"));
    run_module(&runner(), &mock, module_args("merged", vec![tacacs.clone()])).await;
    assert_eq!(store.lock().unwrap()[0]["port"], json!(49));

    mock.clear_calls();
    let mut config = tacacs;
    config["authentication_policy_server"][0]["port"] = json!(4949);
    let (result, _) = run_module(&runner(), &mock, module_args("merged", vec![config])).await;
    assert_outcome(&result, false, true).unwrap();
    assert_msg_contains(&result, "authentication_policy_server[0].port").unwrap();
    assert_no_mutations(&mock).unwrap();
    assert_eq!(store.lock().unwrap()[0]["port"], json!(49));
}

#[tokio::test]
async fn test_omitted_role_keeps_primary_server_primary() {
    let (mock, store) = server_controller("2.3.7.9");
    let primary = aaa_server_with("role", json!("primary"));
    run_module(&runner(), &mock, module_args("merged", vec![primary])).await;

    // No role and no ports in the playbook: nothing to do.
    mock.clear_calls();
    let (result, ctx) = run_module(&runner(), &mock, module_args("merged", vec![aaa_server(4)])).await;
    assert_outcome(&result, false, false).unwrap();
    assert_eq!(ctx.status, RunStatus::Ok);
    assert_no_mutations(&mock).unwrap();

    // A real change is edited in place with the current role carried along.
    mock.clear_calls();
    let (result, _) = run_module(&runner(), &mock, module_args("merged", vec![aaa_server(6)])).await;
    assert_outcome(&result, true, false).unwrap();
    let edits = mock.calls_to(
        "system_settings",
        "edit_authentication_and_policy_server_access_configuration",
    );
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].params["role"], json!("primary"));
    assert_eq!(edits[0].params["authenticationPort"], json!(1812));
    assert_eq!(store.lock().unwrap()[0]["role"], json!("primary"));
    assert_eq!(store.lock().unwrap()[0]["timeoutSeconds"], json!(6));
}

#[tokio::test]
async fn test_ise_integration_accepts_certificate() {
    let (mock, store) = server_controller("2.3.7.9");
    let (result, _) = run_module(&runner(), &mock, module_args("merged", vec![ise_server(20, true)])).await;

    assert_outcome(&result, true, false).unwrap();
    assert_call_count(
        &mock,
        "system_settings",
        "accept_cisco_ise_server_certificate_for_cisco_ise_server_integration",
        1,
    )
    .unwrap();
    let servers = store.lock().unwrap();
    assert_eq!(servers[0]["state"], json!("ACTIVE"));
    assert_eq!(servers[0]["isIseEnabled"], json!(true));
    assert_eq!(servers[0]["pxgridEnabled"], json!(true));
}

#[tokio::test]
async fn test_ise_integration_wait_is_bounded() {
    let (mock, _) = server_controller("2.3.7.9");
    let (result, _) = run_module(&runner(), &mock, module_args("merged", vec![ise_server(5, false)])).await;

    // The server was created, so the run reports a change alongside the failure.
    assert_outcome(&result, true, true).unwrap();
    assert_msg_contains(&result, "timeout of 5s").unwrap();
    assert_msg_contains(&result, "INPROGRESS").unwrap();
    assert_call_count(
        &mock,
        "system_settings",
        "accept_cisco_ise_server_certificate_for_cisco_ise_server_integration",
        0,
    )
    .unwrap();
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (mock, store) = server_controller("2.3.7.9");
    run_module(&runner(), &mock, module_args("merged", vec![aaa_server(4)])).await;
    let delete = json!({"authentication_policy_server": [{"server_ip_address": "10.0.0.1"}]});

    mock.clear_calls();
    let (result, _) = run_module(&runner(), &mock, module_args("deleted", vec![delete.clone()])).await;
    assert_outcome(&result, true, false).unwrap();
    assert_mutation_count(&mock, 1).unwrap();
    assert!(store.lock().unwrap().is_empty());

    mock.clear_calls();
    let (result, _) = run_module(&runner(), &mock, module_args("deleted", vec![delete])).await;
    assert_outcome(&result, false, false).unwrap();
    assert_no_mutations(&mock).unwrap();
    assert_eq!(result.response[0]["authentication_policy_server"][0]["status"], json!("absent"));
}
