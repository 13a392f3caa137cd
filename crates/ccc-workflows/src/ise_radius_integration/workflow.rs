//! Create, edit and delete of AAA and ISE servers.

use super::types::*;
use async_trait::async_trait;
use ccc_client::api::response_items;
use ccc_orch_common::{
    changed_fields, drop_nulls, ArgSpec, FieldSpec, Format, ModuleDescriptor, OrchError, OrchResult, PredicateTable,
    RunContext, State, Workflow,
};
use ccc_types::{CccVersion, VersionRange};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const MODULE_NAME: &str = "ise_radius_integration";

const SERVERS: &str = "authentication_policy_server";

/// Interval between ISE integration state checks.
const INTEGRATION_POLL: Duration = Duration::from_secs(2);

fn ise_dto_spec() -> ArgSpec {
    ArgSpec::new()
        .field("user_name", FieldSpec::str().required())
        .field("password", FieldSpec::str().required().no_log())
        .field("fqdn", FieldSpec::str().required())
        .field("ip_address", FieldSpec::str().required().format(Format::Ip))
        .field("description", FieldSpec::str())
        .field("subscriber_name", FieldSpec::str().required())
        .field("ssh_key", FieldSpec::str().no_log())
}

/// Schema of one config block.
pub fn schema() -> ArgSpec {
    let server = ArgSpec::new()
        .field("server_type", FieldSpec::str().choices(["AAA", "ISE"]).default("AAA"))
        .field("server_ip_address", FieldSpec::str().required().format(Format::Ip))
        .field("shared_secret", FieldSpec::str().no_log().length_max(100))
        .field(
            "protocol",
            FieldSpec::str()
                .choices(["TACACS", "RADIUS", "RADIUS_TACACS"])
                .default("RADIUS"),
        )
        .field("encryption_scheme", FieldSpec::str().choices(["KEYWRAP", "RADSEC"]))
        .field("encryption_key", FieldSpec::str().no_log())
        .field("message_authenticator_code_key", FieldSpec::str().no_log())
        .field("authentication_port", FieldSpec::int().range(1, 65535))
        .field("accounting_port", FieldSpec::int().range(1, 65535))
        .field("port", FieldSpec::int().range(1, 65535))
        .field("retries", FieldSpec::int().range(1, 3).default(3))
        .field("timeout", FieldSpec::int().range(2, 20).default(4))
        .field("role", FieldSpec::str().choices(["primary", "secondary"]))
        .field("pxgrid_enabled", FieldSpec::bool().default(true))
        .field("use_dnac_cert_for_pxgrid", FieldSpec::bool().default(false))
        .field("cisco_ise_dtos", FieldSpec::list_of(ise_dto_spec()))
        .field("trusted_server", FieldSpec::bool().default(true))
        .field("ise_integration_wait_time", FieldSpec::int().range(1, 120).default(20));

    ArgSpec::new().field(SERVERS, FieldSpec::list_of(server).required())
}

/// Values a new server gets for the immutable fields the playbook omits.
/// They are not schema defaults, so leaving one out never reads as a
/// change to an existing server.
fn create_defaults() -> [(&'static str, Value); 4] {
    [
        ("authenticationPort", json!(1812)),
        ("accountingPort", json!(1813)),
        ("port", json!(49)),
        ("role", json!("secondary")),
    ]
}

/// Success phrases of the legacy task endpoint.
fn predicates() -> PredicateTable {
    PredicateTable::new().with(
        VersionRange::up_to(CccVersion::new(vec![2, 3, 5, 3])),
        [
            "operation successful",
            "successfully created",
            "successfully updated",
            "successfully deleted",
        ],
    )
}

/// Authentication and policy servers workflow.
pub struct IseRadiusIntegration {
    desc: ModuleDescriptor,
    predicates: PredicateTable,
}

impl IseRadiusIntegration {
    pub fn new() -> Self {
        Self {
            desc: ModuleDescriptor::new(
                MODULE_NAME,
                vec![State::Merged, State::Deleted],
                schema(),
                CccVersion::new(vec![2, 3, 5, 3]),
            ),
            predicates: predicates(),
        }
    }

    async fn fetch_server(&self, ctx: &RunContext, ip: &str) -> OrchResult<Option<AuthServerRecord>> {
        let resp = ctx
            .invoke("system_settings", "get_authentication_and_policy_servers", &json!({}), false)
            .await?;
        for item in response_items(&resp) {
            if item.get("ipAddress").and_then(Value::as_str) != Some(ip) {
                continue;
            }
            if let Some(mut record) = ctx.decode::<AuthServerRecord>(&item, "authentication policy server")? {
                record.raw = item;
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    async fn create(&self, ctx: &mut RunContext, want: &AuthServerWant) -> OrchResult<()> {
        if want.entry.get("shared_secret").is_none() {
            return Err(OrchError::invalid_input(format!(
                "{}[{}].shared_secret: required to create server {}",
                SERVERS, want.index, want.ip_address
            )));
        }
        info!(server = %want.ip_address, server_type = %want.server_type, "Adding authentication and policy server");
        ctx.run_task(
            "system_settings",
            "add_authentication_and_policy_server_access_configuration",
            &server_payload(want, None),
            &self.predicates,
            "Failed to add authentication and policy server",
        )
        .await?;

        if want.server_type.is_ise() {
            self.await_integration(ctx, want).await?;
        }
        Ok(())
    }

    /// Waits for a new ISE server to leave its in-progress state,
    /// accepting its certificate on the way when it is trusted.
    #[instrument(skip_all, fields(server = %want.ip_address))]
    async fn await_integration(&self, ctx: &mut RunContext, want: &AuthServerWant) -> OrchResult<()> {
        let budget = Duration::from_secs(want.integration_wait_secs);
        let start = ctx.clock().now();
        let mut accepted = false;

        loop {
            let Some(record) = self.fetch_server(ctx, &want.ip_address).await? else {
                return Err(OrchError::precondition(format!(
                    "ISE server {} disappeared during integration",
                    want.ip_address
                )));
            };
            if record.is_active() {
                info!("ISE integration active");
                return Ok(());
            }
            if record.is_failed() {
                return Err(OrchError::task_failure(
                    record.id,
                    format!("ISE integration with {} failed", want.ip_address),
                ));
            }
            if want.trusted_server && !accepted {
                ctx.invoke(
                    "system_settings",
                    "accept_cisco_ise_server_certificate_for_cisco_ise_server_integration",
                    &json!({ "id": record.id, "isCertAcceptedByUser": true }),
                    true,
                )
                .await?;
                accepted = true;
                continue;
            }

            let elapsed = ctx.clock().now().saturating_sub(start);
            if elapsed >= budget {
                warn!(state = ?record.state, "ISE integration did not complete");
                return Err(OrchError::TaskTimeout {
                    task_id: record.id,
                    timeout_secs: budget.as_secs(),
                    note: format!(" (ISE integration state {})", record.state.unwrap_or_default()),
                });
            }
            ctx.clock().sleep(INTEGRATION_POLL.min(budget - elapsed)).await;
        }
    }

    async fn edit(&self, ctx: &mut RunContext, want: &AuthServerWant, record: &AuthServerRecord) -> OrchResult<()> {
        let mut payload = server_payload(want, Some(record));
        if let Value::Object(obj) = &mut payload {
            obj.insert("id".to_string(), json!(record.id));
        }
        info!(server = %want.ip_address, "Updating authentication and policy server");
        ctx.run_task(
            "system_settings",
            "edit_authentication_and_policy_server_access_configuration",
            &payload,
            &self.predicates,
            "Failed to update authentication and policy server",
        )
        .await?;
        Ok(())
    }
}

impl Default for IseRadiusIntegration {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_fields(entry: &Value, obj: &mut Map<String, Value>, fields: &[(&str, &str)]) {
    for (ccc_key, playbook_key) in fields {
        if let Some(value) = entry.get(*playbook_key).filter(|v| !v.is_null()) {
            obj.insert(ccc_key.to_string(), value.clone());
        }
    }
}

/// Controller payload for create, or for an edit of `existing`. Omitted
/// immutable fields take the defaults on create and the server's current
/// values on edit.
fn server_payload(want: &AuthServerWant, existing: Option<&AuthServerRecord>) -> Value {
    let mut obj = Map::new();
    obj.insert("ipAddress".to_string(), json!(want.ip_address));
    obj.insert("isIseEnabled".to_string(), json!(want.server_type.is_ise()));
    copy_fields(&want.entry, &mut obj, SERVER_PAYLOAD_FIELDS);
    match existing {
        Some(record) => {
            for (ccc_key, _) in SERVER_IMMUTABLE_FIELDS {
                if let Some(current) = record.raw.get(*ccc_key).filter(|v| !v.is_null()) {
                    obj.entry(ccc_key.to_string()).or_insert_with(|| current.clone());
                }
            }
        }
        None => {
            for (ccc_key, value) in create_defaults() {
                obj.entry(ccc_key.to_string()).or_insert(value);
            }
        }
    }

    if want.server_type.is_ise() {
        copy_fields(&want.entry, &mut obj, ISE_PAYLOAD_FIELDS);
        let dtos: Vec<Value> = want
            .entry
            .get("cisco_ise_dtos")
            .and_then(Value::as_array)
            .map(|dtos| {
                dtos.iter()
                    .map(|dto| {
                        let mut out = Map::new();
                        copy_fields(dto, &mut out, ISE_DTO_FIELDS);
                        Value::Object(out)
                    })
                    .collect()
            })
            .unwrap_or_default();
        obj.insert("ciscoIseDtos".to_string(), Value::Array(dtos));
    }
    drop_nulls(&Value::Object(obj))
}

/// Field pairs compared for `want`; pxGrid settings only matter for ISE.
fn compare_fields(want: &AuthServerWant) -> Vec<(&'static str, &'static str)> {
    let mut fields = SERVER_COMPARE_FIELDS.to_vec();
    if want.server_type.is_ise() {
        fields.extend_from_slice(ISE_PAYLOAD_FIELDS);
    }
    fields
}

/// Immutable fields the playbook sets to something other than the
/// server's current value. A field the controller does not report for
/// this server is not checked.
fn immutable_changes(record: &AuthServerRecord, want: &AuthServerWant, path: &str) -> Vec<String> {
    let mut problems = Vec::new();
    for (ccc_key, playbook_key) in SERVER_IMMUTABLE_FIELDS {
        let Some(current) = record.raw.get(*ccc_key).filter(|v| !v.is_null()) else {
            continue;
        };
        if changed_fields(&record.raw, &want.entry, &[(*ccc_key, *playbook_key)]).is_empty() {
            continue;
        }
        problems.push(format!(
            "{}.{}: cannot be changed on an existing server (current {}, requested {})",
            path, playbook_key, current, want.entry[*playbook_key]
        ));
    }
    problems
}

/// Cross-field rules the schema cannot express.
fn check_server(entry: &Value, path: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let text = |key: &str| entry.get(key).and_then(Value::as_str);
    let scheme = text("encryption_scheme");

    match scheme {
        Some("KEYWRAP") => {
            for (key, len) in [
                ("encryption_key", KEYWRAP_ENCRYPTION_KEY_LEN),
                ("message_authenticator_code_key", KEYWRAP_AUTHENTICATOR_KEY_LEN),
            ] {
                match text(key) {
                    None => problems.push(format!("{}.{}: required when encryption_scheme is KEYWRAP", path, key)),
                    Some(v) if v.chars().count() != len => problems.push(format!(
                        "{}.{}: must be exactly {} characters for KEYWRAP",
                        path, key, len
                    )),
                    Some(_) => {}
                }
            }
        }
        Some("RADSEC") => {
            if text("protocol").is_some_and(|p| p.contains("TACACS")) {
                problems.push(format!("{}.protocol: RADSEC requires protocol RADIUS", path));
            }
        }
        _ => {
            for key in ["encryption_key", "message_authenticator_code_key"] {
                if text(key).is_some() {
                    problems.push(format!("{}.{}: only valid with an encryption_scheme", path, key));
                }
            }
        }
    }

    if text("server_type") == Some("ISE")
        && entry
            .get("cisco_ise_dtos")
            .and_then(Value::as_array)
            .map_or(true, |dtos| dtos.is_empty())
    {
        problems.push(format!("{}.cisco_ise_dtos: required when server_type is ISE", path));
    }
    problems
}

#[async_trait]
impl Workflow for IseRadiusIntegration {
    type Want = Vec<AuthServerWant>;
    type Have = Vec<Option<AuthServerRecord>>;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.desc
    }

    async fn get_want(&self, _ctx: &mut RunContext, block: &Value, state: State) -> OrchResult<Vec<AuthServerWant>> {
        let servers = block.get(SERVERS).and_then(Value::as_array).cloned().unwrap_or_default();
        let mut problems = Vec::new();
        let mut want = Vec::with_capacity(servers.len());

        for (index, entry) in servers.into_iter().enumerate() {
            let path = format!("{}[{}]", SERVERS, index);
            if state == State::Merged {
                problems.extend(check_server(&entry, &path));
            }
            let server_type = entry
                .get("server_type")
                .and_then(Value::as_str)
                .and_then(ServerType::parse)
                .unwrap_or(ServerType::Aaa);
            want.push(AuthServerWant {
                index,
                ip_address: entry
                    .get("server_ip_address")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                server_type,
                integration_wait_secs: entry.get("ise_integration_wait_time").and_then(Value::as_u64).unwrap_or(20),
                trusted_server: entry.get("trusted_server").and_then(Value::as_bool).unwrap_or(true),
                entry,
            });
        }

        if !problems.is_empty() {
            return Err(OrchError::invalid_input(problems.join("; ")));
        }
        Ok(want)
    }

    async fn get_have(
        &self,
        ctx: &mut RunContext,
        want: &Vec<AuthServerWant>,
        _state: State,
    ) -> OrchResult<Vec<Option<AuthServerRecord>>> {
        let mut have = Vec::with_capacity(want.len());
        for server in want {
            have.push(self.fetch_server(ctx, &server.ip_address).await?);
        }
        Ok(have)
    }

    async fn get_diff_merged(
        &self,
        ctx: &mut RunContext,
        want: &Vec<AuthServerWant>,
        have: &Vec<Option<AuthServerRecord>>,
    ) -> OrchResult<()> {
        // Immutable fields are checked for every server before any change.
        let mut problems = Vec::new();
        for (server, current) in want.iter().zip(have) {
            let Some(record) = current else { continue };
            let path = format!("{}[{}]", SERVERS, server.index);
            if record.server_type() != server.server_type {
                problems.push(format!(
                    "{}.server_type: {} is a {} server and cannot become {}",
                    path,
                    server.ip_address,
                    record.server_type(),
                    server.server_type
                ));
            }
            if let Some(scheme) = server.encryption_scheme() {
                if record.encryption_scheme.as_deref().is_some_and(|s| s != scheme) {
                    problems.push(format!(
                        "{}.encryption_scheme: cannot be changed on an existing server",
                        path
                    ));
                }
            }
            problems.extend(immutable_changes(record, server, &path));
        }
        if !problems.is_empty() {
            return Err(OrchError::invalid_input(problems.join("; ")));
        }

        let mut changes = Vec::new();
        for (server, current) in want.iter().zip(have) {
            match current {
                None => {
                    self.create(ctx, server).await?;
                    changes.push(ServerChange::new(&server.ip_address, "created"));
                }
                Some(record) => {
                    let differing = changed_fields(&record.raw, &server.entry, &compare_fields(server));
                    if differing.is_empty() {
                        info!(server = %server.ip_address, "Server already in the desired state");
                        changes.push(ServerChange::new(&server.ip_address, "unchanged"));
                        continue;
                    }
                    info!(server = %server.ip_address, fields = ?differing, "Server differs");
                    self.edit(ctx, server, record).await?;
                    changes.push(ServerChange::new(&server.ip_address, "updated"));
                }
            }
        }
        ctx.result.push_response(json!({ "authentication_policy_server": changes }));
        Ok(())
    }

    async fn get_diff_deleted(
        &self,
        ctx: &mut RunContext,
        want: &Vec<AuthServerWant>,
        have: &Vec<Option<AuthServerRecord>>,
    ) -> OrchResult<()> {
        let mut changes = Vec::new();
        for (server, current) in want.iter().zip(have) {
            let Some(record) = current else {
                changes.push(ServerChange::new(&server.ip_address, "absent"));
                continue;
            };
            ctx.run_task(
                "system_settings",
                "delete_authentication_and_policy_server_access_configuration",
                &json!({ "id": record.id }),
                &self.predicates,
                "Failed to delete authentication and policy server",
            )
            .await?;
            changes.push(ServerChange::new(&server.ip_address, "deleted"));
        }
        ctx.result.push_response(json!({ "authentication_policy_server": changes }));
        Ok(())
    }

    async fn verify_diff_merged(
        &self,
        _ctx: &mut RunContext,
        want: &Vec<AuthServerWant>,
        have: &Vec<Option<AuthServerRecord>>,
    ) -> OrchResult<()> {
        for (server, current) in want.iter().zip(have) {
            let Some(record) = current else {
                return Err(OrchError::verification(format!("server {} is absent", server.ip_address)));
            };
            let differing = changed_fields(&record.raw, &server.entry, &compare_fields(server));
            if !differing.is_empty() {
                return Err(OrchError::verification(format!(
                    "server {} differs in {}",
                    server.ip_address,
                    differing.join(", ")
                )));
            }
        }
        Ok(())
    }

    async fn verify_diff_deleted(
        &self,
        _ctx: &mut RunContext,
        want: &Vec<AuthServerWant>,
        have: &Vec<Option<AuthServerRecord>>,
    ) -> OrchResult<()> {
        match want.iter().zip(have).find(|(_, current)| current.is_some()) {
            Some((server, _)) => Err(OrchError::verification(format!(
                "server {} still exists",
                server.ip_address
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn validated(entry: Value) -> Value {
        let (blocks, invalid) = schema().validate(&[json!({ SERVERS: [entry] })]);
        assert!(invalid.is_empty(), "{:?}", invalid);
        blocks[0][SERVERS][0].clone()
    }

    fn want(entry: Value) -> AuthServerWant {
        let entry = validated(entry);
        AuthServerWant {
            index: 0,
            ip_address: entry["server_ip_address"].as_str().unwrap().to_string(),
            server_type: ServerType::parse(entry["server_type"].as_str().unwrap()).unwrap(),
            integration_wait_secs: 20,
            trusted_server: true,
            entry,
        }
    }

    #[test]
    fn test_schema_is_well_formed() {
        schema().check().unwrap();
    }

    #[test]
    fn test_keywrap_requires_both_keys() {
        let entry = validated(json!({
            "server_ip_address": "10.0.0.1",
            "encryption_scheme": "KEYWRAP",
            "encryption_key": "0123456789abcdef"
        }));
        let problems = check_server(&entry, "s[0]");
        assert_eq!(
            problems,
            vec!["s[0].message_authenticator_code_key: required when encryption_scheme is KEYWRAP"]
        );
    }

    #[test]
    fn test_keywrap_key_lengths() {
        let entry = validated(json!({
            "server_ip_address": "10.0.0.1",
            "encryption_scheme": "KEYWRAP",
            "encryption_key": "short",
            "message_authenticator_code_key": "01234567890123456789"
        }));
        let problems = check_server(&entry, "s[0]");
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("encryption_key: must be exactly 16"));
    }

    #[test]
    fn test_radsec_rejects_tacacs() {
        let entry = validated(json!({
            "server_ip_address": "10.0.0.1",
            "encryption_scheme": "RADSEC",
            "protocol": "RADIUS_TACACS"
        }));
        assert_eq!(check_server(&entry, "s[0]"), vec!["s[0].protocol: RADSEC requires protocol RADIUS"]);
    }

    #[test]
    fn test_keys_without_scheme_rejected() {
        let entry = validated(json!({"server_ip_address": "10.0.0.1", "encryption_key": "0123456789abcdef"}));
        assert_eq!(
            check_server(&entry, "s[0]"),
            vec!["s[0].encryption_key: only valid with an encryption_scheme"]
        );
    }

    #[test]
    fn test_ise_requires_dtos() {
        let entry = validated(json!({"server_ip_address": "10.0.0.2", "server_type": "ISE"}));
        assert_eq!(
            check_server(&entry, "s[0]"),
            vec!["s[0].cisco_ise_dtos: required when server_type is ISE"]
        );
    }

    #[test]
    fn test_aaa_payload() {
        let payload = server_payload(
            &want(json!({
                "server_ip_address": "10.0.0.1",
                "shared_secret": "s3cret",
                "timeout": 5
            })),
            None,
        );
        assert_eq!(
            payload,
            json!({
                "ipAddress": "10.0.0.1",
                "isIseEnabled": false,
                "sharedSecret": "s3cret",
                "protocol": "RADIUS",
                "authenticationPort": 1812,
                "accountingPort": 1813,
                "port": 49,
                "retries": 3,
                "timeoutSeconds": 5,
                "role": "secondary"
            })
        );
    }

    #[test]
    fn test_ise_payload_maps_dtos() {
        let payload = server_payload(
            &want(json!({
                "server_ip_address": "10.0.0.2",
                "server_type": "ISE",
                "role": "primary",
                "cisco_ise_dtos": [{
                    "user_name": "admin",
                    "password": "pw",
                    "fqdn": "ise.example.com",
                    "ip_address": "10.0.0.2",
                    "subscriber_name": "pxgrid_client"
                }]
            })),
            None,
        );
        assert_eq!(payload["role"], json!("primary"));
        assert_eq!(payload["isIseEnabled"], json!(true));
        assert_eq!(payload["pxgridEnabled"], json!(true));
        assert_eq!(
            payload["ciscoIseDtos"],
            json!([{
                "userName": "admin",
                "password": "pw",
                "fqdn": "ise.example.com",
                "ipAddress": "10.0.0.2",
                "subscriberName": "pxgrid_client"
            }])
        );
    }

    fn record(raw: Value) -> AuthServerRecord {
        let mut record: AuthServerRecord = serde_json::from_value(raw.clone()).unwrap();
        record.raw = raw;
        record
    }

    fn existing_primary() -> AuthServerRecord {
        record(json!({
            "instanceUuid": "server-1",
            "ipAddress": "10.0.0.1",
            "protocol": "RADIUS_TACACS",
            "authenticationPort": 1812,
            "accountingPort": 1813,
            "port": 49,
            "retries": 3,
            "timeoutSeconds": 4,
            "role": "primary"
        }))
    }

    #[test]
    fn test_compare_fields_skip_immutable_fields() {
        let aaa = compare_fields(&want(json!({"server_ip_address": "10.0.0.1", "protocol": "TACACS"})));
        for (ccc_key, _) in SERVER_IMMUTABLE_FIELDS {
            assert!(!aaa.iter().any(|(key, _)| key == ccc_key), "{}", ccc_key);
        }
        assert!(!aaa.contains(&("pxgridEnabled", "pxgrid_enabled")));
    }

    #[test]
    fn test_immutable_fields_named_when_changed() {
        let server = want(json!({
            "server_ip_address": "10.0.0.1",
            "protocol": "RADIUS_TACACS",
            "accounting_port": 1646,
            "port": 49,
            "role": "secondary"
        }));
        let problems = immutable_changes(&existing_primary(), &server, "s[0]");
        assert_eq!(
            problems,
            vec![
                "s[0].accounting_port: cannot be changed on an existing server (current 1813, requested 1646)",
                "s[0].role: cannot be changed on an existing server (current \"primary\", requested \"secondary\")",
            ]
        );
    }

    #[test]
    fn test_omitted_immutable_fields_are_not_changes() {
        let server = want(json!({"server_ip_address": "10.0.0.1", "protocol": "RADIUS_TACACS", "timeout": 6}));
        assert!(immutable_changes(&existing_primary(), &server, "s[0]").is_empty());
        assert_eq!(server.entry.get("role"), None);
    }

    #[test]
    fn test_edit_payload_keeps_current_immutable_values() {
        let server = want(json!({"server_ip_address": "10.0.0.1", "protocol": "RADIUS_TACACS", "timeout": 6}));
        let payload = server_payload(&server, Some(&existing_primary()));
        assert_eq!(payload["role"], json!("primary"));
        assert_eq!(payload["authenticationPort"], json!(1812));
        assert_eq!(payload["accountingPort"], json!(1813));
        assert_eq!(payload["port"], json!(49));
        assert_eq!(payload["timeoutSeconds"], json!(6));
    }
}
