//! Authentication and policy server shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Playbook fields sent on create and edit, paired with their controller
/// names.
pub const SERVER_PAYLOAD_FIELDS: &[(&str, &str)] = &[
    ("sharedSecret", "shared_secret"),
    ("protocol", "protocol"),
    ("encryptionScheme", "encryption_scheme"),
    ("encryptionKey", "encryption_key"),
    ("messageKey", "message_authenticator_code_key"),
    ("authenticationPort", "authentication_port"),
    ("accountingPort", "accounting_port"),
    ("port", "port"),
    ("retries", "retries"),
    ("timeoutSeconds", "timeout"),
    ("role", "role"),
];

/// Fields sent only for ISE servers.
pub const ISE_PAYLOAD_FIELDS: &[(&str, &str)] = &[
    ("pxgridEnabled", "pxgrid_enabled"),
    ("useDnacCertForPxgrid", "use_dnac_cert_for_pxgrid"),
];

/// Fields of one `cisco_ise_dtos` entry.
pub const ISE_DTO_FIELDS: &[(&str, &str)] = &[
    ("userName", "user_name"),
    ("password", "password"),
    ("fqdn", "fqdn"),
    ("ipAddress", "ip_address"),
    ("description", "description"),
    ("subscriberName", "subscriber_name"),
    ("sshkey", "ssh_key"),
];

/// Fields compared against an existing server. Secrets are never
/// returned by the controller and so never compared.
pub const SERVER_COMPARE_FIELDS: &[(&str, &str)] = &[
    ("protocol", "protocol"),
    ("retries", "retries"),
    ("timeoutSeconds", "timeout"),
];

/// Fields the controller fixes at creation. An edit carries the
/// server's current values for them.
pub const SERVER_IMMUTABLE_FIELDS: &[(&str, &str)] = &[
    ("authenticationPort", "authentication_port"),
    ("accountingPort", "accounting_port"),
    ("port", "port"),
    ("role", "role"),
];

/// Length the controller requires for each KEYWRAP key.
pub const KEYWRAP_ENCRYPTION_KEY_LEN: usize = 16;
pub const KEYWRAP_AUTHENTICATOR_KEY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerType {
    Aaa,
    Ise,
}

impl ServerType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AAA" => Some(ServerType::Aaa),
            "ISE" => Some(ServerType::Ise),
            _ => None,
        }
    }

    pub fn is_ise(&self) -> bool {
        *self == ServerType::Ise
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerType::Aaa => "AAA",
            ServerType::Ise => "ISE",
        })
    }
}

/// One desired server.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthServerWant {
    pub index: usize,
    pub ip_address: String,
    pub server_type: ServerType,
    /// The validated playbook entry.
    pub entry: Value,
    /// Seconds to wait for an ISE integration to become active.
    pub integration_wait_secs: u64,
    pub trusted_server: bool,
}

impl AuthServerWant {
    pub fn encryption_scheme(&self) -> Option<&str> {
        self.entry.get("encryption_scheme").and_then(Value::as_str)
    }
}

/// A server as `get_authentication_and_policy_servers` lists it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthServerRecord {
    #[serde(rename = "instanceUuid")]
    pub id: String,
    pub ip_address: String,
    #[serde(default)]
    pub is_ise_enabled: bool,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub encryption_scheme: Option<String>,
    /// The item as returned, for field comparison.
    #[serde(skip)]
    pub raw: Value,
}

impl AuthServerRecord {
    pub fn server_type(&self) -> ServerType {
        if self.is_ise_enabled {
            ServerType::Ise
        } else {
            ServerType::Aaa
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("ACTIVE"))
    }

    pub fn is_failed(&self) -> bool {
        self.state.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("FAILED"))
    }
}

/// What happened to one server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerChange {
    pub server_ip_address: String,
    pub status: &'static str,
}

impl ServerChange {
    pub fn new(ip: &str, status: &'static str) -> Self {
        Self {
            server_ip_address: ip.to_string(),
            status,
        }
    }
}
