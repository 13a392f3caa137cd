//! Module arguments shared by every workflow.
//!
//! Field defaults come from per-field functions so a YAML or JSON document
//! only needs to name what differs.

use crate::error::{OrchError, OrchResult};
use crate::schema::{ArgSpec, FieldSpec, FieldType};
use crate::task::PollSettings;
use ccc_client::ClientConfig;
use ccc_types::CccVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Log verbosity names accepted by `log_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Critical | LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }
}

/// Arguments every module accepts.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModuleArgs {
    #[serde(alias = "dnac_host")]
    pub host: String,
    #[serde(default = "default_port", alias = "dnac_port")]
    pub port: u16,
    #[serde(default = "default_username", alias = "dnac_username")]
    pub username: String,
    #[serde(default, alias = "dnac_password")]
    pub password: String,
    #[serde(default = "default_true", alias = "dnac_verify")]
    pub verify: bool,
    #[serde(default = "default_version", alias = "dnac_version")]
    pub version: String,
    #[serde(default = "default_api_task_timeout")]
    pub api_task_timeout: u64,
    #[serde(default = "default_task_poll_interval")]
    pub task_poll_interval: u64,
    #[serde(default, alias = "dnac_log")]
    pub log: bool,
    #[serde(default = "default_log_level", alias = "dnac_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "default_log_file_path", alias = "dnac_log_file_path")]
    pub log_file_path: String,
    #[serde(default = "default_true", alias = "dnac_log_append")]
    pub log_append: bool,
    #[serde(default)]
    pub config_verify: bool,
    #[serde(default = "default_true")]
    pub validate_response_schema: bool,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub config: Vec<Value>,
}

fn default_port() -> u16 {
    443
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    "2.2.3.3".to_string()
}

fn default_api_task_timeout() -> u64 {
    1200
}

fn default_task_poll_interval() -> u64 {
    2
}

fn default_log_level() -> LogLevel {
    LogLevel::Warning
}

fn default_log_file_path() -> String {
    "ccc.log".to_string()
}

impl ModuleArgs {
    /// Arguments for `host` with every other field at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: default_username(),
            password: String::new(),
            verify: true,
            version: default_version(),
            api_task_timeout: default_api_task_timeout(),
            task_poll_interval: default_task_poll_interval(),
            log: false,
            log_level: default_log_level(),
            log_file_path: default_log_file_path(),
            log_append: true,
            config_verify: false,
            validate_response_schema: true,
            state: None,
            config: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_config(mut self, config: Vec<Value>) -> Self {
        self.config = config;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_timeouts(mut self, api_task_timeout: u64, task_poll_interval: u64) -> Self {
        self.api_task_timeout = api_task_timeout;
        self.task_poll_interval = task_poll_interval;
        self
    }

    pub fn with_config_verify(mut self, enabled: bool) -> Self {
        self.config_verify = enabled;
        self
    }

    /// Decodes arguments from a parsed document.
    pub fn from_value(value: Value) -> OrchResult<Self> {
        serde_json::from_value(value).map_err(|e| OrchError::invalid_input(e.to_string()))
    }

    /// The declared version, used before the controller has been probed.
    pub fn declared_version(&self) -> OrchResult<CccVersion> {
        self.version
            .parse()
            .map_err(|_| OrchError::invalid_input(format!("version: '{}' is not a version", self.version)))
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings::new(self.api_task_timeout, self.task_poll_interval.max(1))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.host, &self.username, &self.password)
            .with_port(self.port)
            .with_verify(self.verify)
    }

    /// Schema of the common arguments, used for validation and redaction.
    pub fn common_spec() -> ArgSpec {
        ArgSpec::new()
            .field("host", FieldSpec::str().required().alias("dnac_host"))
            .field("port", FieldSpec::int().range(1, 65535).default(443).alias("dnac_port"))
            .field("username", FieldSpec::str().default("admin").alias("dnac_username"))
            .field("password", FieldSpec::str().no_log().alias("dnac_password"))
            .field("verify", FieldSpec::bool().default(true).alias("dnac_verify"))
            .field("version", FieldSpec::str().default("2.2.3.3").alias("dnac_version"))
            .field("api_task_timeout", FieldSpec::int().min(1).default(1200))
            .field("task_poll_interval", FieldSpec::int().min(1).default(2))
            .field("log", FieldSpec::bool().default(false).alias("dnac_log"))
            .field(
                "log_level",
                FieldSpec::str()
                    .choices(["CRITICAL", "ERROR", "WARNING", "INFO", "DEBUG"])
                    .default("WARNING")
                    .alias("dnac_log_level"),
            )
            .field("log_file_path", FieldSpec::str().default("ccc.log").alias("dnac_log_file_path"))
            .field("log_append", FieldSpec::bool().default(true).alias("dnac_log_append"))
            .field("config_verify", FieldSpec::bool().default(false))
            .field("validate_response_schema", FieldSpec::bool().default(true))
            .field("state", FieldSpec::str())
            .field("config", FieldSpec::list(FieldType::Dict).required())
    }
}

impl fmt::Debug for ModuleArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleArgs")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &crate::schema::NO_LOG_PLACEHOLDER)
            .field("verify", &self.verify)
            .field("version", &self.version)
            .field("api_task_timeout", &self.api_task_timeout)
            .field("task_poll_interval", &self.task_poll_interval)
            .field("config_verify", &self.config_verify)
            .field("state", &self.state)
            .field("config_blocks", &self.config.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let args = ModuleArgs::from_value(json!({
            "host": "10.0.0.10",
            "password": "secret",
            "config": [{}]
        }))
        .unwrap();
        assert_eq!(args.port, 443);
        assert!(args.verify);
        assert_eq!(args.version, "2.2.3.3");
        assert_eq!(args.api_task_timeout, 1200);
        assert_eq!(args.task_poll_interval, 2);
        assert_eq!(args.log_level, LogLevel::Warning);
        assert_eq!(args.log_file_path, "ccc.log");
        assert!(args.log_append);
        assert!(!args.config_verify);
        assert!(args.validate_response_schema);
    }

    #[test]
    fn test_legacy_aliases() {
        let args = ModuleArgs::from_value(json!({
            "dnac_host": "ccc.example.com",
            "dnac_version": "2.3.7.6",
            "dnac_log_level": "DEBUG"
        }))
        .unwrap();
        assert_eq!(args.host, "ccc.example.com");
        assert_eq!(args.log_level.as_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(args.declared_version().unwrap().to_string(), "2.3.7.6");
    }

    #[test]
    fn test_debug_hides_password() {
        let mut args = ModuleArgs::new("h");
        args.password = "hunter2".to_string();
        assert!(!format!("{:?}", args).contains("hunter2"));
    }

    #[test]
    fn test_poll_settings() {
        let args = ModuleArgs::new("h").with_timeouts(10, 2);
        assert_eq!(args.poll_settings().timeout, Duration::from_secs(10));
        assert_eq!(args.poll_settings().interval, Duration::from_secs(2));
    }

    #[test]
    fn test_common_spec_is_well_formed() {
        assert!(ModuleArgs::common_spec().check().is_ok());
    }
}
