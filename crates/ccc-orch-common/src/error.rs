//! Orchestration error taxonomy.

use ccc_client::CccError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of an [`OrchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    PreconditionUnmet,
    Transport,
    TaskFailure,
    TaskTimeout,
    PartialBatchFailure,
    VerificationFailed,
    VersionUnsupported,
    InvalidSchema,
    Io,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::PreconditionUnmet => "PRECONDITION_UNMET",
            ErrorKind::Transport => "TRANSPORT_ERROR",
            ErrorKind::TaskFailure => "TASK_FAILURE",
            ErrorKind::TaskTimeout => "TASK_TIMEOUT",
            ErrorKind::PartialBatchFailure => "PARTIAL_BATCH_FAILURE",
            ErrorKind::VerificationFailed => "VERIFICATION_FAILED",
            ErrorKind::VersionUnsupported => "VERSION_UNSUPPORTED",
            ErrorKind::InvalidSchema => "INVALID_SCHEMA",
            ErrorKind::Io => "IO_ERROR",
            ErrorKind::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

/// Error type for workflow stages.
#[derive(Debug, Clone, Error)]
pub enum OrchError {
    /// Schema or cross-field validation failed.
    #[error("Invalid parameters in playbook: {message}")]
    InvalidInput { message: String },

    /// The controller cannot reach the requested state from where it is.
    #[error("{message}")]
    PreconditionUnmet { message: String },

    /// A call to Catalyst Center raised.
    #[error("Error calling {family}.{function}{context}: {message}")]
    Transport {
        family: String,
        function: String,
        context: String,
        message: String,
    },

    /// A controller task reached a terminal error state.
    #[error("Task {task_id} failed: {reason}")]
    TaskFailure { task_id: String, reason: String },

    /// Polling exceeded the configured timeout.
    #[error("Task {task_id} did not complete within the timeout of {timeout_secs}s{note}")]
    TaskTimeout {
        task_id: String,
        timeout_secs: u64,
        note: String,
    },

    /// Some members of a batched operation failed.
    #[error("{operation} partially failed: {succeeded} device(s) succeeded, {failed} device(s) failed")]
    PartialBatchFailure {
        operation: String,
        succeeded: usize,
        failed: usize,
    },

    /// `config_verify` found the controller state differs from what was applied.
    #[error("Verification failed: {message}")]
    VerificationFailed { message: String },

    /// The controller is older than the module supports.
    #[error(
        "Module '{module}' requires Catalyst Center version {required} or later, \
         but the controller reports version {actual}"
    )]
    VersionUnsupported {
        module: String,
        required: String,
        actual: String,
    },

    /// A module schema is malformed.
    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    /// Filesystem failure.
    #[error("I/O error for '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl OrchError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        OrchError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        OrchError::PreconditionUnmet {
            message: message.into(),
        }
    }

    pub fn transport(
        family: impl Into<String>,
        function: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        OrchError::Transport {
            family: family.into(),
            function: function.into(),
            context: String::new(),
            message: message.into(),
        }
    }

    /// Transport error with a short parameter summary, e.g. ` (offset=501)`.
    pub fn transport_with_context(
        family: impl Into<String>,
        function: impl Into<String>,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let context = context.into();
        OrchError::Transport {
            family: family.into(),
            function: function.into(),
            context: if context.is_empty() {
                context
            } else {
                format!(" ({})", context)
            },
            message: message.into(),
        }
    }

    pub fn task_failure(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchError::TaskFailure {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    pub fn verification(message: impl Into<String>) -> Self {
        OrchError::VerificationFailed {
            message: message.into(),
        }
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        OrchError::InvalidSchema {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        OrchError::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        OrchError::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchError::InvalidInput { .. } => ErrorKind::InvalidInput,
            OrchError::PreconditionUnmet { .. } => ErrorKind::PreconditionUnmet,
            OrchError::Transport { .. } => ErrorKind::Transport,
            OrchError::TaskFailure { .. } => ErrorKind::TaskFailure,
            OrchError::TaskTimeout { .. } => ErrorKind::TaskTimeout,
            OrchError::PartialBatchFailure { .. } => ErrorKind::PartialBatchFailure,
            OrchError::VerificationFailed { .. } => ErrorKind::VerificationFailed,
            OrchError::VersionUnsupported { .. } => ErrorKind::VersionUnsupported,
            OrchError::InvalidSchema { .. } => ErrorKind::InvalidSchema,
            OrchError::Io { .. } => ErrorKind::Io,
            OrchError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true for outcomes that still leave completed work behind.
    pub fn is_partial(&self) -> bool {
        matches!(self, OrchError::PartialBatchFailure { .. })
    }
}

impl From<CccError> for OrchError {
    fn from(err: CccError) -> Self {
        match err {
            CccError::Transport {
                family,
                function,
                message,
            } => OrchError::transport(family, function, message),
            CccError::Http {
                family,
                function,
                status,
                body,
            } => OrchError::transport(family, function, format!("HTTP {}: {}", status, body)),
            CccError::UnknownFunction { family, function } => {
                OrchError::transport(family, function, "no route registered")
            }
            CccError::Decode { context, message } => {
                OrchError::transport(context, "decode", message)
            }
            other => OrchError::transport("client", "request", other.to_string()),
        }
    }
}

impl From<crate::schema::SchemaError> for OrchError {
    fn from(err: crate::schema::SchemaError) -> Self {
        OrchError::invalid_schema(err.to_string())
    }
}

/// Result type for workflow stages.
pub type OrchResult<T> = Result<T, OrchError>;
