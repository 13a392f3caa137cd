//! Catalyst Center client errors.
//!
//! Every failure below the orchestration core is reported as a [`CccError`].
//! HTTP status codes are kept so callers can distinguish "the controller said
//! no" from "the controller could not be reached".

use thiserror::Error;

/// Result type alias for client operations.
pub type CccResult<T> = Result<T, CccError>;

/// Error type for Catalyst Center calls.
#[derive(Debug, Clone, Error)]
pub enum CccError {
    /// The request never produced an HTTP response.
    #[error("Transport error calling {family}.{function}: {message}")]
    Transport {
        family: String,
        function: String,
        message: String,
    },

    /// The controller answered with a non-success status.
    #[error("{family}.{function} returned HTTP {status}: {body}")]
    Http {
        family: String,
        function: String,
        status: u16,
        body: String,
    },

    /// Token retrieval failed.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// A response body did not match the expected shape.
    #[error("Unexpected response from {context}: {message}")]
    Decode { context: String, message: String },

    /// No route is registered for the requested function.
    #[error("Unknown API function: {family}.{function}")]
    UnknownFunction { family: String, function: String },

    /// The call parameters could not be turned into a request.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },
}

impl CccError {
    /// Creates a transport error.
    pub fn transport(
        family: impl Into<String>,
        function: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CccError::Transport {
            family: family.into(),
            function: function.into(),
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http(
        family: impl Into<String>,
        function: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        CccError::Http {
            family: family.into(),
            function: function.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(context: impl Into<String>, message: impl Into<String>) -> Self {
        CccError::Decode {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        CccError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code, if the controller produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CccError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true if the error indicates an expired or missing token.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
