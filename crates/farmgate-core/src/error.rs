//! Gateway error taxonomy

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that a gateway operation can report
///
/// `Timeout` and `Unavailable` are deliberately separate: the first means the
/// control plane accepted the connection but did not answer in time, the
/// second means nothing was listening.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// Connection refused or host unreachable
    #[error("Control plane unavailable: {0}")]
    Unavailable(String),

    /// Deadline exceeded
    #[error("{operation} timed out after {deadline_ms} ms")]
    Timeout {
        /// Operation that was in flight
        operation: String,
        /// Deadline that expired
        deadline_ms: u64,
    },

    /// Required artifact or executable not found on any searched path
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Remote answered with an application-level failure
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Identifier unknown to this gateway
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed inbound request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Build a timeout error for an operation and deadline
    pub fn timeout(operation: impl Into<String>, deadline: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            deadline_ms: deadline.as_millis() as u64,
        }
    }

    /// Stable machine-readable tag for this error
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Unavailable(_) => "unavailable",
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::ConfigurationError(_) => "configuration_error",
            GatewayError::ProtocolError(_) => "protocol_error",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::Internal(_) => "internal",
        }
    }

    /// Remediation hint shown next to the error in the UI
    pub fn hint(&self) -> &'static str {
        match self {
            GatewayError::Unavailable(_) => "server not running or unreachable",
            GatewayError::Timeout { .. } => "server overloaded or slow; retry later",
            GatewayError::ConfigurationError(_) => {
                "interface definition or bridge executable missing"
            }
            GatewayError::ProtocolError(_) => "control plane rejected the request",
            GatewayError::NotFound(_) => "unknown identifier",
            GatewayError::InvalidRequest(_) => "check the request fields",
            GatewayError::Internal(_) => "unexpected gateway failure",
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Unavailable(_) => 503,
            GatewayError::Timeout { .. } => 504,
            GatewayError::ConfigurationError(_) => 500,
            GatewayError::ProtocolError(_) => 502,
            GatewayError::NotFound(_) => 404,
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::Internal(_) => 500,
        }
    }

    /// Whether re-invoking the same operation later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Unavailable(_) | GatewayError::Timeout { .. }
        )
    }
}
