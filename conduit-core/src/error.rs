//! Error types for CONDUIT operations

use thiserror::Error;

/// Failure of a single remote call attempt.
///
/// Every variant is eligible for retry; the retrying caller absorbs these and
/// only surfaces a [`TerminalError`] once the attempt ceiling is reached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransientError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Request to {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Request to {endpoint} failed with status {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl TransientError {
    /// The endpoint the failed attempt was addressed to.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::InvalidResponse { endpoint, .. } => endpoint,
        }
    }
}

/// Surfaced once every attempt of a remote call has failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Remote call failed after {attempts} attempt(s): {last_error}")]
pub struct TerminalError {
    pub attempts: u32,
    #[source]
    pub last_error: TransientError,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
        }
    }

    pub fn invalid(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Master error type for all CONDUIT errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConduitError {
    #[error("Transient remote error: {0}")]
    Transient(#[from] TransientError),

    #[error("{0}")]
    Terminal(#[from] TerminalError),

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to encode request for {endpoint}: {reason}")]
    Encode { endpoint: String, reason: String },

    #[error("Concurrency gate closed")]
    GateClosed,
}

impl ConduitError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Number of attempts made, when this is a terminal remote failure.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Terminal(terminal) => Some(terminal.attempts),
            _ => None,
        }
    }
}

/// Result type alias for CONDUIT operations.
pub type ConduitResult<T> = Result<T, ConduitError>;

// =============================================================================
// TESTS
// =============================================================================
