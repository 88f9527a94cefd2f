//! Error types for the proxydns system
//!
//! Variants follow the failure taxonomy of a sync cycle: configuration
//! errors are fatal at startup, transport errors degrade a single step,
//! and item errors skip a single service.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for proxydns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the proxydns system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failures (DNS lookup, refused, reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from a remote API
    #[error("HTTP status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (may be truncated)
        body: String,
    },

    /// Authentication was rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// External command exited unsuccessfully
    #[error("Command failed with status {status:?}: {stderr}")]
    CommandFailed {
        /// Exit code, `None` when killed by a signal
        status: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service manifest could not be used at all
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a manifest error
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether a later attempt might succeed without operator action
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Transport(_) => true,
            Error::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// Whether the remote side rejected our credentials
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Error::Authentication(_) | Error::Status { status: 401, .. })
    }
}
