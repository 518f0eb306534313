//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use price_analysis_core::ports::PortError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A form failed client-side validation and was never sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Represents a failure to encode a request or decode a response body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Represents a standard Input/Output error (e.g., writing a download).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation requires a role the current session does not have.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The server answered successfully but declined the operation.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
