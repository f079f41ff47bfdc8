//! Error types for secret store operations.

use std::time::Duration;
use thiserror::Error;

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by a [`SecretStoreClient`](super::SecretStoreClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store rejected the credentials or the token (401/403).
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Nothing stored at the requested path.
    #[error("Secret not found: {path}")]
    NotFound { path: String },

    /// The store could not be reached or answered with a server error.
    #[error("Secret store unavailable: {message}")]
    Unavailable { message: String },

    /// The operation did not complete within its deadline.
    #[error("Operation '{operation}' timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// The store answered with a body we could not interpret.
    #[error("Invalid response from secret store: {message}")]
    InvalidResponse { message: String },

    /// The request was rejected as malformed (400).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl StoreError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout { operation: operation.into(), duration_ms }
    }

    /// Timeout error for an operation bounded by `limit`.
    pub fn timed_out_after(operation: impl Into<String>, limit: Duration) -> Self {
        Self::timeout(operation, limit.as_millis() as u64)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    /// Timeouts and unavailability may clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::invalid_response(error.to_string())
    }
}
