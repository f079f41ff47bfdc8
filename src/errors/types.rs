//! # Error Types
//!
//! Crate-level error types for session management and secret aggregation using `thiserror`.

use crate::secrets::StoreError;
use crate::session::RenewalError;

/// Custom result type for vaultline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vaultline
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Login could not produce a token
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<StoreError>,
    },

    /// Token renewal failed
    #[error(transparent)]
    Renewal(#[from] RenewalError),

    /// Configuration errors, optionally scoped to a single backend
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        backend: Option<String>,
        field: Option<String>,
    },

    /// A fail-fast backend found nothing at its resolved path
    #[error("Missing secret for backend '{backend}' at '{path}'")]
    MissingSecret { backend: String, path: String },

    /// Timeouts and unavailability of the secret store
    #[error("Transient failure during {operation}: {message}")]
    Transient {
        operation: String,
        message: String,
        #[source]
        source: Option<StoreError>,
    },

    /// Non-transient secret store failures surfaced as-is
    #[error("Secret store error: {0}")]
    Store(StoreError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an authentication error without an underlying store error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication { message: message.into(), source: None }
    }

    /// Create an authentication error caused by the secret store
    pub fn authentication_with_source<S: Into<String>>(message: S, source: StoreError) -> Self {
        Self::Authentication { message: message.into(), source: Some(source) }
    }

    /// Create a configuration error that is not tied to a backend
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into(), backend: None, field: None }
    }

    /// Create a configuration error naming the backend and the offending field
    pub fn backend_config<B, F, S>(backend: B, field: F, message: S) -> Self
    where
        B: Into<String>,
        F: Into<String>,
        S: Into<String>,
    {
        Self::Configuration {
            message: message.into(),
            backend: Some(backend.into()),
            field: Some(field.into()),
        }
    }

    pub fn missing_secret<B: Into<String>, P: Into<String>>(backend: B, path: P) -> Self {
        Self::MissingSecret { backend: backend.into(), path: path.into() }
    }

    /// Wrap a store failure that may succeed on a later attempt
    pub fn transient<O: Into<String>>(operation: O, source: StoreError) -> Self {
        Self::Transient { operation: operation.into(), message: source.to_string(), source: Some(source) }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Convert a store error, routing timeouts and unavailability to [`Error::Transient`]
    pub fn from_store<O: Into<String>>(operation: O, source: StoreError) -> Self {
        if source.is_transient() {
            Self::transient(operation, source)
        } else {
            Self::Store(source)
        }
    }

    /// Name of the backend a configuration or missing-secret error refers to
    pub fn backend(&self) -> Option<&str> {
        match self {
            Self::Configuration { backend, .. } => backend.as_deref(),
            Self::MissingSecret { backend, .. } => Some(backend),
            _ => None,
        }
    }

    /// Field that failed validation or resolution, when known
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Configuration { field, .. } | Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transient { .. } => true,
            Self::Store(e) => e.is_transient(),
            Self::Renewal(RenewalError::Store(e)) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors.field_errors().keys().next().map(|k| k.to_string());
        Self::Validation { message: format!("Validation failed: {}", errors), field }
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Self::config(format!("Invalid TOML configuration: {}", error))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config(format!("Invalid YAML configuration: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config_error_names_field() {
        let error = Error::backend_config("database", "role", "required field 'role' is missing");
        assert_eq!(error.backend(), Some("database"));
        assert_eq!(error.field(), Some("role"));
        assert!(error.to_string().contains("role"));
    }

    #[test]
    fn test_from_store_routes_transient_errors() {
        let timeout = StoreError::timeout("read", 500);
        assert!(matches!(Error::from_store("read", timeout), Error::Transient { .. }));

        let denied = StoreError::unauthorized("permission denied");
        assert!(matches!(Error::from_store("read", denied), Error::Store(_)));
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::transient("read", StoreError::unavailable("connection refused")).is_retryable());
        assert!(!Error::missing_secret("kv", "secret/app").is_retryable());
        assert!(!Error::authentication("bad credentials").is_retryable());
        assert!(Error::Renewal(RenewalError::Store(StoreError::timeout("renew", 100))).is_retryable());
        assert!(!Error::Renewal(RenewalError::NoSession).is_retryable());
    }
}
