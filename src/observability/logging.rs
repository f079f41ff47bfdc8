//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! `RUST_LOG` takes precedence over the configured log level. JSON output is
//! meant for log shippers; the default is the human-readable formatter.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Create a tracing span for a single backend read.
///
/// ```rust,ignore
/// let span = backend_span!("mysql", "mysql/creds/readonly");
/// ```
#[macro_export]
macro_rules! backend_span {
    ($backend:expr, $path:expr) => {
        tracing::debug_span!("backend_read", backend = %$backend, path = %$path)
    };
    ($backend:expr, $path:expr, $($field:tt)*) => {
        tracing::debug_span!("backend_read", backend = %$backend, path = %$path, $($field)*)
    };
}

/// Create a tracing span for session operations (login, renew, revoke).
#[macro_export]
macro_rules! session_span {
    ($operation:expr) => {
        tracing::info_span!("session_operation", operation = %$operation)
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info_span!("session_operation", operation = %$operation, $($field)*)
    };
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log level '{}': {}", config.log_level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json_logging {
        registry.with(fmt::layer().json().with_target(true).with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))
}

/// Log the effective configuration at startup. Credentials are never included.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        vault_address = %config.vault.address,
        namespace = ?config.vault.namespace,
        auth_method = %config.authentication.method,
        application = %config.backends.application_name,
        profiles = ?config.backends.profiles,
        renewal_enabled = config.session.renewal.enabled,
        "Configuration loaded"
    );
}
