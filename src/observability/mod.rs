//! # Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics through `metrics`.

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, log_config_info};
pub use metrics::{init_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use ::tracing::info;

/// Initialize logging, then metrics.
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_tracing(config)?;
    init_metrics(config)?;

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        metrics_enabled = config.enable_metrics,
        "Observability initialized"
    );
    Ok(())
}
