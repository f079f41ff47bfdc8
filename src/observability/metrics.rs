//! # Metrics Collection
//!
//! Prometheus metrics for session and backend activity.
//!
//! | Metric                          | Type    | Labels             |
//! |---------------------------------|---------|--------------------|
//! | `vaultline_logins_total`        | counter | `outcome`          |
//! | `vaultline_renewals_total`      | counter | `outcome`          |
//! | `vaultline_backend_reads_total` | counter | `backend`, `outcome` |
//! | `vaultline_session_state`       | gauge   | `state`            |

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use crate::session::SessionState;

const SESSION_STATES: [&str; 4] = ["unauthenticated", "valid", "renewing", "expired"];

static METRICS: OnceLock<MetricsRecorder> = OnceLock::new();

/// Records application metrics once an exporter is installed.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    pub fn describe(&self) {
        describe_counter!("vaultline_logins_total", "Login attempts against the secret store");
        describe_counter!("vaultline_renewals_total", "Token renewal attempts");
        describe_counter!("vaultline_backend_reads_total", "Backend reads by outcome");
        describe_gauge!("vaultline_session_state", "1 for the current session state, 0 otherwise");
    }

    pub fn record_login(&self, outcome: &str) {
        counter!("vaultline_logins_total", "outcome" => outcome.to_string()).increment(1);
    }

    pub fn record_renewal(&self, outcome: &str) {
        counter!("vaultline_renewals_total", "outcome" => outcome.to_string()).increment(1);
    }

    pub fn record_backend_read(&self, backend: &str, outcome: &str) {
        let labels = [("backend", backend.to_string()), ("outcome", outcome.to_string())];
        counter!("vaultline_backend_reads_total", &labels).increment(1);
    }

    pub fn set_session_state(&self, state: &SessionState) {
        let current = state.name();
        for name in SESSION_STATES {
            let value = if name == current { 1.0 } else { 0.0 };
            gauge!("vaultline_session_state", "state" => name).set(value);
        }
    }
}

/// Install the Prometheus exporter when enabled in configuration.
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let Some(metrics_addr) = config.metrics_bind_address() else {
        warn!("Metrics disabled: no bind address configured");
        return Ok(());
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    let recorder = METRICS.get_or_init(MetricsRecorder::new);
    recorder.describe();
    recorder.set_session_state(&SessionState::Unauthenticated);

    info!(metrics_addr = %metrics_addr, service_name = %config.service_name, "Metrics collection initialized");
    Ok(())
}

pub fn get_metrics() -> Option<&'static MetricsRecorder> {
    METRICS.get()
}

pub fn record_login(outcome: &str) {
    if let Some(metrics) = get_metrics() {
        metrics.record_login(outcome);
    }
}

pub fn record_renewal(outcome: &str) {
    if let Some(metrics) = get_metrics() {
        metrics.record_renewal(outcome);
    }
}

pub fn record_backend_read(backend: &str, outcome: &str) {
    if let Some(metrics) = get_metrics() {
        metrics.record_backend_read(backend, outcome);
    }
}

pub fn set_session_state(state: &SessionState) {
    if let Some(metrics) = get_metrics() {
        metrics.set_session_state(state);
    }
}
