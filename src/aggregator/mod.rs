//! Configuration aggregation
//!
//! Turns backend descriptors into property layers:
//!
//! 1. Disabled descriptors are dropped; the rest are resolved through the
//!    [`BackendMetadataRegistry`] before any I/O happens.
//! 2. One read per resolved backend is issued concurrently with the current session token.
//! 3. Payloads are unwrapped (KV v2), flattened and renamed into [`PropertyLayer`]s,
//!    returned sorted by `(order, declaration index)` regardless of completion order.
//!
//! # Failure handling
//!
//! | Outcome               | fail-fast | otherwise            |
//! |-----------------------|-----------|----------------------|
//! | resolution error      | error     | backend skipped      |
//! | nothing at path       | error     | empty layer          |
//! | permission denied     | error     | empty layer          |
//! | timeout / unavailable | error     | error                |

pub mod layer;
pub mod source;

pub use layer::{flatten, merge, Properties, PropertyLayer};
pub use source::PropertySource;

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, warn, Instrument};

use crate::backend_span;
use crate::backends::{BackendDescriptor, BackendMetadataRegistry, PayloadLayout, SecretBackendMetadata};
use crate::errors::{Error, Result};
use crate::observability::metrics;
use crate::secrets::{SecretPayload, SecretStoreClient, StoreError};
use crate::session::{SessionManager, Token};

/// Default per-read deadline.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct AggregatorOptions {
    /// Treat every backend as fail-fast.
    pub fail_fast: bool,
    pub read_timeout: Duration,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self { fail_fast: false, read_timeout: DEFAULT_READ_TIMEOUT }
    }
}

struct PlannedRead<'a> {
    descriptor: &'a BackendDescriptor,
    metadata: SecretBackendMetadata,
}

#[derive(Debug, Clone)]
pub struct ConfigAggregator {
    client: Arc<dyn SecretStoreClient>,
    session: Arc<SessionManager>,
    registry: Arc<BackendMetadataRegistry>,
    options: AggregatorOptions,
}

impl ConfigAggregator {
    pub fn new(
        client: Arc<dyn SecretStoreClient>,
        session: Arc<SessionManager>,
        registry: Arc<BackendMetadataRegistry>,
    ) -> Self {
        Self { client, session, registry, options: AggregatorOptions::default() }
    }

    pub fn with_options(mut self, options: AggregatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    /// Build one layer per enabled backend, sorted by ascending order.
    ///
    /// Fails with the first fatal error in declaration order.
    pub async fn build(&self, descriptors: &[BackendDescriptor]) -> Result<Vec<PropertyLayer>> {
        let planned = self.plan(descriptors)?;
        if planned.is_empty() {
            debug!("No enabled backends to read");
            return Ok(Vec::new());
        }

        let token = self.session.get_token().await?;
        let reads = planned.iter().map(|read| {
            let span = backend_span!(read.descriptor.name, read.metadata.path);
            self.read_layer(read, &token).instrument(span)
        });
        let outcomes = join_all(reads).await;

        let mut layers = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            layers.push(outcome?);
        }
        // Stable sort keeps declaration order for equal orders.
        layers.sort_by_key(|layer| layer.order);

        debug!(layers = layers.len(), "Aggregated property layers");
        Ok(layers)
    }

    /// Build and merge in one step.
    pub async fn build_properties(&self, descriptors: &[BackendDescriptor]) -> Result<Properties> {
        Ok(merge(&self.build(descriptors).await?))
    }

    fn plan<'a>(&self, descriptors: &'a [BackendDescriptor]) -> Result<Vec<PlannedRead<'a>>> {
        let mut planned = Vec::new();
        for descriptor in descriptors.iter().filter(|d| d.enabled) {
            match self.registry.resolve(descriptor) {
                Ok(metadata) => planned.push(PlannedRead { descriptor, metadata }),
                Err(e) if self.is_fail_fast(descriptor) => return Err(e),
                Err(e) => {
                    metrics::record_backend_read(descriptor.kind().as_str(), "skipped");
                    warn!(backend = %descriptor.name, error = %e, "Skipping misconfigured backend");
                }
            }
        }
        Ok(planned)
    }

    fn is_fail_fast(&self, descriptor: &BackendDescriptor) -> bool {
        descriptor.fail_fast || self.options.fail_fast
    }

    async fn read_layer(&self, read: &PlannedRead<'_>, token: &Token) -> Result<PropertyLayer> {
        let PlannedRead { descriptor, metadata } = read;
        let kind = descriptor.kind().as_str();
        let timeout = self.options.read_timeout;

        let outcome = time::timeout(timeout, self.client.read(&metadata.path, token))
            .await
            .unwrap_or_else(|_| Err(StoreError::timed_out_after("read", timeout)));

        let payload = match outcome {
            Ok(Some(payload)) => unwrap_payload(payload, metadata.layout),
            Ok(None) | Err(StoreError::NotFound { .. }) => None,
            Err(e) if e.is_unauthorized() => {
                metrics::record_backend_read(kind, "forbidden");
                if self.is_fail_fast(descriptor) {
                    return Err(Error::Store(e));
                }
                warn!(error = %e, "Access to backend denied, contributing no properties");
                return Ok(PropertyLayer::empty(metadata.source_name.clone(), metadata.order));
            }
            Err(e) => {
                metrics::record_backend_read(kind, "error");
                return Err(Error::from_store("read", e));
            }
        };

        let Some(payload) = payload else {
            metrics::record_backend_read(kind, "missing");
            if self.is_fail_fast(descriptor) {
                return Err(Error::missing_secret(descriptor.name.clone(), metadata.path.clone()));
            }
            debug!("No secret at backend path, contributing no properties");
            return Ok(PropertyLayer::empty(metadata.source_name.clone(), metadata.order));
        };

        let mut properties = flatten(&payload.data);
        if let Some(transform) = &metadata.transform {
            properties = transform.apply(properties);
        }

        metrics::record_backend_read(kind, "success");
        debug!(properties = properties.len(), "Read backend properties");
        Ok(PropertyLayer::new(metadata.source_name.clone(), metadata.order, properties)
            .with_lease(payload.lease))
    }
}

/// KV v2 nests the secret under `data`; a missing or null inner object means the
/// latest version was deleted.
fn unwrap_payload(payload: SecretPayload, layout: PayloadLayout) -> Option<SecretPayload> {
    match layout {
        PayloadLayout::Flat => Some(payload),
        PayloadLayout::Versioned => {
            let SecretPayload { mut data, lease } = payload;
            match data.remove("data") {
                Some(Value::Object(inner)) => Some(SecretPayload { data: inner, lease }),
                _ => None,
            }
        }
    }
}
