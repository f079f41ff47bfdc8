//! Backend metadata registry
//!
//! Maps each [`BackendKind`] to a resolver that turns a descriptor into read
//! instructions. Resolution is pure: no I/O, same input gives the same output.

use std::collections::HashMap;
use tracing::{debug, info};

use super::credentials;
use super::descriptor::{BackendDescriptor, BackendKind};
use super::key_value;
use super::metadata::SecretBackendMetadata;
use crate::errors::{Error, Result};

/// Pure function from descriptor to metadata.
pub type ResolverFn = fn(&BackendDescriptor) -> Result<SecretBackendMetadata>;

const DEFAULT_RESOLVERS: &[(BackendKind, ResolverFn)] = &[
    (BackendKind::KeyValue, key_value::resolve),
    (BackendKind::Database, credentials::resolve_database),
    (BackendKind::RabbitMq, credentials::resolve_rabbit_mq),
    (BackendKind::Consul, credentials::resolve_consul),
    (BackendKind::Aws, credentials::resolve_aws),
];

#[derive(Debug, Clone)]
pub struct BackendMetadataRegistry {
    resolvers: HashMap<BackendKind, ResolverFn>,
}

impl Default for BackendMetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendMetadataRegistry {
    /// Registry with the built-in resolver for every kind.
    pub fn new() -> Self {
        Self { resolvers: DEFAULT_RESOLVERS.iter().copied().collect() }
    }

    /// Registry without any resolvers.
    pub fn empty() -> Self {
        Self { resolvers: HashMap::new() }
    }

    /// Register a resolver, replacing any existing one for `kind`.
    pub fn register(&mut self, kind: BackendKind, resolver: ResolverFn) {
        info!(backend_kind = %kind, "Registering backend resolver");
        self.resolvers.insert(kind, resolver);
    }

    pub fn has_resolver(&self, kind: BackendKind) -> bool {
        self.resolvers.contains_key(&kind)
    }

    pub fn registered_kinds(&self) -> Vec<BackendKind> {
        self.resolvers.keys().copied().collect()
    }

    pub fn resolve(&self, descriptor: &BackendDescriptor) -> Result<SecretBackendMetadata> {
        let kind = descriptor.kind();
        let resolver = self.resolvers.get(&kind).ok_or_else(|| {
            Error::backend_config(
                descriptor.name.clone(),
                "kind",
                format!("no resolver registered for backend kind '{}'", kind),
            )
        })?;

        let metadata = resolver(descriptor)?;
        debug!(
            backend = %descriptor.name,
            backend_kind = %kind,
            path = %metadata.path,
            order = metadata.order,
            "Resolved backend metadata"
        );
        Ok(metadata)
    }
}
