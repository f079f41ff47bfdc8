//! Merged property view over a set of backends.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::layer::{merge, Properties, PropertyLayer};
use super::ConfigAggregator;
use crate::backends::BackendDescriptor;
use crate::errors::Result;

// Layers and the map merged from them, always swapped together.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    layers: Arc<Vec<PropertyLayer>>,
    properties: Arc<Properties>,
}

/// Holds the last successfully merged properties. A failed refresh leaves the
/// previous snapshot in place. Refreshes run one at a time.
#[derive(Debug)]
pub struct PropertySource {
    aggregator: ConfigAggregator,
    descriptors: Vec<BackendDescriptor>,
    current: RwLock<Snapshot>,
    refreshing: Mutex<()>,
}

impl PropertySource {
    pub fn new(aggregator: ConfigAggregator, descriptors: Vec<BackendDescriptor>) -> Self {
        Self {
            aggregator,
            descriptors,
            current: RwLock::new(Snapshot::default()),
            refreshing: Mutex::new(()),
        }
    }

    pub fn descriptors(&self) -> &[BackendDescriptor] {
        &self.descriptors
    }

    /// Re-read every backend and swap in the merged result.
    pub async fn refresh(&self) -> Result<Arc<Properties>> {
        let _guard = self.refreshing.lock().await;
        let layers = self.aggregator.build(&self.descriptors).await?;
        let merged = Arc::new(merge(&layers));

        *self.current.write().await = Snapshot { layers: Arc::new(layers), properties: merged.clone() };

        info!(properties = merged.len(), "Property source refreshed");
        Ok(merged)
    }

    pub async fn snapshot(&self) -> Arc<Properties> {
        self.current.read().await.properties.clone()
    }

    /// Layers behind the current snapshot, lowest order first.
    pub async fn layers(&self) -> Arc<Vec<PropertyLayer>> {
        self.current.read().await.layers.clone()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.current.read().await.properties.get(key).cloned()
    }

    /// Convenience accessor for string-valued properties.
    pub async fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key).await? {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}
