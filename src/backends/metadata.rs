//! Resolved read instructions for a backend.

use serde_json::Value;
use std::collections::BTreeMap;

/// Shape of the payload returned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLayout {
    /// Properties are the top-level `data` object.
    Flat,
    /// KV v2: properties live under `data.data`.
    Versioned,
}

/// Renames payload keys to property names (`username` to `spring.datasource.username`).
/// Keys without a mapping pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTransform {
    mappings: BTreeMap<String, String>,
}

impl PropertyTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.mappings.insert(from.into(), to.into());
        self
    }

    pub fn target(&self, key: &str) -> Option<&str> {
        self.mappings.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn apply(&self, properties: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
        properties
            .into_iter()
            .map(|(key, value)| match self.mappings.get(&key) {
                Some(renamed) => (renamed.clone(), value),
                None => (key, value),
            })
            .collect()
    }
}

/// Output of resolving a [`BackendDescriptor`](super::BackendDescriptor): where to
/// read and how to turn the payload into properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretBackendMetadata {
    pub path: String,
    pub order: i32,
    pub source_name: String,
    pub layout: PayloadLayout,
    pub transform: Option<PropertyTransform>,
}

impl SecretBackendMetadata {
    pub fn new(path: impl Into<String>, order: i32, source_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            order,
            source_name: source_name.into(),
            layout: PayloadLayout::Flat,
            transform: None,
        }
    }

    pub fn with_layout(mut self, layout: PayloadLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_transform(mut self, transform: PropertyTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}
