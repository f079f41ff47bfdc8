//! Property layers and merging.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::secrets::LeaseInfo;

/// Flattened property map, keys sorted.
pub type Properties = BTreeMap<String, Value>;

/// Properties contributed by one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyLayer {
    pub source: String,
    pub order: i32,
    pub properties: Properties,
    /// Lease of the secret this layer was read from, if the store attached one.
    #[serde(skip)]
    pub lease: Option<LeaseInfo>,
}

impl PropertyLayer {
    pub fn new(source: impl Into<String>, order: i32, properties: Properties) -> Self {
        Self { source: source.into(), order, properties, lease: None }
    }

    /// A layer that contributes nothing, used for missing or forbidden secrets.
    pub fn empty(source: impl Into<String>, order: i32) -> Self {
        Self::new(source, order, Properties::new())
    }

    pub fn with_lease(mut self, lease: Option<LeaseInfo>) -> Self {
        self.lease = lease;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Flatten nested objects to dotted keys and arrays to indexed keys
/// (`{"db": {"hosts": ["a"]}}` becomes `db.hosts[0] = "a"`). Empty objects and
/// arrays are kept as leaf values.
pub fn flatten(data: &Map<String, Value>) -> Properties {
    let mut properties = Properties::new();
    for (key, value) in data {
        flatten_into(&mut properties, key.clone(), value);
    }
    properties
}

fn flatten_into(properties: &mut Properties, key: String, value: &Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (child, value) in map {
                flatten_into(properties, format!("{}.{}", key, child), value);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, value) in items.iter().enumerate() {
                flatten_into(properties, format!("{}[{}]", key, index), value);
            }
        }
        _ => {
            properties.insert(key, value.clone());
        }
    }
}

/// Merge layers into one map. Layers are applied in ascending `order`, so on a key
/// collision the higher order wins; equal orders keep their slice position and the
/// later layer wins.
pub fn merge(layers: &[PropertyLayer]) -> Properties {
    let mut ordered: Vec<&PropertyLayer> = layers.iter().collect();
    ordered.sort_by_key(|layer| layer.order);

    let mut merged = Properties::new();
    for layer in ordered {
        merged.extend(layer.properties.iter().map(|(key, value)| (key.clone(), value.clone())));
    }
    merged
}
