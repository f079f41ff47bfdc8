//! Key-value backend resolution.

use super::descriptor::{BackendDescriptor, BackendSettings, KvVersion};
use super::metadata::{PayloadLayout, SecretBackendMetadata};
use super::resolve::{require, settings_mismatch};
use crate::errors::Result;

/// `{mount}/{context}` for KV v1, `{mount}/data/{context}` for KV v2.
pub fn resolve(descriptor: &BackendDescriptor) -> Result<SecretBackendMetadata> {
    let BackendSettings::KeyValue { context, version } = &descriptor.settings else {
        return Err(settings_mismatch(descriptor, "key_value"));
    };

    let mount = require(descriptor, "mount", descriptor.mount.as_deref())?;
    let context = require(descriptor, "context", context.as_deref())?;

    let (path, layout) = match version {
        KvVersion::V1 => (format!("{}/{}", mount, context), PayloadLayout::Flat),
        KvVersion::V2 => (format!("{}/data/{}", mount, context), PayloadLayout::Versioned),
    };

    Ok(SecretBackendMetadata::new(path, descriptor.order, descriptor.name.clone()).with_layout(layout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_v1_and_v2_paths() {
        let v1 = BackendDescriptor::key_value("kv", "secret", "myapp", KvVersion::V1);
        let metadata = resolve(&v1).unwrap();
        assert_eq!(metadata.path, "secret/myapp");
        assert_eq!(metadata.layout, PayloadLayout::Flat);

        let v2 = BackendDescriptor::key_value("kv", "/secret/", "myapp/dev", KvVersion::V2).with_order(4);
        let metadata = resolve(&v2).unwrap();
        assert_eq!(metadata.path, "secret/data/myapp/dev");
        assert_eq!(metadata.layout, PayloadLayout::Versioned);
        assert_eq!(metadata.order, 4);
        assert!(metadata.transform.is_none());
    }

    #[test]
    fn test_missing_context_names_field() {
        let descriptor = BackendDescriptor::key_value("kv", "secret", "  ", KvVersion::V2);
        match resolve(&descriptor).unwrap_err() {
            Error::Configuration { backend, field, .. } => {
                assert_eq!(backend.as_deref(), Some("kv"));
                assert_eq!(field.as_deref(), Some("context"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
