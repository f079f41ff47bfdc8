use super::descriptor::BackendDescriptor;
use crate::errors::{Error, Result};

/// Non-blank value of a required descriptor field, with surrounding slashes trimmed.
pub(crate) fn require<'a>(
    descriptor: &BackendDescriptor,
    field: &str,
    value: Option<&'a str>,
) -> Result<&'a str> {
    match value.map(|v| v.trim().trim_matches('/')) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::backend_config(
            descriptor.name.clone(),
            field,
            format!("backend '{}' requires '{}'", descriptor.name, field),
        )),
    }
}

pub(crate) fn settings_mismatch(descriptor: &BackendDescriptor, expected: &str) -> Error {
    Error::backend_config(
        descriptor.name.clone(),
        "settings",
        format!(
            "backend '{}' has {} settings, expected {}",
            descriptor.name,
            descriptor.kind(),
            expected
        ),
    )
}

/// Configured property name, or `default` when unset. A configured but blank
/// name is a configuration error.
pub(crate) fn property_or<'a>(
    descriptor: &BackendDescriptor,
    field: &str,
    configured: Option<&'a str>,
    default: &'a str,
) -> Result<&'a str> {
    match configured.map(str::trim) {
        None => Ok(default),
        Some(p) if !p.is_empty() => Ok(p),
        Some(_) => Err(Error::backend_config(
            descriptor.name.clone(),
            field,
            format!("backend '{}' has a blank '{}'", descriptor.name, field),
        )),
    }
}
