//! Secret backends
//!
//! A [`BackendDescriptor`] says what to read; the [`BackendMetadataRegistry`]
//! resolves it into a [`SecretBackendMetadata`] saying where to read and how to
//! map the payload into properties.
//!
//! ## Supported kinds
//!
//! - **KeyValue**: `{mount}/{context}` (v1) or `{mount}/data/{context}` (v2)
//! - **Database**: `{mount}/creds/{role}` or `{mount}/static-creds/{role}`
//! - **RabbitMq**, **Consul**, **Aws**: `{mount}/creds/{role}`

pub mod credentials;
pub mod descriptor;
pub mod key_value;
pub mod metadata;
pub mod registry;
mod resolve;

pub use descriptor::{BackendDescriptor, BackendKind, BackendSettings, KvVersion};
pub use metadata::{PayloadLayout, PropertyTransform, SecretBackendMetadata};
pub use registry::{BackendMetadataRegistry, ResolverFn};
