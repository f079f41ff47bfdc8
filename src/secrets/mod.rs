//! Secret store access.
//!
//! The [`SecretStoreClient`] trait is the only seam between vaultline and the store:
//! the session manager uses it to log in, renew and revoke, and the aggregator uses
//! it to read backend paths.
//!
//! # Implementations
//!
//! - [`VaultHttpClient`]: Vault HTTP API over `reqwest`
//! - [`InMemorySecretStore`]: scripted in-process store for development and tests
//!
//! ```rust,ignore
//! use vaultline::secrets::{InMemorySecretStore, SecretStoreClient};
//!
//! let store = InMemorySecretStore::new()
//!     .with_secret("secret/myapp", serde_json::json!({"db.user": "app"}));
//! ```

pub mod client;
pub mod error;
pub mod memory;
pub mod types;
pub mod vault;

pub use client::{LeaseInfo, SecretPayload, SecretStoreClient};
pub use error::StoreError;
pub use memory::InMemorySecretStore;
pub use types::SecretString;
pub use vault::VaultHttpClient;
