//! # Vaultline
//!
//! Vaultline keeps an authenticated session with a HashiCorp Vault server and turns
//! the secrets an application needs into one flat property map.
//!
//! ## Architecture
//!
//! ```text
//! AuthenticationStrategy → SessionManager ⇄ RenewalScheduler
//!                               ↓ token
//! BackendDescriptor → BackendMetadataRegistry → ConfigAggregator → PropertySource
//!                                                     ↓
//!                                              SecretStoreClient (Vault HTTP API)
//! ```
//!
//! ## Core Components
//!
//! - **Session**: login, background renewal with retry spacing, revocation on shutdown
//! - **Backends**: key-value contexts and credential-issuing engines (database, RabbitMQ,
//!   Consul, AWS) resolved into paths and property mappings
//! - **Aggregator**: concurrent reads merged by backend order
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vaultline::{config::AppConfig, runtime::Runtime, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let runtime = Runtime::start(&config).await?;
//!     let url = runtime.properties().get_str("spring.datasource.url").await;
//!     println!("{:?}", url);
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod auth;
pub mod backends;
pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod runtime;
pub mod secrets;
pub mod session;

pub use config::AppConfig;
pub use errors::{Error, Result};
pub use runtime::Runtime;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
