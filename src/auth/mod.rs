//! Authentication strategies and the login requests they produce.
//!
//! A strategy is pure configuration; [`AuthenticationStrategy::login`] turns it into
//! a [`LoginFlow`] and hands that to a [`SecretStoreClient`](crate::secrets::SecretStoreClient).

pub mod flow;
pub mod strategy;

pub use flow::LoginFlow;
pub use strategy::{AuthenticationStrategy, DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH};
