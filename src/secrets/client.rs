//! Secret store client trait and payload types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::error::Result;
use crate::auth::LoginFlow;
use crate::session::Token;

/// Lease attached to a secret read (dynamic credentials carry one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInfo {
    pub lease_id: String,
    pub lease_duration: Duration,
    pub renewable: bool,
}

/// Body of a successful read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretPayload {
    pub data: Map<String, Value>,
    pub lease: Option<LeaseInfo>,
}

impl SecretPayload {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data, lease: None }
    }

    pub fn with_lease(mut self, lease: LeaseInfo) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Build a payload from a JSON object literal. Non-object values produce an empty payload.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(data) => Self::new(data),
            _ => Self::default(),
        }
    }
}

/// Operations the session manager and the aggregator need from a secret store.
///
/// All methods are cancel-safe: callers bound them with `tokio::time::timeout`.
///
/// # Errors
///
/// - `Unauthorized` when credentials or the token are rejected
/// - `Timeout` / `Unavailable` for transport failures
/// - `InvalidResponse` when the body cannot be parsed
#[async_trait]
pub trait SecretStoreClient: Send + Sync + std::fmt::Debug {
    /// Exchange a login flow for a token.
    async fn login(&self, flow: &LoginFlow) -> Result<Token>;

    /// Extend the lease of `token`, returning the renewed token.
    async fn renew(&self, token: &Token) -> Result<Token>;

    /// Invalidate `token` on the store.
    async fn revoke(&self, token: &Token) -> Result<()>;

    /// Read the secret at `path`. `Ok(None)` means nothing is stored there.
    async fn read(&self, path: &str, token: &Token) -> Result<Option<SecretPayload>>;

    /// Write `data` at `path`.
    async fn write(&self, path: &str, token: &Token, data: &Map<String, Value>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_from_json_object() {
        let payload = SecretPayload::from_json(json!({"user": "app", "pass": "secret"}));
        assert_eq!(payload.data.len(), 2);
        assert!(payload.lease.is_none());
    }

    #[test]
    fn test_payload_from_non_object_is_empty() {
        assert!(SecretPayload::from_json(json!(["a"])).data.is_empty());
    }
}
