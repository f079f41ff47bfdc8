//! Shared helpers for integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use vaultline::auth::AuthenticationStrategy;
use vaultline::config::VaultConfig;
use vaultline::secrets::{InMemorySecretStore, SecretString, VaultHttpClient};
use vaultline::session::SessionManager;
use wiremock::MockServer;

pub const ROOT_TOKEN: &str = "s.integration";

pub fn static_strategy() -> AuthenticationStrategy {
    AuthenticationStrategy::Token { token: SecretString::new(ROOT_TOKEN) }
}

pub fn approle_strategy() -> AuthenticationStrategy {
    AuthenticationStrategy::AppRole {
        mount: "approle".to_string(),
        role_id: "orders".to_string(),
        secret_id: Some(SecretString::new("secret-id")),
    }
}

pub fn vault_client(server: &MockServer) -> VaultHttpClient {
    let config = VaultConfig { address: server.uri(), ..VaultConfig::default() };
    VaultHttpClient::new(&config).expect("client")
}

pub fn session(store: Arc<InMemorySecretStore>) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(store, static_strategy()))
}

/// Body Vault returns from `auth/token/lookup-self`.
pub fn lookup_body(ttl: u64, renewable: bool) -> Value {
    json!({ "data": { "id": ROOT_TOKEN, "ttl": ttl, "renewable": renewable, "policies": ["default"] } })
}

/// Body Vault returns from a login or renewal endpoint.
pub fn auth_body(token: &str, lease: u64, renewable: bool) -> Value {
    json!({
        "auth": {
            "client_token": token,
            "lease_duration": lease,
            "renewable": renewable,
            "policies": ["default"]
        }
    })
}
