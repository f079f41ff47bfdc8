//! Vault HTTP client against a mock Vault server.

mod common;

use common::{auth_body, lookup_body, vault_client, ROOT_TOKEN};
use serde_json::{json, Map};
use std::time::Duration;
use vaultline::auth::LoginFlow;
use vaultline::config::VaultConfig;
use vaultline::secrets::{SecretStoreClient, SecretString, StoreError, VaultHttpClient};
use vaultline::session::{Token, TokenOrigin};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token(value: &str, origin: TokenOrigin) -> Token {
    Token::new(value, Duration::from_secs(60), true, origin)
}

#[tokio::test]
async fn test_static_token_is_verified_with_lookup_self() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("X-Vault-Token", ROOT_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(lookup_body(3600, true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = vault_client(&server);
    let flow = LoginFlow::Static { token: SecretString::new(ROOT_TOKEN) };
    let token = client.login(&flow).await.unwrap();

    assert_eq!(token.value().expose_secret(), ROOT_TOKEN);
    assert_eq!(token.lease_duration(), Duration::from_secs(3600));
    assert!(token.is_renewable());
    assert_eq!(token.origin(), TokenOrigin::Static);
}

#[tokio::test]
async fn test_approle_login_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(json!({"role_id": "orders", "secret_id": "secret-id"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("s.issued", 1800, true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = vault_client(&server);
    let flow = common::approle_strategy().login_flow().await.unwrap();
    let token = client.login(&flow).await.unwrap();

    assert_eq!(token.value().expose_secret(), "s.issued");
    assert_eq!(token.lease_duration(), Duration::from_secs(1800));
    assert_eq!(token.origin(), TokenOrigin::Login);
}

#[tokio::test]
async fn test_rejected_login_maps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"errors": ["invalid role or secret ID"]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/userpass/login/alice"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})))
        .mount(&server)
        .await;

    let client = vault_client(&server);
    let approle = client.login(&LoginFlow::login("approle", "auth/approle/login", Map::new())).await;
    assert_eq!(approle.unwrap_err(), StoreError::invalid_request("invalid role or secret ID"));

    let userpass = client.login(&LoginFlow::login("userpass", "auth/userpass/login/alice", Map::new())).await;
    assert!(userpass.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn test_renew_self_extends_lease_and_keeps_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/renew-self"))
        .and(header("X-Vault-Token", "s.issued"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("s.issued", 900, true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = vault_client(&server);
    let current = token("s.issued", TokenOrigin::Login);
    let renewed = client.renew(&current).await.unwrap();

    assert_eq!(renewed.value(), current.value());
    assert_eq!(renewed.lease_duration(), Duration::from_secs(900));
    assert_eq!(renewed.origin(), TokenOrigin::Login);
}

#[tokio::test]
async fn test_revoke_self_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/revoke-self"))
        .and(header("X-Vault-Token", "s.issued"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = vault_client(&server);
    client.revoke(&token("s.issued", TokenOrigin::Login)).await.unwrap();
}

#[tokio::test]
async fn test_read_returns_data_and_lease() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/database/creds/readonly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_id": "database/creds/readonly/abc",
            "lease_duration": 3600,
            "renewable": true,
            "data": {"username": "v-readonly", "password": "pw"}
        })))
        .mount(&server)
        .await;

    let client = vault_client(&server);
    let payload = client
        .read("database/creds/readonly", &token(ROOT_TOKEN, TokenOrigin::Static))
        .await
        .unwrap()
        .expect("payload");

    assert_eq!(payload.data.get("username"), Some(&json!("v-readonly")));
    let lease = payload.lease.expect("lease");
    assert_eq!(lease.lease_id, "database/creds/readonly/abc");
    assert_eq!(lease.lease_duration, Duration::from_secs(3600));
}

#[tokio::test]
async fn test_kv_v2_read_keeps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"data": {"api.key": "k"}, "metadata": {"version": 3}}
        })))
        .mount(&server)
        .await;

    let client = vault_client(&server);
    let payload = client.read("secret/data/orders", &token(ROOT_TOKEN, TokenOrigin::Static)).await.unwrap().unwrap();
    assert_eq!(payload.data.get("data"), Some(&json!({"api.key": "k"})));
    assert!(payload.lease.is_none());
}

#[tokio::test]
async fn test_read_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/sealed"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"errors": ["Vault is sealed"]})))
        .mount(&server)
        .await;

    let client = vault_client(&server);
    let token = token(ROOT_TOKEN, TokenOrigin::Static);

    assert_eq!(client.read("secret/missing", &token).await.unwrap(), None);
    assert!(client.read("secret/forbidden", &token).await.unwrap_err().is_unauthorized());
    let sealed = client.read("secret/sealed", &token).await.unwrap_err();
    assert!(sealed.is_transient());
    assert!(sealed.to_string().contains("Vault is sealed"));
}

#[tokio::test]
async fn test_namespace_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/orders"))
        .and(header("X-Vault-Namespace", "team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"k": "v"}})))
        .expect(1)
        .mount(&server)
        .await;

    let config = VaultConfig {
        address: format!("{}/", server.uri()),
        namespace: Some("team-a".to_string()),
        ..VaultConfig::default()
    };
    let client = VaultHttpClient::new(&config).unwrap();
    let payload = client.read("secret/orders", &token(ROOT_TOKEN, TokenOrigin::Static)).await.unwrap();
    assert!(payload.is_some());
}

#[tokio::test]
async fn test_write_posts_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/secret/orders"))
        .and(body_json(json!({"k": "v"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = vault_client(&server);
    let mut data = Map::new();
    data.insert("k".to_string(), json!("v"));
    client.write("secret/orders", &token(ROOT_TOKEN, TokenOrigin::Static), &data).await.unwrap();
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = VaultConfig { address: server.uri(), request_timeout_seconds: 1, ..VaultConfig::default() };
    let client = VaultHttpClient::new(&config).unwrap();
    let error = client.read("secret/slow", &token(ROOT_TOKEN, TokenOrigin::Static)).await.unwrap_err();
    assert!(matches!(error, StoreError::Timeout { .. }));
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    let config = VaultConfig { address: "http://127.0.0.1:1".to_string(), ..VaultConfig::default() };
    let client = VaultHttpClient::new(&config).unwrap();
    let error = client.read("secret/any", &token(ROOT_TOKEN, TokenOrigin::Static)).await.unwrap_err();
    assert!(matches!(error, StoreError::Unavailable { .. }));
}
