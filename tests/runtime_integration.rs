//! Full startup against a mock Vault server.

mod common;

use common::{auth_body, lookup_body, ROOT_TOKEN};
use serde_json::json;
use vaultline::config::{AppConfig, AuthMethod, DatabaseConfig, DatabaseFlavor};
use vaultline::secrets::SecretString;
use vaultline::session::SessionState;
use vaultline::{Error, Runtime};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.vault.address = server.uri();
    config.authentication.token = Some(SecretString::new(ROOT_TOKEN));
    config.backends.application_name = "orders".to_string();
    config.backends.profiles = vec!["cloud".to_string()];
    config.backends.databases.push(DatabaseConfig {
        name: "orders-db".to_string(),
        flavor: DatabaseFlavor::Mysql,
        role: "readonly".to_string(),
        ..DatabaseConfig::default()
    });
    config
}

async fn mount_kv(server: &MockServer, context: &str, data: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/secret/data/{}", context)))
        .and(header("X-Vault-Token", ROOT_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"data": data, "metadata": {}}})))
        .mount(server)
        .await;
}

async fn mount_database(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/mysql/creds/readonly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_id": "mysql/creds/readonly/xyz",
            "lease_duration": 3600,
            "renewable": true,
            "data": {"username": "v-orders", "password": "generated"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_startup_merges_all_backends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lookup_body(0, false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/revoke-self"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    mount_kv(&server, "application", json!({"logging": {"level": "info"}, "region": "us"})).await;
    mount_kv(&server, "orders", json!({"region": "eu"})).await;
    mount_kv(&server, "orders/cloud", json!({"logging": {"level": "warn"}})).await;
    mount_database(&server).await;

    let runtime = Runtime::start(&config(&server)).await.unwrap();
    let properties = runtime.properties();

    assert_eq!(properties.get_str("logging.level").await.as_deref(), Some("warn"));
    assert_eq!(properties.get_str("region").await.as_deref(), Some("eu"));
    assert_eq!(properties.get_str("spring.datasource.username").await.as_deref(), Some("v-orders"));

    let layers = properties.layers().await;
    let db_layer = layers.iter().find(|l| l.source == "orders-db").expect("database layer");
    assert_eq!(db_layer.lease.as_ref().map(|l| l.lease_id.as_str()), Some("mysql/creds/readonly/xyz"));

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_approle_session_is_revoked_on_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("s.approle", 3600, true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/revoke-self"))
        .and(header("X-Vault-Token", "s.approle"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/application"))
        .and(header("X-Vault-Token", "s.approle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"data": {"k": "v"}}})))
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.authentication.method = AuthMethod::AppRole;
    config.authentication.app_role.role_id = Some("orders".to_string());
    config.backends.databases.clear();
    config.backends.profiles.clear();

    let runtime = Runtime::start(&config).await.unwrap();
    assert!(matches!(runtime.session().state(), SessionState::Valid(_)));
    assert_eq!(runtime.properties().get_str("k").await.as_deref(), Some("v"));

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_sealed_vault_fails_startup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"errors": ["Vault is sealed"]})))
        .mount(&server)
        .await;

    let result = Runtime::start(&config(&server)).await;
    match result {
        Err(Error::Authentication { message, .. }) => assert!(message.contains("token")),
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("startup should fail"),
    }
}
