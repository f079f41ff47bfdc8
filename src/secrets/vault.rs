//! HashiCorp Vault client over the HTTP API.
//!
//! Every request targets `{address}/v1/{path}` with the session token in the
//! `X-Vault-Token` header and, when configured, the `X-Vault-Namespace` header.
//! Paths are passed through untouched, so the same client serves KV v1/v2 reads,
//! dynamic credential endpoints and the token self-service endpoints.
//!
//! # Status mapping
//!
//! | Response                 | Result                         |
//! |--------------------------|--------------------------------|
//! | 404 on read              | `Ok(None)`                     |
//! | 400                      | `StoreError::InvalidRequest`   |
//! | 401 / 403                | `StoreError::Unauthorized`     |
//! | 429 / 5xx / connect fail | `StoreError::Unavailable`      |
//! | client timeout           | `StoreError::Timeout`          |
//!
//! # Example
//!
//! ```rust,ignore
//! use vaultline::config::VaultConfig;
//! use vaultline::secrets::VaultHttpClient;
//!
//! let client = VaultHttpClient::new(&VaultConfig::default())?;
//! let token = client.login(&flow).await?;
//! let creds = client.read("database/creds/app", &token).await?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::client::{LeaseInfo, SecretPayload, SecretStoreClient};
use super::error::{Result, StoreError};
use crate::auth::LoginFlow;
use crate::config::VaultConfig;
use crate::errors::Error;
use crate::session::{Token, TokenOrigin};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Envelope shared by Vault API responses.
#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    auth: Option<AuthInfo>,
    #[serde(default)]
    lease_id: String,
    #[serde(default)]
    lease_duration: u64,
    #[serde(default)]
    renewable: bool,
}

#[derive(Debug, Deserialize)]
struct AuthInfo {
    #[serde(default)]
    client_token: String,
    #[serde(default)]
    lease_duration: u64,
    #[serde(default)]
    renewable: bool,
}

#[derive(Debug, Deserialize)]
struct TokenLookup {
    #[serde(default)]
    ttl: u64,
    #[serde(default)]
    renewable: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// [`SecretStoreClient`] backed by Vault's HTTP API.
#[derive(Debug, Clone)]
pub struct VaultHttpClient {
    http: Client,
    address: String,
    namespace: Option<String>,
    request_timeout: Duration,
}

impl VaultHttpClient {
    /// Build the client. Reads the CA bundle and client identity from disk when configured.
    pub fn new(config: &VaultConfig) -> crate::errors::Result<Self> {
        let mut builder = ClientBuilder::new()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());

        if let Some(ca_path) = &config.ca_cert_path {
            let pem = std::fs::read(ca_path).map_err(|e| {
                Error::io(e, format!("failed to read CA certificate {}", ca_path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| Error::config(format!("invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(identity_path) = &config.client_identity_path {
            let pem = std::fs::read(identity_path).map_err(|e| {
                Error::io(e, format!("failed to read client identity {}", identity_path.display()))
            })?;
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| Error::config(format!("invalid client identity: {}", e)))?;
            builder = builder.identity(identity);
        }

        let http = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            address: config.address.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone().filter(|ns| !ns.trim().is_empty()),
            request_timeout: config.request_timeout(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, token: Option<&Token>) -> RequestBuilder {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token.value().expose_secret());
        }
        if let Some(namespace) = &self.namespace {
            request = request.header(NAMESPACE_HEADER, namespace);
        }
        request
    }

    /// Send the request and map transport failures and error statuses.
    async fn execute(&self, operation: &str, path: &str, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(operation, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = if body.errors.is_empty() {
            status.to_string()
        } else {
            body.errors.join("; ")
        };

        let error = match status {
            StatusCode::NOT_FOUND => StoreError::not_found(path),
            StatusCode::BAD_REQUEST => StoreError::invalid_request(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::unauthorized(message),
            StatusCode::TOO_MANY_REQUESTS => StoreError::unavailable(message),
            s if s.is_server_error() => StoreError::unavailable(format!("{}: {}", s, message)),
            s => StoreError::invalid_response(format!("unexpected status {}: {}", s, message)),
        };

        if !error.is_not_found() {
            warn!(operation = operation, path = %path, status = %status, error = %error, "Vault request failed");
        }
        Err(error)
    }

    fn transport_error(&self, operation: &str, error: reqwest::Error) -> StoreError {
        if error.is_timeout() {
            StoreError::timed_out_after(operation, self.request_timeout)
        } else if error.is_decode() {
            StoreError::invalid_response(error.to_string())
        } else {
            StoreError::unavailable(error.to_string())
        }
    }

    async fn parse(response: Response) -> Result<ApiResponse> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(ApiResponse::default());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::invalid_response(format!("failed to read body: {}", e)))?;
        if bytes.is_empty() {
            return Ok(ApiResponse::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn lookup_self(&self, token: &Token) -> Result<TokenLookup> {
        let path = "auth/token/lookup-self";
        let response = self.execute("lookup", path, self.request(Method::GET, path, Some(token))).await?;
        let data = Self::parse(response)
            .await?
            .data
            .ok_or_else(|| StoreError::invalid_response("token lookup returned no data"))?;
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl SecretStoreClient for VaultHttpClient {
    #[instrument(skip(self, flow), fields(method = flow.method()))]
    async fn login(&self, flow: &LoginFlow) -> Result<Token> {
        match flow {
            LoginFlow::Static { token } => {
                let probe = Token::new(token.clone(), Duration::ZERO, false, TokenOrigin::Static);
                let lookup = self.lookup_self(&probe).await?;
                debug!(ttl_secs = lookup.ttl, renewable = lookup.renewable, "Verified static token");
                Ok(Token::new(
                    token.clone(),
                    Duration::from_secs(lookup.ttl),
                    lookup.renewable,
                    TokenOrigin::Static,
                ))
            }
            LoginFlow::Login { path, body, .. } => {
                let request = self.request(Method::POST, path, None).json(body);
                let response = self.execute("login", path, request).await?;
                let auth = Self::parse(response)
                    .await?
                    .auth
                    .ok_or_else(|| StoreError::invalid_response("login response has no auth block"))?;
                if auth.client_token.is_empty() {
                    return Err(StoreError::invalid_response("login response has no client token"));
                }
                debug!(lease_secs = auth.lease_duration, renewable = auth.renewable, "Login succeeded");
                Ok(Token::new(
                    auth.client_token,
                    Duration::from_secs(auth.lease_duration),
                    auth.renewable,
                    TokenOrigin::Login,
                ))
            }
        }
    }

    #[instrument(skip(self, token))]
    async fn renew(&self, token: &Token) -> Result<Token> {
        let path = "auth/token/renew-self";
        let request = self.request(Method::POST, path, Some(token)).json(&Map::new());
        let response = self.execute("renew", path, request).await?;
        let auth = Self::parse(response)
            .await?
            .auth
            .ok_or_else(|| StoreError::invalid_response("renewal response has no auth block"))?;
        debug!(lease_secs = auth.lease_duration, renewable = auth.renewable, "Token renewed");
        Ok(token.renewed(Duration::from_secs(auth.lease_duration), auth.renewable))
    }

    #[instrument(skip(self, token))]
    async fn revoke(&self, token: &Token) -> Result<()> {
        let path = "auth/token/revoke-self";
        self.execute("revoke", path, self.request(Method::POST, path, Some(token))).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn read(&self, path: &str, token: &Token) -> Result<Option<SecretPayload>> {
        let response = match self.execute("read", path, self.request(Method::GET, path, Some(token))).await {
            Ok(response) => response,
            Err(StoreError::NotFound { .. }) => {
                debug!(path = %path, "No secret at path");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let envelope = Self::parse(response).await?;
        let data = match envelope.data {
            Some(Value::Object(data)) => data,
            Some(Value::Null) | None => return Ok(None),
            Some(other) => {
                return Err(StoreError::invalid_response(format!(
                    "expected an object at '{}', got {}",
                    path, other
                )))
            }
        };

        let mut payload = SecretPayload::new(data);
        if !envelope.lease_id.is_empty() || envelope.lease_duration > 0 {
            payload = payload.with_lease(LeaseInfo {
                lease_id: envelope.lease_id,
                lease_duration: Duration::from_secs(envelope.lease_duration),
                renewable: envelope.renewable,
            });
        }
        Ok(Some(payload))
    }

    #[instrument(skip(self, token, data))]
    async fn write(&self, path: &str, token: &Token, data: &Map<String, Value>) -> Result<()> {
        let request = self.request(Method::POST, path, Some(token)).json(data);
        self.execute("write", path, request).await?;
        Ok(())
    }
}
