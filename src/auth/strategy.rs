//! Authentication strategies.

use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, error};

use super::flow::LoginFlow;
use crate::errors::{Error, Result};
use crate::secrets::{SecretStoreClient, SecretString};
use crate::session::Token;

/// Default location of the projected Kubernetes service account token.
pub const DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// How the session obtains its token.
#[derive(Debug, Clone)]
pub enum AuthenticationStrategy {
    /// Use a pre-issued token as-is.
    Token { token: SecretString },
    AppRole {
        mount: String,
        role_id: String,
        secret_id: Option<SecretString>,
    },
    /// Log in with the service account JWT read from `jwt_path`.
    Kubernetes {
        mount: String,
        role: String,
        jwt_path: PathBuf,
    },
    Userpass {
        mount: String,
        username: String,
        password: SecretString,
    },
    /// TLS client certificate login. The certificate itself is presented by the
    /// HTTP client; `name` optionally pins the certificate role.
    Cert { mount: String, name: Option<String> },
}

impl AuthenticationStrategy {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Token { .. } => "token",
            Self::AppRole { .. } => "approle",
            Self::Kubernetes { .. } => "kubernetes",
            Self::Userpass { .. } => "userpass",
            Self::Cert { .. } => "cert",
        }
    }

    /// Build the login request. Only the Kubernetes strategy touches the filesystem.
    pub async fn login_flow(&self) -> Result<LoginFlow> {
        let method = self.method_name();
        match self {
            Self::Token { token } => {
                if token.is_empty() {
                    return Err(Error::authentication("token authentication requires a token"));
                }
                Ok(LoginFlow::Static { token: token.clone() })
            }
            Self::AppRole { mount, role_id, secret_id } => {
                let mut body = Map::new();
                body.insert("role_id".to_string(), Value::String(role_id.clone()));
                if let Some(secret_id) = secret_id {
                    body.insert(
                        "secret_id".to_string(),
                        Value::String(secret_id.expose_secret().to_string()),
                    );
                }
                Ok(LoginFlow::login(method, login_path(mount), body))
            }
            Self::Kubernetes { mount, role, jwt_path } => {
                let jwt = tokio::fs::read_to_string(jwt_path).await.map_err(|e| {
                    error!(error = %e, path = %jwt_path.display(), "Failed to read service account token");
                    Error::authentication(format!(
                        "cannot read service account token from '{}': {}",
                        jwt_path.display(),
                        e
                    ))
                })?;
                let jwt = jwt.trim();
                if jwt.is_empty() {
                    return Err(Error::authentication(format!(
                        "service account token at '{}' is empty",
                        jwt_path.display()
                    )));
                }

                let mut body = Map::new();
                body.insert("role".to_string(), Value::String(role.clone()));
                body.insert("jwt".to_string(), Value::String(jwt.to_string()));
                Ok(LoginFlow::login(method, login_path(mount), body))
            }
            Self::Userpass { mount, username, password } => {
                let mut body = Map::new();
                body.insert(
                    "password".to_string(),
                    Value::String(password.expose_secret().to_string()),
                );
                let path = format!("{}/{}", login_path(mount), username);
                Ok(LoginFlow::login(method, path, body))
            }
            Self::Cert { mount, name } => {
                let mut body = Map::new();
                if let Some(name) = name {
                    body.insert("name".to_string(), Value::String(name.clone()));
                }
                Ok(LoginFlow::login(method, login_path(mount), body))
            }
        }
    }

    /// Run the login flow against `client`.
    pub async fn login(&self, client: &dyn SecretStoreClient) -> Result<Token> {
        let flow = self.login_flow().await?;
        debug!(method = flow.method(), "Executing login flow");

        client.login(&flow).await.map_err(|e| {
            Error::authentication_with_source(format!("{} login failed: {}", self.method_name(), e), e)
        })
    }
}

fn login_path(mount: &str) -> String {
    format!("auth/{}/login", mount.trim_matches('/'))
}
