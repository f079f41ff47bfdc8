//! # Configuration Settings
//!
//! Defines the configuration structure for vaultline. Every section has defaults,
//! so a configuration file only needs the values that differ.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use super::backends::BackendsConfig;
use crate::auth::{AuthenticationStrategy, DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH};
use crate::errors::{Error, Result};
use crate::secrets::SecretString;
use crate::session::{RenewalPolicy, SessionOptions};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub vault: VaultConfig,

    #[validate(nested)]
    pub authentication: AuthenticationConfig,

    #[validate(nested)]
    pub session: SessionConfig,

    #[validate(nested)]
    pub backends: BackendsConfig,

    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Checks that span sections or depend on the selected auth method
    fn validate_custom(&self) -> Result<()> {
        url::Url::parse(&self.vault.address).map_err(|e| {
            Error::validation_field(format!("Invalid Vault address '{}': {}", self.vault.address, e), "vault.address")
        })?;

        // Surfaces missing credentials for the selected method.
        self.authentication.to_strategy()?;

        if self.vault.client_identity_path.is_none() && self.authentication.method == AuthMethod::Cert {
            return Err(Error::validation_field(
                "Certificate authentication requires vault.client_identity_path",
                "vault.client_identity_path",
            ));
        }

        self.backends.validate_custom()
    }
}

/// Connection settings for the Vault server
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VaultConfig {
    #[validate(length(min = 1, message = "Vault address cannot be empty"))]
    pub address: String,

    /// Enterprise namespace sent as `X-Vault-Namespace`
    pub namespace: Option<String>,

    #[validate(range(min = 1, max = 300, message = "Connect timeout must be between 1 and 300 seconds"))]
    pub connect_timeout_seconds: u64,

    #[validate(range(min = 1, max = 300, message = "Request timeout must be between 1 and 300 seconds"))]
    pub request_timeout_seconds: u64,

    /// PEM bundle of additional trusted CA certificates
    pub ca_cert_path: Option<PathBuf>,

    /// PEM file holding the client certificate and private key
    pub client_identity_path: Option<PathBuf>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            namespace: None,
            connect_timeout_seconds: 5,
            request_timeout_seconds: 15,
            ca_cert_path: None,
            client_identity_path: None,
        }
    }
}

impl VaultConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Supported login methods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Token,
    AppRole,
    Kubernetes,
    Userpass,
    Cert,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::AppRole => "approle",
            Self::Kubernetes => "kubernetes",
            Self::Userpass => "userpass",
            Self::Cert => "cert",
        }
    }
}

impl FromStr for AuthMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "approle" => Ok(Self::AppRole),
            "kubernetes" => Ok(Self::Kubernetes),
            "userpass" => Ok(Self::Userpass),
            "cert" => Ok(Self::Cert),
            other => Err(Error::validation_field(
                format!("Unknown authentication method '{}'", other),
                "authentication.method",
            )),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication settings. Only the section matching `method` is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuthenticationConfig {
    pub method: AuthMethod,

    /// Static token for `method = "token"`
    pub token: Option<SecretString>,

    #[validate(nested)]
    pub app_role: AppRoleConfig,

    #[validate(nested)]
    pub kubernetes: KubernetesConfig,

    #[validate(nested)]
    pub userpass: UserpassConfig,

    #[validate(nested)]
    pub cert: CertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppRoleConfig {
    #[validate(length(min = 1, message = "AppRole mount cannot be empty"))]
    pub mount: String,
    pub role_id: Option<String>,
    pub secret_id: Option<SecretString>,
}

impl Default for AppRoleConfig {
    fn default() -> Self {
        Self { mount: "approle".to_string(), role_id: None, secret_id: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct KubernetesConfig {
    #[validate(length(min = 1, message = "Kubernetes mount cannot be empty"))]
    pub mount: String,
    pub role: Option<String>,
    pub service_account_token_file: PathBuf,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            mount: "kubernetes".to_string(),
            role: None,
            service_account_token_file: PathBuf::from(DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UserpassConfig {
    #[validate(length(min = 1, message = "Userpass mount cannot be empty"))]
    pub mount: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl Default for UserpassConfig {
    fn default() -> Self {
        Self { mount: "userpass".to_string(), username: None, password: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CertConfig {
    #[validate(length(min = 1, message = "Cert mount cannot be empty"))]
    pub mount: String,
    /// Certificate role to log in against; Vault picks a matching one when unset
    pub name: Option<String>,
}

impl Default for CertConfig {
    fn default() -> Self {
        Self { mount: "cert".to_string(), name: None }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AuthenticationConfig {
    /// Build the strategy for the selected method.
    pub fn to_strategy(&self) -> Result<AuthenticationStrategy> {
        let missing = |field: &str| {
            Error::validation_field(
                format!("Authentication method '{}' requires '{}'", self.method, field),
                field.to_string(),
            )
        };

        match self.method {
            AuthMethod::Token => {
                let token = self.token.clone().filter(|t| !t.is_empty()).ok_or_else(|| missing("authentication.token"))?;
                Ok(AuthenticationStrategy::Token { token })
            }
            AuthMethod::AppRole => {
                let role_id = non_blank(&self.app_role.role_id).ok_or_else(|| missing("authentication.app_role.role_id"))?;
                Ok(AuthenticationStrategy::AppRole {
                    mount: self.app_role.mount.clone(),
                    role_id: role_id.to_string(),
                    secret_id: self.app_role.secret_id.clone().filter(|s| !s.is_empty()),
                })
            }
            AuthMethod::Kubernetes => {
                let role = non_blank(&self.kubernetes.role).ok_or_else(|| missing("authentication.kubernetes.role"))?;
                Ok(AuthenticationStrategy::Kubernetes {
                    mount: self.kubernetes.mount.clone(),
                    role: role.to_string(),
                    jwt_path: self.kubernetes.service_account_token_file.clone(),
                })
            }
            AuthMethod::Userpass => {
                let username = non_blank(&self.userpass.username).ok_or_else(|| missing("authentication.userpass.username"))?;
                let password = self
                    .userpass
                    .password
                    .clone()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| missing("authentication.userpass.password"))?;
                Ok(AuthenticationStrategy::Userpass {
                    mount: self.userpass.mount.clone(),
                    username: username.to_string(),
                    password,
                })
            }
            AuthMethod::Cert => Ok(AuthenticationStrategy::Cert {
                mount: self.cert.mount.clone(),
                name: non_blank(&self.cert.name).map(str::to_string),
            }),
        }
    }
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionConfig {
    #[validate(nested)]
    pub renewal: RenewalConfig,

    /// Deadline for each login, renewal or revocation
    #[validate(range(min = 1, max = 300, message = "Operation timeout must be between 1 and 300 seconds"))]
    pub operation_timeout_seconds: u64,

    /// Revoke login-issued tokens on shutdown
    pub revoke_on_shutdown: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { renewal: RenewalConfig::default(), operation_timeout_seconds: 10, revoke_on_shutdown: true }
    }
}

impl SessionConfig {
    pub fn options(&self) -> SessionOptions {
        SessionOptions { operation_timeout: Duration::from_secs(self.operation_timeout_seconds) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RenewalConfig {
    pub enabled: bool,

    #[validate(range(max = 86400, message = "Expiry threshold must be at most one day"))]
    pub expiry_threshold_seconds: u64,

    #[validate(range(min = 1, max = 3600, message = "Minimum renewal interval must be between 1 and 3600 seconds"))]
    pub min_renewal_interval_seconds: u64,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        let policy = RenewalPolicy::default();
        Self {
            enabled: policy.enabled,
            expiry_threshold_seconds: policy.expiry_threshold.as_secs(),
            min_renewal_interval_seconds: policy.min_renewal_interval.as_secs(),
        }
    }
}

impl RenewalConfig {
    pub fn policy(&self) -> RenewalPolicy {
        RenewalPolicy {
            enabled: self.enabled,
            expiry_threshold: Duration::from_secs(self.expiry_threshold_seconds),
            min_renewal_interval: Duration::from_secs(self.min_renewal_interval_seconds),
        }
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    pub json_logging: bool,

    pub enable_metrics: bool,

    #[validate(length(min = 1, message = "Metrics host cannot be empty"))]
    pub metrics_host: String,

    /// Prometheus listener port; 0 disables the listener
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "vaultline".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
            enable_metrics: false,
            metrics_host: "0.0.0.0".to_string(),
            metrics_port: 9090,
        }
    }
}

impl ObservabilityConfig {
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("{}:{}", self.metrics_host, self.metrics_port))
        }
    }
}
