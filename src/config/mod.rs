//! # Configuration Management
//!
//! Configuration is read from a TOML or YAML file (chosen by extension), then
//! overridden from the environment, then validated. Every value has a default,
//! so running without a file is valid as long as credentials arrive through the
//! environment.
//!
//! | Variable                                   | Setting                      |
//! |--------------------------------------------|------------------------------|
//! | `VAULTLINE_ADDR` / `VAULT_ADDR`            | `vault.address`              |
//! | `VAULTLINE_NAMESPACE` / `VAULT_NAMESPACE`  | `vault.namespace`            |
//! | `VAULTLINE_TOKEN` / `VAULT_TOKEN`          | `authentication.token`       |
//! | `VAULTLINE_AUTH_METHOD`                    | `authentication.method`      |
//! | `VAULTLINE_ROLE_ID`                        | `authentication.app_role.role_id` |
//! | `VAULTLINE_SECRET_ID`                      | `authentication.app_role.secret_id` |
//! | `VAULTLINE_KUBERNETES_ROLE`                | `authentication.kubernetes.role` |
//! | `VAULTLINE_APPLICATION_NAME`               | `backends.application_name`  |
//! | `VAULTLINE_PROFILES`                       | `backends.profiles` (comma separated) |
//! | `VAULTLINE_FAIL_FAST`                      | `backends.fail_fast`         |
//! | `VAULTLINE_LOG_LEVEL`                      | `observability.log_level`    |
//! | `VAULTLINE_JSON_LOGGING`                   | `observability.json_logging` |
//! | `VAULTLINE_ENABLE_METRICS`                 | `observability.enable_metrics` |
//! | `VAULTLINE_METRICS_PORT`                   | `observability.metrics_port` |

pub mod backends;
pub mod settings;

pub use backends::{
    AwsConfig, BackendsConfig, ConsulConfig, DatabaseConfig, DatabaseFlavor, KeyValueConfig, RabbitMqConfig,
};
pub use settings::{
    AppConfig, AppRoleConfig, AuthMethod, AuthenticationConfig, CertConfig, KubernetesConfig, ObservabilityConfig,
    RenewalConfig, SessionConfig, UserpassConfig, VaultConfig,
};

use std::path::Path;

use crate::errors::{Error, Result};
use crate::secrets::SecretString;

impl AppConfig {
    /// Load from `path` (if any), apply process environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without applying overrides or validating.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, format!("Failed to read configuration file {}", path.display())))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&contents)?),
            Some("toml") | None => Ok(toml::from_str(&contents)?),
            Some(other) => Err(Error::config(format!("Unsupported configuration format '.{}'", other))),
        }
    }

    /// Apply overrides using `lookup` to read variables. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |names: &[&str]| {
            names.iter().find_map(|name| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
        };

        if let Some(address) = var(&["VAULTLINE_ADDR", "VAULT_ADDR"]) {
            self.vault.address = address;
        }
        if let Some(namespace) = var(&["VAULTLINE_NAMESPACE", "VAULT_NAMESPACE"]) {
            self.vault.namespace = Some(namespace);
        }
        if let Some(token) = var(&["VAULTLINE_TOKEN", "VAULT_TOKEN"]) {
            self.authentication.token = Some(SecretString::new(token));
        }
        if let Some(method) = var(&["VAULTLINE_AUTH_METHOD"]) {
            self.authentication.method = method.parse()?;
        }
        if let Some(role_id) = var(&["VAULTLINE_ROLE_ID"]) {
            self.authentication.app_role.role_id = Some(role_id);
        }
        if let Some(secret_id) = var(&["VAULTLINE_SECRET_ID"]) {
            self.authentication.app_role.secret_id = Some(SecretString::new(secret_id));
        }
        if let Some(role) = var(&["VAULTLINE_KUBERNETES_ROLE"]) {
            self.authentication.kubernetes.role = Some(role);
        }
        if let Some(name) = var(&["VAULTLINE_APPLICATION_NAME"]) {
            self.backends.application_name = name;
        }
        if let Some(profiles) = var(&["VAULTLINE_PROFILES"]) {
            self.backends.profiles = profiles
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(fail_fast) = var(&["VAULTLINE_FAIL_FAST"]) {
            self.backends.fail_fast = parse_bool("VAULTLINE_FAIL_FAST", &fail_fast)?;
        }
        if let Some(level) = var(&["VAULTLINE_LOG_LEVEL"]) {
            self.observability.log_level = level;
        }
        if let Some(json) = var(&["VAULTLINE_JSON_LOGGING"]) {
            self.observability.json_logging = parse_bool("VAULTLINE_JSON_LOGGING", &json)?;
        }
        if let Some(enabled) = var(&["VAULTLINE_ENABLE_METRICS"]) {
            self.observability.enable_metrics = parse_bool("VAULTLINE_ENABLE_METRICS", &enabled)?;
        }
        if let Some(port) = var(&["VAULTLINE_METRICS_PORT"]) {
            self.observability.metrics_port = port
                .parse()
                .map_err(|e| Error::config(format!("Invalid VAULTLINE_METRICS_PORT '{}': {}", port, e)))?;
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("Invalid boolean for {}: '{}'", name, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(lookup(&[
                ("VAULT_ADDR", "https://vault.internal:8200"),
                ("VAULT_TOKEN", "s.env"),
                ("VAULTLINE_PROFILES", "cloud, eu ,"),
                ("VAULTLINE_FAIL_FAST", "yes"),
            ]))
            .unwrap();

        assert_eq!(config.vault.address, "https://vault.internal:8200");
        assert_eq!(config.authentication.token.as_ref().map(|t| t.expose_secret()), Some("s.env"));
        assert_eq!(config.backends.profiles, vec!["cloud", "eu"]);
        assert!(config.backends.fail_fast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prefixed_variable_wins() {
        let mut config = AppConfig::default();
        config
            .apply_env(lookup(&[("VAULTLINE_ADDR", "http://a:8200"), ("VAULT_ADDR", "http://b:8200")]))
            .unwrap();
        assert_eq!(config.vault.address, "http://a:8200");
    }

    #[test]
    fn test_invalid_env_values_rejected() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(lookup(&[("VAULTLINE_AUTH_METHOD", "ldap")])).is_err());
        assert!(config.apply_env(lookup(&[("VAULTLINE_JSON_LOGGING", "maybe")])).is_err());
    }

    #[test]
    fn test_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[vault]
address = "http://vault:8200"

[authentication]
method = "approle"
app_role = {{ role_id = "orders" }}

[backends]
application_name = "orders"
profiles = ["cloud"]

[backends.kv]
version = "1"

[[backends.databases]]
name = "orders-db"
flavor = "postgresql"
role = "readonly"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.authentication.method, AuthMethod::AppRole);
        assert_eq!(config.backends.databases[0].flavor, DatabaseFlavor::Postgresql);
        // application, application/cloud, orders, orders/cloud, orders-db
        assert_eq!(config.backends.descriptors().len(), 5);
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "authentication:\n  token: s.yaml\nsession:\n  revoke_on_shutdown: false\n"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert!(!config.session.revoke_on_shutdown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(AppConfig::from_file(file.path()), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = AppConfig::from_file(Path::new("/nonexistent/vaultline.toml"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
