//! Backend sections of the configuration file and their expansion into
//! [`BackendDescriptor`]s.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use validator::Validate;

use crate::aggregator::AggregatorOptions;
use crate::backends::{BackendDescriptor, BackendSettings, KvVersion};
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BackendsConfig {
    /// Treat every backend as fail-fast
    pub fail_fast: bool,

    #[validate(length(min = 1, message = "Application name cannot be empty"))]
    pub application_name: String,

    /// Active profiles, lowest precedence first
    pub profiles: Vec<String>,

    #[validate(range(min = 1, max = 300, message = "Read timeout must be between 1 and 300 seconds"))]
    pub read_timeout_seconds: u64,

    #[validate(nested)]
    pub kv: KeyValueConfig,

    #[validate(nested)]
    pub databases: Vec<DatabaseConfig>,

    #[validate(nested)]
    pub rabbitmq: RabbitMqConfig,

    #[validate(nested)]
    pub consul: ConsulConfig,

    #[validate(nested)]
    pub aws: AwsConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            application_name: "application".to_string(),
            profiles: Vec::new(),
            read_timeout_seconds: 10,
            kv: KeyValueConfig::default(),
            databases: Vec::new(),
            rabbitmq: RabbitMqConfig::default(),
            consul: ConsulConfig::default(),
            aws: AwsConfig::default(),
        }
    }
}

impl BackendsConfig {
    pub fn aggregator_options(&self) -> AggregatorOptions {
        AggregatorOptions { fail_fast: self.fail_fast, read_timeout: Duration::from_secs(self.read_timeout_seconds) }
    }

    /// Expand the configured sections into descriptors, in declaration order.
    pub fn descriptors(&self) -> Vec<BackendDescriptor> {
        let mut descriptors = self.kv.descriptors(&self.application_name, &self.profiles);
        descriptors.extend(self.databases.iter().map(DatabaseConfig::descriptor));

        if self.rabbitmq.enabled {
            descriptors.push(self.rabbitmq.descriptor());
        }
        if self.consul.enabled {
            descriptors.push(self.consul.descriptor());
        }
        if self.aws.enabled {
            descriptors.push(self.aws.descriptor());
        }
        descriptors
    }

    pub(crate) fn validate_custom(&self) -> Result<()> {
        if self.profiles.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::validation_field("Profiles cannot be blank", "backends.profiles"));
        }

        let mut names = HashSet::new();
        for database in &self.databases {
            if !names.insert(database.name.as_str()) {
                return Err(Error::backend_config(
                    database.name.clone(),
                    "name",
                    "Database backend names must be unique",
                ));
            }
            if database.enabled && database.role.trim().is_empty() {
                return Err(Error::backend_config(database.name.clone(), "role", "Database backend requires a role"));
            }
        }

        for (name, enabled, role) in [
            ("rabbitmq", self.rabbitmq.enabled, &self.rabbitmq.role),
            ("consul", self.consul.enabled, &self.consul.role),
            ("aws", self.aws.enabled, &self.aws.role),
        ] {
            if enabled && role.trim().is_empty() {
                return Err(Error::backend_config(name, "role", format!("Backend '{}' requires a role", name)));
            }
        }
        Ok(())
    }
}

/// Generic key-value backend. One descriptor is generated per context.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct KeyValueConfig {
    pub enabled: bool,

    #[validate(length(min = 1, message = "KV backend mount cannot be empty"))]
    pub backend: String,

    /// Context shared by every application; empty disables it
    pub default_context: String,

    #[validate(length(min = 1, message = "Profile separator cannot be empty"))]
    pub profile_separator: String,

    pub version: KvVersion,

    /// Order of the first generated context; later contexts count up from here
    pub order: i32,

    pub fail_fast: bool,
}

impl Default for KeyValueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "secret".to_string(),
            default_context: "application".to_string(),
            profile_separator: "/".to_string(),
            version: KvVersion::V2,
            order: 0,
            fail_fast: false,
        }
    }
}

impl KeyValueConfig {
    /// Contexts from lowest to highest precedence:
    /// `default`, `default/{profile}`, `app`, `app/{profile}`.
    /// The application contexts are skipped when the name equals the default context.
    pub fn contexts(&self, application_name: &str, profiles: &[String]) -> Vec<String> {
        let mut contexts = Vec::new();
        let default_context = self.default_context.trim();
        let application_name = application_name.trim();

        let mut push_with_profiles = |base: &str| {
            contexts.push(base.to_string());
            for profile in profiles {
                contexts.push(format!("{}{}{}", base, self.profile_separator, profile.trim()));
            }
        };

        if !default_context.is_empty() {
            push_with_profiles(default_context);
        }
        if !application_name.is_empty() && application_name != default_context {
            push_with_profiles(application_name);
        }
        contexts
    }

    pub fn descriptors(&self, application_name: &str, profiles: &[String]) -> Vec<BackendDescriptor> {
        if !self.enabled {
            return Vec::new();
        }

        self.contexts(application_name, profiles)
            .into_iter()
            .enumerate()
            .map(|(index, context)| {
                let name = format!("{}/{}", self.backend, context);
                BackendDescriptor::key_value(name, self.backend.clone(), context, self.version)
                    .with_order(self.order.saturating_add(index as i32))
                    .with_fail_fast(self.fail_fast)
            })
            .collect()
    }
}

/// Database engines with their conventional mounts and property names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseFlavor {
    #[default]
    Database,
    Mysql,
    Postgresql,
    Mongodb,
    Cassandra,
    Couchbase,
}

impl DatabaseFlavor {
    pub fn default_mount(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Mysql => "mysql",
            Self::Postgresql => "postgresql",
            Self::Mongodb => "mongodb",
            Self::Cassandra => "cassandra",
            Self::Couchbase => "couchbase",
        }
    }

    /// `(username, password)` property names
    pub fn default_properties(&self) -> (&'static str, &'static str) {
        match self {
            Self::Database | Self::Mysql | Self::Postgresql => {
                ("spring.datasource.username", "spring.datasource.password")
            }
            Self::Mongodb => ("spring.data.mongodb.username", "spring.data.mongodb.password"),
            Self::Cassandra => ("spring.data.cassandra.username", "spring.data.cassandra.password"),
            Self::Couchbase => ("spring.couchbase.username", "spring.couchbase.password"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    #[validate(length(min = 1, message = "Database backend name cannot be empty"))]
    pub name: String,
    pub flavor: DatabaseFlavor,
    pub enabled: bool,
    /// Mount override; defaults to the flavor's mount
    pub backend: Option<String>,
    pub role: String,
    pub static_role: bool,
    pub username_property: Option<String>,
    pub password_property: Option<String>,
    pub order: i32,
    pub fail_fast: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "database".to_string(),
            flavor: DatabaseFlavor::default(),
            enabled: true,
            backend: None,
            role: String::new(),
            static_role: false,
            username_property: None,
            password_property: None,
            order: 10,
            fail_fast: false,
        }
    }
}

impl DatabaseConfig {
    pub fn descriptor(&self) -> BackendDescriptor {
        let (username, password) = self.flavor.default_properties();
        let mount = self.backend.clone().unwrap_or_else(|| self.flavor.default_mount().to_string());

        BackendDescriptor::database(self.name.clone(), mount, self.role.clone())
            .with_settings(BackendSettings::Database {
                static_role: self.static_role,
                username_property: Some(self.username_property.clone().unwrap_or_else(|| username.to_string())),
                password_property: Some(self.password_property.clone().unwrap_or_else(|| password.to_string())),
            })
            .with_enabled(self.enabled)
            .with_order(self.order)
            .with_fail_fast(self.fail_fast)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RabbitMqConfig {
    pub enabled: bool,
    #[validate(length(min = 1, message = "RabbitMQ mount cannot be empty"))]
    pub backend: String,
    pub role: String,
    pub username_property: Option<String>,
    pub password_property: Option<String>,
    pub order: i32,
    pub fail_fast: bool,
}

impl Default for RabbitMqConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: "rabbitmq".to_string(),
            role: String::new(),
            username_property: None,
            password_property: None,
            order: 10,
            fail_fast: false,
        }
    }
}

impl RabbitMqConfig {
    pub fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor::rabbit_mq("rabbitmq", self.backend.clone(), self.role.clone())
            .with_settings(BackendSettings::RabbitMq {
                username_property: self.username_property.clone(),
                password_property: self.password_property.clone(),
            })
            .with_order(self.order)
            .with_fail_fast(self.fail_fast)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConsulConfig {
    pub enabled: bool,
    #[validate(length(min = 1, message = "Consul mount cannot be empty"))]
    pub backend: String,
    pub role: String,
    pub token_property: Option<String>,
    pub order: i32,
    pub fail_fast: bool,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: "consul".to_string(),
            role: String::new(),
            token_property: None,
            order: 10,
            fail_fast: false,
        }
    }
}

impl ConsulConfig {
    pub fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor::consul("consul", self.backend.clone(), self.role.clone())
            .with_settings(BackendSettings::Consul { token_property: self.token_property.clone() })
            .with_order(self.order)
            .with_fail_fast(self.fail_fast)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AwsConfig {
    pub enabled: bool,
    #[validate(length(min = 1, message = "AWS mount cannot be empty"))]
    pub backend: String,
    pub role: String,
    pub access_key_property: Option<String>,
    pub secret_key_property: Option<String>,
    pub session_token_property: Option<String>,
    pub order: i32,
    pub fail_fast: bool,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: "aws".to_string(),
            role: String::new(),
            access_key_property: None,
            secret_key_property: None,
            session_token_property: None,
            order: 10,
            fail_fast: false,
        }
    }
}

impl AwsConfig {
    pub fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor::aws("aws", self.backend.clone(), self.role.clone())
            .with_settings(BackendSettings::Aws {
                access_key_property: self.access_key_property.clone(),
                secret_key_property: self.secret_key_property.clone(),
                session_token_property: self.session_token_property.clone(),
            })
            .with_order(self.order)
            .with_fail_fast(self.fail_fast)
    }
}
