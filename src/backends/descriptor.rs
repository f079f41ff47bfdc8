//! Backend descriptors: the configured intent for one secret backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of secret backend. Selects the resolver in the
/// [`BackendMetadataRegistry`](super::BackendMetadataRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Generic key-value store (KV v1 or v2)
    KeyValue,
    /// Database secrets engine (dynamic or static roles)
    Database,
    RabbitMq,
    Consul,
    Aws,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyValue => "key_value",
            Self::Database => "database",
            Self::RabbitMq => "rabbit_mq",
            Self::Consul => "consul",
            Self::Aws => "aws",
        }
    }

    pub fn all() -> [BackendKind; 5] {
        [Self::KeyValue, Self::Database, Self::RabbitMq, Self::Consul, Self::Aws]
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "key_value" | "kv" => Ok(Self::KeyValue),
            "database" => Ok(Self::Database),
            "rabbit_mq" | "rabbitmq" => Ok(Self::RabbitMq),
            "consul" => Ok(Self::Consul),
            "aws" => Ok(Self::Aws),
            _ => Err(format!("Unknown backend kind: {}", s)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// KV engine version. Version 2 nests payloads under `data` and reads go through `{mount}/data/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KvVersion {
    #[serde(rename = "1")]
    V1,
    #[default]
    #[serde(rename = "2")]
    V2,
}

/// Kind-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSettings {
    KeyValue {
        context: Option<String>,
        version: KvVersion,
    },
    Database {
        /// Read `static-creds/{role}` instead of `creds/{role}`.
        static_role: bool,
        username_property: Option<String>,
        password_property: Option<String>,
    },
    RabbitMq {
        username_property: Option<String>,
        password_property: Option<String>,
    },
    Consul {
        token_property: Option<String>,
    },
    Aws {
        access_key_property: Option<String>,
        secret_key_property: Option<String>,
        session_token_property: Option<String>,
    },
}

impl BackendSettings {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::KeyValue { .. } => BackendKind::KeyValue,
            Self::Database { .. } => BackendKind::Database,
            Self::RabbitMq { .. } => BackendKind::RabbitMq,
            Self::Consul { .. } => BackendKind::Consul,
            Self::Aws { .. } => BackendKind::Aws,
        }
    }
}

/// One configured backend. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Name used in logs, errors and as the property source name.
    pub name: String,
    pub enabled: bool,
    /// Surface a missing or forbidden secret as an error instead of an empty layer.
    pub fail_fast: bool,
    /// Higher order wins on key collisions.
    pub order: i32,
    pub mount: Option<String>,
    pub role: Option<String>,
    pub settings: BackendSettings,
}

impl BackendDescriptor {
    fn new(name: impl Into<String>, mount: impl Into<String>, settings: BackendSettings) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            fail_fast: false,
            order: 0,
            mount: Some(mount.into()),
            role: None,
            settings,
        }
    }

    /// KV backend reading `context` from `mount`.
    pub fn key_value(
        name: impl Into<String>,
        mount: impl Into<String>,
        context: impl Into<String>,
        version: KvVersion,
    ) -> Self {
        Self::new(name, mount, BackendSettings::KeyValue { context: Some(context.into()), version })
    }

    pub fn database(name: impl Into<String>, mount: impl Into<String>, role: impl Into<String>) -> Self {
        Self::new(
            name,
            mount,
            BackendSettings::Database {
                static_role: false,
                username_property: None,
                password_property: None,
            },
        )
        .with_role(role)
    }

    pub fn rabbit_mq(name: impl Into<String>, mount: impl Into<String>, role: impl Into<String>) -> Self {
        Self::new(
            name,
            mount,
            BackendSettings::RabbitMq { username_property: None, password_property: None },
        )
        .with_role(role)
    }

    pub fn consul(name: impl Into<String>, mount: impl Into<String>, role: impl Into<String>) -> Self {
        Self::new(name, mount, BackendSettings::Consul { token_property: None }).with_role(role)
    }

    pub fn aws(name: impl Into<String>, mount: impl Into<String>, role: impl Into<String>) -> Self {
        Self::new(
            name,
            mount,
            BackendSettings::Aws {
                access_key_property: None,
                secret_key_property: None,
                session_token_property: None,
            },
        )
        .with_role(role)
    }

    pub fn kind(&self) -> BackendKind {
        self.settings.kind()
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_mount(mut self, mount: Option<String>) -> Self {
        self.mount = mount;
        self
    }

    pub fn with_settings(mut self, settings: BackendSettings) -> Self {
        self.settings = settings;
        self
    }
}
