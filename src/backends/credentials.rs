//! Resolution for backends that issue credentials for a role.
//!
//! All of these read `{mount}/creds/{role}` (database static roles read
//! `{mount}/static-creds/{role}`) and rename the payload keys to application
//! property names.

use super::descriptor::{BackendDescriptor, BackendSettings};
use super::metadata::{PropertyTransform, SecretBackendMetadata};
use super::resolve::{property_or, require, settings_mismatch};
use crate::errors::Result;

pub const DATABASE_USERNAME_PROPERTY: &str = "spring.datasource.username";
pub const DATABASE_PASSWORD_PROPERTY: &str = "spring.datasource.password";
pub const RABBITMQ_USERNAME_PROPERTY: &str = "spring.rabbitmq.username";
pub const RABBITMQ_PASSWORD_PROPERTY: &str = "spring.rabbitmq.password";
pub const CONSUL_TOKEN_PROPERTY: &str = "spring.cloud.consul.token";
pub const AWS_ACCESS_KEY_PROPERTY: &str = "cloud.aws.credentials.accessKey";
pub const AWS_SECRET_KEY_PROPERTY: &str = "cloud.aws.credentials.secretKey";
pub const AWS_SESSION_TOKEN_PROPERTY: &str = "cloud.aws.credentials.sessionToken";

fn creds_path(descriptor: &BackendDescriptor, segment: &str) -> Result<String> {
    let mount = require(descriptor, "mount", descriptor.mount.as_deref())?;
    let role = require(descriptor, "role", descriptor.role.as_deref())?;
    Ok(format!("{}/{}/{}", mount, segment, role))
}

fn metadata(descriptor: &BackendDescriptor, path: String, transform: PropertyTransform) -> SecretBackendMetadata {
    SecretBackendMetadata::new(path, descriptor.order, descriptor.name.clone()).with_transform(transform)
}

pub fn resolve_database(descriptor: &BackendDescriptor) -> Result<SecretBackendMetadata> {
    let BackendSettings::Database { static_role, username_property, password_property } =
        &descriptor.settings
    else {
        return Err(settings_mismatch(descriptor, "database"));
    };

    let segment = if *static_role { "static-creds" } else { "creds" };
    let path = creds_path(descriptor, segment)?;
    let username =
        property_or(descriptor, "username_property", username_property.as_deref(), DATABASE_USERNAME_PROPERTY)?;
    let password =
        property_or(descriptor, "password_property", password_property.as_deref(), DATABASE_PASSWORD_PROPERTY)?;
    let transform = PropertyTransform::new().with_mapping("username", username).with_mapping("password", password);
    Ok(metadata(descriptor, path, transform))
}

pub fn resolve_rabbit_mq(descriptor: &BackendDescriptor) -> Result<SecretBackendMetadata> {
    let BackendSettings::RabbitMq { username_property, password_property } = &descriptor.settings else {
        return Err(settings_mismatch(descriptor, "rabbit_mq"));
    };

    let path = creds_path(descriptor, "creds")?;
    let username =
        property_or(descriptor, "username_property", username_property.as_deref(), RABBITMQ_USERNAME_PROPERTY)?;
    let password =
        property_or(descriptor, "password_property", password_property.as_deref(), RABBITMQ_PASSWORD_PROPERTY)?;
    let transform = PropertyTransform::new().with_mapping("username", username).with_mapping("password", password);
    Ok(metadata(descriptor, path, transform))
}

pub fn resolve_consul(descriptor: &BackendDescriptor) -> Result<SecretBackendMetadata> {
    let BackendSettings::Consul { token_property } = &descriptor.settings else {
        return Err(settings_mismatch(descriptor, "consul"));
    };

    let path = creds_path(descriptor, "creds")?;
    let token = property_or(descriptor, "token_property", token_property.as_deref(), CONSUL_TOKEN_PROPERTY)?;
    Ok(metadata(descriptor, path, PropertyTransform::new().with_mapping("token", token)))
}

pub fn resolve_aws(descriptor: &BackendDescriptor) -> Result<SecretBackendMetadata> {
    let BackendSettings::Aws { access_key_property, secret_key_property, session_token_property } =
        &descriptor.settings
    else {
        return Err(settings_mismatch(descriptor, "aws"));
    };

    let path = creds_path(descriptor, "creds")?;
    let access_key =
        property_or(descriptor, "access_key_property", access_key_property.as_deref(), AWS_ACCESS_KEY_PROPERTY)?;
    let secret_key =
        property_or(descriptor, "secret_key_property", secret_key_property.as_deref(), AWS_SECRET_KEY_PROPERTY)?;
    let session_token = property_or(
        descriptor,
        "session_token_property",
        session_token_property.as_deref(),
        AWS_SESSION_TOKEN_PROPERTY,
    )?;
    let transform = PropertyTransform::new()
        .with_mapping("access_key", access_key)
        .with_mapping("secret_key", secret_key)
        .with_mapping("security_token", session_token);
    Ok(metadata(descriptor, path, transform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_database_dynamic_and_static_paths() {
        let dynamic = BackendDescriptor::database("mysql", "mysql", "readonly");
        let metadata = resolve_database(&dynamic).unwrap();
        assert_eq!(metadata.path, "mysql/creds/readonly");
        let transform = metadata.transform.unwrap();
        assert_eq!(transform.target("username"), Some(DATABASE_USERNAME_PROPERTY));
        assert_eq!(transform.target("password"), Some(DATABASE_PASSWORD_PROPERTY));

        let static_role = dynamic.clone().with_settings(BackendSettings::Database {
            static_role: true,
            username_property: Some("app.db.user".to_string()),
            password_property: None,
        });
        let metadata = resolve_database(&static_role).unwrap();
        assert_eq!(metadata.path, "mysql/static-creds/readonly");
        let transform = metadata.transform.unwrap();
        assert_eq!(transform.target("username"), Some("app.db.user"));
        assert_eq!(transform.target("password"), Some(DATABASE_PASSWORD_PROPERTY));
    }

    #[test]
    fn test_missing_role_is_configuration_error() {
        let mut descriptor = BackendDescriptor::rabbit_mq("rabbitmq", "rabbitmq", "x");
        descriptor.role = None;

        match resolve_rabbit_mq(&descriptor).unwrap_err() {
            Error::Configuration { field, .. } => assert_eq!(field.as_deref(), Some("role")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_consul_and_aws_defaults() {
        let consul = resolve_consul(&BackendDescriptor::consul("consul", "consul", "app")).unwrap();
        assert_eq!(consul.path, "consul/creds/app");
        assert_eq!(consul.transform.unwrap().target("token"), Some(CONSUL_TOKEN_PROPERTY));

        let aws = resolve_aws(&BackendDescriptor::aws("aws", "aws", "deploy")).unwrap();
        assert_eq!(aws.path, "aws/creds/deploy");
        let transform = aws.transform.unwrap();
        assert_eq!(transform.target("access_key"), Some(AWS_ACCESS_KEY_PROPERTY));
        assert_eq!(transform.target("security_token"), Some(AWS_SESSION_TOKEN_PROPERTY));
    }

    #[test]
    fn test_blank_target_property_is_configuration_error() {
        let descriptor = BackendDescriptor::database("mysql", "mysql", "readonly").with_settings(
            BackendSettings::Database {
                static_role: false,
                username_property: Some("   ".to_string()),
                password_property: Some(String::new()),
            },
        );

        match resolve_database(&descriptor).unwrap_err() {
            Error::Configuration { field, .. } => assert_eq!(field.as_deref(), Some("username_property")),
            other => panic!("unexpected error: {:?}", other),
        }

        let consul = BackendDescriptor::consul("consul", "consul", "app")
            .with_settings(BackendSettings::Consul { token_property: Some(" ".to_string()) });
        match resolve_consul(&consul).unwrap_err() {
            Error::Configuration { field, .. } => assert_eq!(field.as_deref(), Some("token_property")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_settings_rejected() {
        let descriptor = BackendDescriptor::consul("consul", "consul", "app");
        assert!(resolve_database(&descriptor).is_err());
    }
}
