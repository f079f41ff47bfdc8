//! Startup and shutdown sequence
//!
//! Wires the configured pieces together in order:
//! 1. Build the secret store client
//! 2. Log in eagerly so credential problems surface at startup
//! 3. Start background renewal when enabled
//! 4. Read every configured backend into the initial property snapshot
//!
//! [`Runtime::shutdown`] undoes this: the scheduler stops first so no renewal races
//! the revocation, then the session ends.

use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregator::{ConfigAggregator, Properties, PropertySource};
use crate::backends::BackendMetadataRegistry;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::secrets::{SecretStoreClient, VaultHttpClient};
use crate::session::{RenewalHandle, RenewalScheduler, SessionManager, DEFAULT_SHUTDOWN_GRACE};

pub struct Runtime {
    session: Arc<SessionManager>,
    properties: Arc<PropertySource>,
    renewal: Option<RenewalHandle>,
    revoke_on_shutdown: bool,
}

impl Runtime {
    /// Start against the Vault server described by `config.vault`.
    pub async fn start(config: &AppConfig) -> Result<Self> {
        let client = VaultHttpClient::new(&config.vault)?;
        info!(vault_address = %client.address(), "Secret store client created");
        Self::start_with_client(config, Arc::new(client)).await
    }

    /// Start with an existing client. The default registry resolves backends.
    pub async fn start_with_client(config: &AppConfig, client: Arc<dyn SecretStoreClient>) -> Result<Self> {
        Self::start_with_registry(config, client, BackendMetadataRegistry::new()).await
    }

    pub async fn start_with_registry(
        config: &AppConfig,
        client: Arc<dyn SecretStoreClient>,
        registry: BackendMetadataRegistry,
    ) -> Result<Self> {
        let strategy = config.authentication.to_strategy()?;
        let session = Arc::new(SessionManager::with_options(client.clone(), strategy, config.session.options()));

        session.login().await?;

        let policy = config.session.renewal.policy();
        let renewal = policy.enabled.then(|| RenewalScheduler::new(policy, session.clone()).start());

        let descriptors = config.backends.descriptors();
        let aggregator = ConfigAggregator::new(client, session.clone(), Arc::new(registry))
            .with_options(config.backends.aggregator_options());
        let properties = Arc::new(PropertySource::new(aggregator, descriptors));

        let runtime = Self { session, properties, renewal, revoke_on_shutdown: config.session.revoke_on_shutdown };
        if let Err(e) = runtime.properties.refresh().await {
            runtime.shutdown().await;
            return Err(e);
        }

        info!(
            backends = runtime.properties.descriptors().len(),
            renewal_enabled = runtime.renewal.is_some(),
            "Runtime started"
        );
        Ok(runtime)
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn properties(&self) -> &Arc<PropertySource> {
        &self.properties
    }

    /// Re-read every backend.
    pub async fn refresh(&self) -> Result<Arc<Properties>> {
        self.properties.refresh().await
    }

    pub async fn shutdown(mut self) {
        if let Some(renewal) = self.renewal.take() {
            renewal.shutdown_with_grace(DEFAULT_SHUTDOWN_GRACE).await;
        }
        self.session.shutdown(self.revoke_on_shutdown).await;
        if !self.revoke_on_shutdown {
            warn!("Session token left active on shutdown");
        }
        info!("Runtime stopped");
    }
}
