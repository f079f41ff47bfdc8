//! Session manager: owns the current token and its state transitions.
//!
//! ```text
//! Unauthenticated --login--> Valid --renew--> Renewing --ok--> Valid
//!                                                      --err, lease left--> Valid (same token)
//!                                                      --err, expired--> Expired
//! Expired --login--> Valid
//! ```
//!
//! The current state is published through a `tokio::sync::watch` channel, so
//! [`SessionManager::get_token`] reads a snapshot without waiting on renewals.
//! Logins and renewals are serialized by an async mutex; callers that arrive while
//! a login is in flight wait for it and share its result.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, instrument, warn, Instrument};

use super::error::RenewalError;
use super::token::{SessionState, Token, TokenOrigin};
use crate::auth::AuthenticationStrategy;
use crate::errors::{Error, Result};
use crate::observability::metrics;
use crate::secrets::{SecretStoreClient, StoreError};
use crate::session_span;

/// Default deadline for a single login, renewal or revocation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub operation_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { operation_timeout: DEFAULT_OPERATION_TIMEOUT }
    }
}

#[derive(Debug)]
pub struct SessionManager {
    client: Arc<dyn SecretStoreClient>,
    strategy: AuthenticationStrategy,
    options: SessionOptions,
    state: watch::Sender<SessionState>,
    in_flight: Mutex<()>,
}

impl SessionManager {
    pub fn new(client: Arc<dyn SecretStoreClient>, strategy: AuthenticationStrategy) -> Self {
        Self::with_options(client, strategy, SessionOptions::default())
    }

    pub fn with_options(
        client: Arc<dyn SecretStoreClient>,
        strategy: AuthenticationStrategy,
        options: SessionOptions,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self { client, strategy, options, state, in_flight: Mutex::new(()) }
    }

    pub fn client(&self) -> &Arc<dyn SecretStoreClient> {
        &self.client
    }

    pub fn strategy(&self) -> &AuthenticationStrategy {
        &self.strategy
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Return a usable token, logging in first if there is none or it has expired.
    ///
    /// Never blocks on an in-flight renewal: while renewing, the previous token is returned.
    pub async fn get_token(&self) -> Result<Arc<Token>> {
        if let Some(token) = self.usable_token() {
            return Ok(token);
        }

        let _guard = self.in_flight.lock().await;
        // Another caller may have logged in while we waited.
        if let Some(token) = self.usable_token() {
            return Ok(token);
        }
        self.expire_stale_token();
        self.login_locked().await
    }

    /// Force a fresh login, replacing the current token.
    pub async fn login(&self) -> Result<Arc<Token>> {
        let _guard = self.in_flight.lock().await;
        self.login_locked().await
    }

    /// Renew the current token.
    ///
    /// On failure the current token is kept while its lease lasts; once it has
    /// expired the session moves to `Expired` and the next [`get_token`](Self::get_token)
    /// logs in again.
    #[instrument(skip(self))]
    pub async fn renew(&self) -> std::result::Result<Arc<Token>, RenewalError> {
        let _guard = self.in_flight.lock().await;

        let current = self.state.borrow().token().cloned().ok_or(RenewalError::NoSession)?;
        if !current.is_renewable() {
            debug!("Token is not renewable, skipping renewal");
            return Ok(current);
        }

        self.publish(SessionState::Renewing(current.clone()));
        let timeout = self.options.operation_timeout;
        let outcome = time::timeout(timeout, self.client.renew(&current))
            .await
            .unwrap_or_else(|_| Err(StoreError::timed_out_after("renew", timeout)));

        match outcome {
            Ok(renewed) => {
                let renewed = Arc::new(renewed);
                self.publish(SessionState::Valid(renewed.clone()));
                metrics::record_renewal("success");
                info!(lease_secs = renewed.lease_duration().as_secs(), "Token renewed");
                Ok(renewed)
            }
            Err(e) => {
                metrics::record_renewal("failure");
                if current.is_expired(Instant::now()) {
                    self.publish(SessionState::Expired);
                    error!(error = %e, "Token renewal failed and the lease has expired");
                } else {
                    self.publish(SessionState::Valid(current.clone()));
                    warn!(
                        error = %e,
                        remaining_secs = current.remaining(Instant::now()).map(|d| d.as_secs()),
                        "Token renewal failed, keeping current token until it expires"
                    );
                }
                Err(RenewalError::Store(e))
            }
        }
    }

    /// End the session. With `revoke`, a token obtained through login is revoked on
    /// the store; statically configured tokens are never revoked.
    pub async fn shutdown(&self, revoke: bool) {
        let _guard = self.in_flight.lock().await;
        let previous = self.state.send_replace(SessionState::Unauthenticated);
        metrics::set_session_state(&SessionState::Unauthenticated);

        let Some(token) = previous.token() else {
            return;
        };
        if !revoke || token.origin() != TokenOrigin::Login {
            debug!(origin = ?token.origin(), "Session closed without revocation");
            return;
        }
        self.revoke_token(token).await;
    }

    /// Best-effort revocation bounded by the operation timeout. Failures are logged.
    async fn revoke_token(&self, token: &Token) {
        let timeout = self.options.operation_timeout;
        let request = self.client.revoke(token).instrument(session_span!("revoke"));
        match time::timeout(timeout, request).await {
            Ok(Ok(())) => info!("Session token revoked"),
            Ok(Err(e)) => warn!(error = %e, "Failed to revoke session token"),
            Err(_) => warn!(timeout_ms = timeout.as_millis() as u64, "Timed out revoking session token"),
        }
    }

    fn usable_token(&self) -> Option<Arc<Token>> {
        let state = self.state.borrow();
        state.token().filter(|token| !token.is_expired(Instant::now())).cloned()
    }

    fn expire_stale_token(&self) {
        let stale = self.state.borrow().token().is_some();
        if stale {
            info!("Session token expired");
            self.publish(SessionState::Expired);
        }
    }

    async fn login_locked(&self) -> Result<Arc<Token>> {
        let method = self.strategy.method_name();
        debug!(method = method, "Authenticating with secret store");

        let superseded = self.state.borrow().token().cloned();
        let timeout = self.options.operation_timeout;
        let login = self.strategy.login(self.client.as_ref()).instrument(session_span!("login", method = method));
        let outcome = match time::timeout(timeout, login).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::authentication_with_source(
                format!("{} login timed out", method),
                StoreError::timed_out_after("login", timeout),
            )),
        };

        match outcome {
            Ok(token) => {
                let token = Arc::new(token);
                self.publish(SessionState::Valid(token.clone()));
                metrics::record_login("success");
                info!(
                    method = method,
                    lease_secs = token.lease_duration().as_secs(),
                    renewable = token.renewable_flag(),
                    issued_at = %token.issued_at_utc(),
                    "Session established"
                );
                // A replaced login token stays valid on the server until revoked.
                if let Some(previous) = superseded {
                    if previous.origin() == TokenOrigin::Login && previous.value() != token.value() {
                        self.revoke_token(&previous).await;
                    }
                }
                Ok(token)
            }
            Err(e) => {
                metrics::record_login("failure");
                error!(method = method, error = %e, "Login failed");
                Err(e)
            }
        }
    }

    fn publish(&self, state: SessionState) {
        metrics::set_session_state(&state);
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{InMemorySecretStore, SecretString};
    use tokio_test::{assert_pending, assert_ready_ok, task};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn approle() -> AuthenticationStrategy {
        AuthenticationStrategy::AppRole {
            mount: "approle".to_string(),
            role_id: "role".to_string(),
            secret_id: Some(SecretString::new("secret")),
        }
    }

    fn manager(store: Arc<InMemorySecretStore>) -> SessionManager {
        SessionManager::new(store, approle())
    }

    #[tokio::test]
    async fn test_get_token_logs_in_once() {
        let store = Arc::new(InMemorySecretStore::new());
        let session = manager(store.clone());

        let first = session.get_token().await.unwrap();
        let second = session.get_token().await.unwrap();

        assert_eq!(first.value(), second.value());
        assert_eq!(store.login_count(), 1);
        assert!(matches!(session.state(), SessionState::Valid(_)));
    }

    #[tokio::test]
    async fn test_concurrent_first_use_shares_one_login() {
        let store = Arc::new(InMemorySecretStore::new());
        store.delay_logins(Duration::from_millis(20));
        let session = Arc::new(manager(store.clone()));

        let calls = (0..8).map(|_| {
            let session = session.clone();
            tokio::spawn(async move { session.get_token().await })
        });
        for handle in futures::future::join_all(calls).await {
            handle.unwrap().unwrap();
        }

        assert_eq!(store.login_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_login_is_authentication_error() {
        let store = Arc::new(InMemorySecretStore::new());
        store.fail_next_login(StoreError::unauthorized("invalid role_id"));
        let session = manager(store);

        let error = session.get_token().await.unwrap_err();
        assert!(matches!(error, Error::Authentication { .. }));
        assert!(matches!(session.state(), SessionState::Unauthenticated));
    }

    #[tokio::test]
    async fn test_renew_without_session() {
        let session = manager(Arc::new(InMemorySecretStore::new()));
        assert_eq!(session.renew().await.unwrap_err(), RenewalError::NoSession);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_renewal_keeps_token_until_expiry() {
        let store = Arc::new(InMemorySecretStore::new().with_lease(Duration::from_secs(30), true));
        let session = manager(store.clone());
        let original = session.get_token().await.unwrap();

        store.fail_renewals(3, StoreError::unavailable("sealed"));
        for _ in 0..3 {
            time::advance(Duration::from_secs(5)).await;
            assert!(session.renew().await.is_err());
            assert_eq!(session.get_token().await.unwrap().value(), original.value());
        }
        assert_eq!(store.login_count(), 1);

        time::advance(Duration::from_secs(20)).await;
        let replacement = session.get_token().await.unwrap();
        assert_ne!(replacement.value(), original.value());
        assert_eq!(store.login_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_failure_after_expiry_moves_to_expired() {
        let store = Arc::new(InMemorySecretStore::new().with_lease(Duration::from_secs(10), true));
        let session = manager(store.clone());
        session.get_token().await.unwrap();

        time::advance(Duration::from_secs(11)).await;
        store.fail_renewals(1, StoreError::unauthorized("token expired"));

        assert!(session.renew().await.is_err());
        assert!(matches!(session.state(), SessionState::Expired));
    }

    #[tokio::test]
    async fn test_non_renewable_token_is_not_sent_for_renewal() {
        let store = Arc::new(InMemorySecretStore::new().with_lease(Duration::from_secs(60), false));
        let session = manager(store.clone());
        let token = session.get_token().await.unwrap();

        let returned = session.renew().await.unwrap();
        assert_eq!(returned.value(), token.value());
        assert_eq!(store.renewal_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_timeout_is_authentication_error() {
        let store = Arc::new(InMemorySecretStore::new());
        store.delay_logins(Duration::from_secs(60));
        let session = SessionManager::with_options(
            store,
            approle(),
            SessionOptions { operation_timeout: Duration::from_secs(1) },
        );

        let error = session.get_token().await.unwrap_err();
        assert!(matches!(error, Error::Authentication { source: Some(StoreError::Timeout { .. }), .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_token_during_renewal_returns_previous_token() {
        let store = Arc::new(InMemorySecretStore::new().with_lease(Duration::from_secs(60), true));
        store.delay_renewals(Duration::from_secs(5));
        let session = Arc::new(manager(store.clone()));
        let original = session.get_token().await.unwrap();

        let renewal = tokio::spawn({
            let session = session.clone();
            async move { session.renew().await }
        });
        settle().await;
        assert!(matches!(session.state(), SessionState::Renewing(_)));

        let mut get = task::spawn(session.get_token());
        let token = assert_ready_ok!(get.poll());
        assert_eq!(token.value(), original.value());

        renewal.await.unwrap().unwrap();
        assert_eq!(store.renewal_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_token_past_expiry_waits_for_renewal() {
        let store = Arc::new(InMemorySecretStore::new().with_lease(Duration::from_secs(10), true));
        store.delay_renewals(Duration::from_secs(5));
        let session = Arc::new(manager(store.clone()));
        session.get_token().await.unwrap();

        time::advance(Duration::from_secs(8)).await;
        let renewal = tokio::spawn({
            let session = session.clone();
            async move { session.renew().await }
        });
        settle().await;
        assert!(matches!(session.state(), SessionState::Renewing(_)));

        time::advance(Duration::from_secs(3)).await;
        let mut get = task::spawn(session.get_token());
        assert_pending!(get.poll());

        renewal.await.unwrap().unwrap();
        assert!(get.is_woken());
        let token = assert_ready_ok!(get.poll());
        assert!(!token.is_expired(Instant::now()));
        assert_eq!(store.login_count(), 1);
        assert_eq!(store.renewal_count(), 1);
    }

    #[tokio::test]
    async fn test_relogin_revokes_superseded_token() {
        let store = Arc::new(InMemorySecretStore::new());
        let session = manager(store.clone());
        session.get_token().await.unwrap();

        let replacement = session.login().await.unwrap();
        assert_eq!(replacement.value().expose_secret(), "mem-token-2");
        assert_eq!(store.revoked_tokens(), vec!["mem-token-1".to_string()]);

        let static_store = Arc::new(InMemorySecretStore::new());
        let static_session = SessionManager::new(
            static_store.clone(),
            AuthenticationStrategy::Token { token: SecretString::new("s.static") },
        );
        static_session.get_token().await.unwrap();
        static_session.login().await.unwrap();
        assert!(static_store.revoked_tokens().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_revokes_login_tokens_only() {
        let store = Arc::new(InMemorySecretStore::new());
        let session = manager(store.clone());
        session.get_token().await.unwrap();
        session.shutdown(true).await;
        assert_eq!(store.revoked_tokens(), vec!["mem-token-1".to_string()]);
        assert!(matches!(session.state(), SessionState::Unauthenticated));

        let static_store = Arc::new(InMemorySecretStore::new());
        let static_session = SessionManager::new(
            static_store.clone(),
            AuthenticationStrategy::Token { token: SecretString::new("s.static") },
        );
        static_session.get_token().await.unwrap();
        static_session.shutdown(true).await;
        assert!(static_store.revoked_tokens().is_empty());
    }
}
