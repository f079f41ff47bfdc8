//! In-process secret store for development and tests.
//!
//! Behaves like a Vault server with a fixed lease policy. Failures and latency
//! can be scripted per operation, and every call is counted so callers can
//! assert on how the store was used.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::client::{SecretPayload, SecretStoreClient};
use super::error::{Result, StoreError};
use crate::auth::LoginFlow;
use crate::session::{Token, TokenOrigin};

#[derive(Debug)]
struct Inner {
    secrets: HashMap<String, SecretPayload>,
    lease: Duration,
    renewable: bool,
    renewal_lease: Option<Duration>,
    login_delay: Duration,
    renewal_delay: Duration,
    login_failures: VecDeque<StoreError>,
    renewal_failures: VecDeque<StoreError>,
    read_failures: HashMap<String, StoreError>,
    read_delays: HashMap<String, Duration>,
    revoked: HashSet<String>,
    logins: usize,
    renewals: usize,
    revocations: Vec<String>,
    reads: Vec<String>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            secrets: HashMap::new(),
            lease: Duration::from_secs(60),
            renewable: true,
            renewal_lease: None,
            login_delay: Duration::ZERO,
            renewal_delay: Duration::ZERO,
            login_failures: VecDeque::new(),
            renewal_failures: VecDeque::new(),
            read_failures: HashMap::new(),
            read_delays: HashMap::new(),
            revoked: HashSet::new(),
            logins: 0,
            renewals: 0,
            revocations: Vec::new(),
            reads: Vec::new(),
        }
    }
}

/// A [`SecretStoreClient`] that keeps everything in memory.
///
/// Issued tokens are named `mem-token-{n}`. Revoked tokens are rejected with
/// `Unauthorized` on later calls.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    inner: Mutex<Inner>,
}

impl InMemorySecretStore {
    /// Store issuing renewable tokens with a 60 second lease.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lease and renewability of tokens issued by login.
    pub fn with_lease(self, lease: Duration, renewable: bool) -> Self {
        {
            let mut inner = self.lock();
            inner.lease = lease;
            inner.renewable = renewable;
        }
        self
    }

    /// Lease granted by renewals, defaults to the login lease.
    pub fn with_renewal_lease(self, lease: Duration) -> Self {
        self.lock().renewal_lease = Some(lease);
        self
    }

    pub fn with_secret(self, path: impl Into<String>, data: Value) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&self, path: impl Into<String>, data: Value) {
        self.lock().secrets.insert(path.into(), SecretPayload::from_json(data));
    }

    pub fn insert_payload(&self, path: impl Into<String>, payload: SecretPayload) {
        self.lock().secrets.insert(path.into(), payload);
    }

    pub fn remove(&self, path: &str) {
        self.lock().secrets.remove(path);
    }

    /// Fail the next login with `error`. Calls queue up.
    pub fn fail_next_login(&self, error: StoreError) {
        self.lock().login_failures.push_back(error);
    }

    /// Fail the next `count` renewals with `error`.
    pub fn fail_renewals(&self, count: usize, error: StoreError) {
        let mut inner = self.lock();
        inner.renewal_failures.extend(std::iter::repeat(error).take(count));
    }

    /// Fail every read of `path` with `error`.
    pub fn fail_reads(&self, path: impl Into<String>, error: StoreError) {
        self.lock().read_failures.insert(path.into(), error);
    }

    pub fn delay_reads(&self, path: impl Into<String>, delay: Duration) {
        self.lock().read_delays.insert(path.into(), delay);
    }

    pub fn delay_logins(&self, delay: Duration) {
        self.lock().login_delay = delay;
    }

    pub fn delay_renewals(&self, delay: Duration) {
        self.lock().renewal_delay = delay;
    }

    pub fn login_count(&self) -> usize {
        self.lock().logins
    }

    pub fn renewal_count(&self) -> usize {
        self.lock().renewals
    }

    /// Values of revoked tokens, in revocation order.
    pub fn revoked_tokens(&self) -> Vec<String> {
        self.lock().revocations.clone()
    }

    /// Paths read so far, in call order.
    pub fn read_paths(&self) -> Vec<String> {
        self.lock().reads.clone()
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads.len()
    }

    fn ensure_not_revoked(inner: &Inner, token: &Token) -> Result<()> {
        if inner.revoked.contains(token.value().expose_secret()) {
            return Err(StoreError::unauthorized("token has been revoked"));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStoreClient for InMemorySecretStore {
    async fn login(&self, flow: &LoginFlow) -> Result<Token> {
        let delay = self.lock().login_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        inner.logins += 1;
        if let Some(error) = inner.login_failures.pop_front() {
            return Err(error);
        }

        let token = match flow {
            LoginFlow::Static { token } => {
                if inner.revoked.contains(token.expose_secret()) {
                    return Err(StoreError::unauthorized("token has been revoked"));
                }
                Token::new(token.clone(), inner.lease, inner.renewable, TokenOrigin::Static)
            }
            LoginFlow::Login { .. } => Token::new(
                format!("mem-token-{}", inner.logins),
                inner.lease,
                inner.renewable,
                TokenOrigin::Login,
            ),
        };
        Ok(token)
    }

    async fn renew(&self, token: &Token) -> Result<Token> {
        let delay = self.lock().renewal_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        inner.renewals += 1;
        if let Some(error) = inner.renewal_failures.pop_front() {
            return Err(error);
        }
        Self::ensure_not_revoked(&inner, token)?;
        if !token.renewable_flag() {
            return Err(StoreError::invalid_request("token is not renewable"));
        }

        let lease = inner.renewal_lease.unwrap_or(inner.lease);
        Ok(token.renewed(lease, inner.renewable))
    }

    async fn revoke(&self, token: &Token) -> Result<()> {
        let mut inner = self.lock();
        let value = token.value().expose_secret().to_string();
        inner.revoked.insert(value.clone());
        inner.revocations.push(value);
        Ok(())
    }

    async fn read(&self, path: &str, token: &Token) -> Result<Option<SecretPayload>> {
        let delay = {
            let mut inner = self.lock();
            inner.reads.push(path.to_string());
            inner.read_delays.get(path).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock();
        if let Some(error) = inner.read_failures.get(path) {
            return Err(error.clone());
        }
        Self::ensure_not_revoked(&inner, token)?;
        Ok(inner.secrets.get(path).cloned())
    }

    async fn write(&self, path: &str, token: &Token, data: &Map<String, Value>) -> Result<()> {
        let mut inner = self.lock();
        Self::ensure_not_revoked(&inner, token)?;
        inner.secrets.insert(path.to_string(), SecretPayload::new(data.clone()));
        Ok(())
    }
}
