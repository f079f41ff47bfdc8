//! Session tokens and the session state machine.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::secrets::SecretString;

/// How a token came into existence. Only tokens obtained through a login flow
/// are revoked when the session shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    /// Issued by the store in response to a login request.
    Login,
    /// Supplied directly by configuration.
    Static,
}

/// A credential issued by the secret store.
///
/// `issued_at` is taken from the tokio clock so that lease arithmetic follows
/// paused time in tests. A zero `lease_duration` means the token does not expire.
#[derive(Debug, Clone)]
pub struct Token {
    value: SecretString,
    lease_duration: Duration,
    renewable: bool,
    issued_at: Instant,
    issued_at_utc: DateTime<Utc>,
    origin: TokenOrigin,
}

impl Token {
    pub fn new(
        value: impl Into<SecretString>,
        lease_duration: Duration,
        renewable: bool,
        origin: TokenOrigin,
    ) -> Self {
        Self {
            value: value.into(),
            lease_duration,
            renewable,
            issued_at: Instant::now(),
            issued_at_utc: Utc::now(),
            origin,
        }
    }

    /// Override the issue instant.
    pub fn with_issued_at(mut self, issued_at: Instant) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Same credential with a fresh lease, as returned by a renewal.
    pub fn renewed(&self, lease_duration: Duration, renewable: bool) -> Self {
        Self::new(self.value.clone(), lease_duration, renewable, self.origin)
    }

    pub fn value(&self) -> &SecretString {
        &self.value
    }

    pub fn lease_duration(&self) -> Duration {
        self.lease_duration
    }

    /// The store's renewable flag, regardless of lease.
    pub fn renewable_flag(&self) -> bool {
        self.renewable
    }

    /// Renewal only makes sense for renewable tokens with a finite lease.
    pub fn is_renewable(&self) -> bool {
        self.renewable && !self.lease_duration.is_zero()
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn issued_at_utc(&self) -> DateTime<Utc> {
        self.issued_at_utc
    }

    pub fn origin(&self) -> TokenOrigin {
        self.origin
    }

    /// `None` for tokens without a lease.
    pub fn expires_at(&self) -> Option<Instant> {
        if self.lease_duration.is_zero() {
            None
        } else {
            Some(self.issued_at + self.lease_duration)
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|expires_at| now >= expires_at)
    }

    /// Time left on the lease, `None` for tokens without a lease.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at().map(|expires_at| expires_at.saturating_duration_since(now))
    }
}

/// State of the current session. Published through a watch channel by the
/// [`SessionManager`](super::SessionManager).
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Valid(Arc<Token>),
    /// A renewal is in flight; the token is still usable.
    Renewing(Arc<Token>),
    Expired,
}

impl SessionState {
    pub fn token(&self) -> Option<&Arc<Token>> {
        match self {
            Self::Valid(token) | Self::Renewing(token) => Some(token),
            Self::Unauthenticated | Self::Expired => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Valid(_) => "valid",
            Self::Renewing(_) => "renewing",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
