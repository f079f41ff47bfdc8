//! Renewal timing.

use std::time::Duration;
use tokio::time::Instant;

use super::token::Token;

/// Minimum spacing between consecutive renewal attempts, whatever the policy says.
pub const RETRY_FLOOR: Duration = Duration::from_secs(1);

/// When to renew a token relative to its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    /// Turn scheduled renewal on or off.
    pub enabled: bool,
    /// Renew this long before the lease runs out.
    pub expiry_threshold: Duration,
    /// Never schedule a renewal sooner than this after issue, or after the previous attempt.
    pub min_renewal_interval: Duration,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            expiry_threshold: Duration::from_secs(5),
            min_renewal_interval: Duration::from_secs(1),
        }
    }
}

impl RenewalPolicy {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    /// `issued_at + max(lease - expiry_threshold, min_renewal_interval)`.
    ///
    /// `None` when the policy is disabled or the token cannot be renewed
    /// (non-renewable, or a zero lease).
    pub fn next_renewal_at(&self, token: &Token) -> Option<Instant> {
        if !self.enabled || !token.is_renewable() {
            return None;
        }
        let lead = token.lease_duration().saturating_sub(self.expiry_threshold);
        Some(token.issued_at() + lead.max(self.min_renewal_interval))
    }

    /// Spacing applied after an attempt before the next one may fire.
    pub fn retry_interval(&self) -> Duration {
        self.min_renewal_interval.max(RETRY_FLOOR)
    }
}
