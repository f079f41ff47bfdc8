//! Background token renewal.
//!
//! The scheduler watches the session state and sleeps until the fire time given by
//! [`RenewalPolicy::next_renewal_at`]. Any state change (a login from the request
//! path, a renewal, shutdown) wakes it up to recompute. Consecutive attempts are
//! spaced by at least [`RenewalPolicy::retry_interval`], so a store that keeps
//! failing is not hammered.
//!
//! When a renewal succeeds but the lease shrank to at or below the expiry threshold,
//! the token has hit its maximum TTL and the scheduler logs in again instead.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::manager::SessionManager;
use super::policy::RenewalPolicy;

/// How long [`RenewalHandle::shutdown`] waits for an in-flight attempt.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct RenewalScheduler {
    policy: RenewalPolicy,
    manager: Arc<SessionManager>,
}

impl RenewalScheduler {
    pub fn new(policy: RenewalPolicy, manager: Arc<SessionManager>) -> Self {
        Self { policy, manager }
    }

    pub fn policy(&self) -> &RenewalPolicy {
        &self.policy
    }

    /// Spawn the renewal task on the current runtime.
    pub fn start(self) -> RenewalHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        info!("Token renewal scheduler started");
        RenewalHandle { cancel, task }
    }

    async fn run(self, cancel: CancellationToken) {
        let mut updates = self.manager.subscribe();
        let mut last_attempt: Option<Instant> = None;

        loop {
            let fire_at = {
                let state = updates.borrow_and_update();
                state.token().and_then(|token| self.policy.next_renewal_at(token))
            }
            .map(|at| match last_attempt {
                Some(previous) => at.max(previous + self.policy.retry_interval()),
                None => at,
            });

            match fire_at {
                Some(at) => {
                    let in_ms = at.saturating_duration_since(Instant::now()).as_millis() as u64;
                    debug!(in_ms = in_ms, "Next token renewal scheduled");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        changed = updates.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = time::sleep_until(at) => {
                            last_attempt = Some(Instant::now());
                            self.attempt().await;
                        }
                    }
                }
                None => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        changed = updates.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        debug!("Token renewal scheduler stopped");
    }

    async fn attempt(&self) {
        let before = self.manager.state().token().map(|token| token.lease_duration());

        match self.manager.renew().await {
            Ok(token) => {
                let shrinking = before.is_some_and(|lease| token.lease_duration() < lease);
                if shrinking && token.lease_duration() <= self.policy.expiry_threshold {
                    info!(
                        lease_secs = token.lease_duration().as_secs(),
                        "Token is reaching its maximum TTL, logging in again"
                    );
                    if let Err(e) = self.manager.login().await {
                        warn!(error = %e, "Re-authentication after renewal failed");
                    }
                }
            }
            Err(e) => warn!(error = %e, "Scheduled token renewal failed"),
        }
    }
}

/// Handle to a running [`RenewalScheduler`]. Dropping it cancels the task.
#[derive(Debug)]
pub struct RenewalHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RenewalHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop scheduling and wait up to [`DEFAULT_SHUTDOWN_GRACE`] for the task to finish.
    pub async fn shutdown(self) {
        self.shutdown_with_grace(DEFAULT_SHUTDOWN_GRACE).await
    }

    /// Stop scheduling; abort the task if it does not finish within `grace`.
    pub async fn shutdown_with_grace(mut self, grace: Duration) {
        self.cancel.cancel();
        if time::timeout(grace, &mut self.task).await.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "Renewal task did not stop in time, aborting");
            self.task.abort();
        }
    }
}

impl Drop for RenewalHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
