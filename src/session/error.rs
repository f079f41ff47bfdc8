use thiserror::Error;

use crate::secrets::StoreError;

/// Why a renewal did not produce a fresh lease.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenewalError {
    /// There is no token to renew.
    #[error("No active session to renew")]
    NoSession,

    /// The store rejected or failed the renewal, including timeouts.
    #[error("Token renewal failed: {0}")]
    Store(#[from] StoreError),
}
