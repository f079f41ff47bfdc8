//! Session lifecycle: token acquisition, renewal and revocation.
//!
//! - [`SessionManager`] owns the current [`Token`] and serializes logins and renewals
//! - [`RenewalScheduler`] renews ahead of expiry according to a [`RenewalPolicy`]
//!
//! ```rust,ignore
//! let session = Arc::new(SessionManager::new(client, strategy));
//! session.login().await?;
//! let renewal = RenewalScheduler::new(RenewalPolicy::default(), session.clone()).start();
//!
//! let token = session.get_token().await?;
//!
//! renewal.shutdown().await;
//! session.shutdown(true).await;
//! ```

pub mod error;
pub mod manager;
pub mod policy;
pub mod scheduler;
pub mod token;

pub use error::RenewalError;
pub use manager::{SessionManager, SessionOptions, DEFAULT_OPERATION_TIMEOUT};
pub use policy::RenewalPolicy;
pub use scheduler::{RenewalHandle, RenewalScheduler, DEFAULT_SHUTDOWN_GRACE};
pub use token::{SessionState, Token, TokenOrigin};
