//! # Error Handling
//!
//! Crate-wide error type. Secret store transport errors live in [`crate::secrets::StoreError`]
//! and renewal failures in [`crate::session::RenewalError`]; both convert into [`Error`].

pub mod types;

pub use types::{Error, Result};
