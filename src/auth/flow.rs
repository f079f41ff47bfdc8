//! Login requests produced by authentication strategies.

use serde_json::{Map, Value};
use std::fmt;

use crate::secrets::SecretString;

/// What a client must do to obtain a token.
#[derive(Clone)]
pub enum LoginFlow {
    /// A token supplied up front. The client verifies it with a self-lookup
    /// to learn its lease and renewability.
    Static { token: SecretString },
    /// POST `body` to `path` (relative to the API root, e.g. `auth/approle/login`).
    Login {
        method: &'static str,
        path: String,
        body: Map<String, Value>,
    },
}

impl LoginFlow {
    pub fn login(method: &'static str, path: impl Into<String>, body: Map<String, Value>) -> Self {
        Self::Login { method, path: path.into(), body }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Static { .. } => "token",
            Self::Login { method, .. } => *method,
        }
    }
}

// Login bodies carry credentials, only their keys are printed.
impl fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { token } => f.debug_struct("Static").field("token", token).finish(),
            Self::Login { method, path, body } => f
                .debug_struct("Login")
                .field("method", method)
                .field("path", path)
                .field("body_keys", &body.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}
