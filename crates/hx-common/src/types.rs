//! Identity and handshake data types.
//!
//! Cache keys are namespaced per `(user_id, operation_kind)` so that a login
//! handshake and a registration handshake for the same user can never read
//! or overwrite each other's entries. The key derivation lives here, next to
//! the types, so every component builds keys exactly the same way.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The handshake flavor a cache entry belongs to.
///
/// Acts as the namespace tag in both the snapshot key and the token key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Login,
    Registration,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Login => "login",
            OperationKind::Registration => "registration",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(OperationKind::Login),
            "registration" => Ok(OperationKind::Registration),
            other => Err(format!("unknown operation kind: {other}")),
        }
    }
}

/// Transient identity data staged by the producer for the issuer.
///
/// Lives only inside the handshake window: written to the cache with a TTL,
/// read and removed by the token issuer, never persisted.
///
/// `Debug` redacts `email` so identity data does not leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    /// Opaque unique user identifier.
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    /// Account tier (e.g., "free", "premium").
    pub tier: String,
}

impl fmt::Debug for IdentitySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySnapshot")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("role", &self.role)
            .field("tier", &self.tier)
            .finish()
    }
}

/// Cache key for a signed token: `user:{user_id}:{operation_kind}`.
#[must_use]
pub fn token_cache_key(user_id: &str, kind: OperationKind) -> String {
    format!("user:{user_id}:{kind}")
}

/// Cache key for a staged identity snapshot: `snapshot:{user_id}:{operation_kind}`.
#[must_use]
pub fn snapshot_cache_key(user_id: &str, kind: OperationKind) -> String {
    format!("snapshot:{user_id}:{kind}")
}
