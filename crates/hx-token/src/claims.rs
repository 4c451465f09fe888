//! JWT claims carried by a handshake token.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity claims embedded in a signed token.
///
/// `Debug` redacts `sub` and `email` so identity material does not leak
/// through logs or error output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the opaque user id.
    pub sub: String,
    pub username: String,
    pub email: String,
    pub role: String,
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("role", &self.role)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Claims {
        Claims {
            sub: "u-42".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: "user".to_string(),
            exp: 1_900_000_000,
            iat: 1_899_996_400,
        }
    }

    #[test]
    fn test_debug_redacts_identity_fields() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("u-42"));
        assert!(!debug.contains("alice@example.com"));
        assert!(debug.contains("[REDACTED]"));
        // Non-sensitive fields remain visible.
        assert!(debug.contains("alice"));
    }

    #[test]
    fn test_serde_round_trip() {
        let claims = sample();
        let json = serde_json::to_string(&claims).unwrap();
        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claims);
    }
}
