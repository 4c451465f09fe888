//! Wire payloads exchanged between handshake roles.

use chrono::{DateTime, Utc};
use hx_common::types::OperationKind;
use serde::{Deserialize, Serialize};

/// Published by the producer on `auth-activity` once a snapshot is staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequested {
    pub user_id: String,
    pub operation_kind: OperationKind,
}

/// Published by the issuer on `token-generated` after caching a token.
///
/// Informational for downstream consumers; the producer picks the token up
/// by polling the cache, not by waiting on this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGenerated {
    pub user_id: String,
    pub operation_kind: OperationKind,
    pub issued_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_requested_wire_shape() {
        let event = TokenRequested {
            user_id: "u-1".to_string(),
            operation_kind: OperationKind::Login,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"operation_kind\":\"login\""));

        let back: TokenRequested = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_token_requested_rejects_unknown_kind() {
        let json = r#"{"user_id":"u-1","operation_kind":"signup"}"#;
        assert!(serde_json::from_str::<TokenRequested>(json).is_err());
    }
}
