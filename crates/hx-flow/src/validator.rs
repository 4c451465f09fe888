//! Token validator: checks a presented token against the cached one.

use crate::error::FlowError;
use crate::publish_activity;
use hx_cache::SharedCache;
use hx_channel::MessageChannel;
use hx_common::event::ActivityEvent;
use hx_common::types::{token_cache_key, OperationKind};
use hx_common::{actions, queues};
use std::sync::Arc;
use tracing::instrument;

/// Caller-facing error string for any expected validation failure.
///
/// Deliberately does not distinguish mismatch from absence from expiry.
pub const TOKEN_MISMATCH: &str = "Token does not match or has expired.";

/// Outcome of a validation: a verdict plus human-readable reasons.
///
/// `errors` is empty exactly when `valid` is true. An invalid token is an
/// ordinary outcome, not an error — only malformed input errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    fn success() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn failure(reason: &str) -> Self {
        Self {
            valid: false,
            errors: vec![reason.to_string()],
        }
    }
}

/// Validates presented tokens for the handshake's terminal step.
pub struct TokenValidator {
    cache: Arc<dyn SharedCache>,
    channel: Arc<dyn MessageChannel>,
}

impl TokenValidator {
    pub fn new(cache: Arc<dyn SharedCache>, channel: Arc<dyn MessageChannel>) -> Self {
        Self { cache, channel }
    }

    /// Compare `token` against the cached token for `(user_id, kind)`.
    ///
    /// The comparison is constant-form: equal-length inputs take the same
    /// time regardless of where they differ. Either verdict publishes a
    /// classified activity event (best-effort).
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidInput` for empty `user_id` or `token`;
    /// an expected-invalid token is a `valid == false` result, never an
    /// error. Cache failures propagate as `FlowError::Cache`.
    #[instrument(skip_all, fields(user_id, kind = %kind))]
    pub async fn validate_token(
        &self,
        user_id: &str,
        token: &str,
        kind: OperationKind,
    ) -> Result<Validation, FlowError> {
        if user_id.trim().is_empty() {
            return Err(FlowError::InvalidInput(
                "user_id must not be empty".to_string(),
            ));
        }
        if token.trim().is_empty() {
            return Err(FlowError::InvalidInput(
                "token must not be empty".to_string(),
            ));
        }

        let cached = self.cache.get(&token_cache_key(user_id, kind)).await?;

        let valid = match cached {
            Some(expected) => constant_time_eq(expected.as_bytes(), token.as_bytes()),
            // Absent means expired or never issued; both look the same.
            None => false,
        };

        let (action, outcome) = if valid {
            (actions::USER_VALIDATED, Validation::success())
        } else {
            (
                actions::TOKEN_VALIDATION_FAILED,
                Validation::failure(TOKEN_MISMATCH),
            )
        };

        publish_activity(
            self.channel.as_ref(),
            queues::LOGGER_ACTIVITY,
            &ActivityEvent::record(
                user_id,
                action,
                Some(serde_json::json!({ "operation_kind": kind.as_str() })),
            ),
        )
        .await;

        Ok(outcome)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    ring::constant_time::verify_slices_are_equal(a, b).is_ok()
}
