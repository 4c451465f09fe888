//! Identity producer: the registration/login side of the handshake.

use crate::error::FlowError;
use crate::events::TokenRequested;
use crate::publish_activity;
use hx_cache::{wait_for, SharedCache};
use hx_channel::{publish_json, MessageChannel};
use hx_common::event::ActivityEvent;
use hx_common::types::{snapshot_cache_key, token_cache_key, IdentitySnapshot, OperationKind};
use hx_common::{actions, queues};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Stages identity data, requests a token, and polls for the result.
pub struct IdentityProducer {
    cache: Arc<dyn SharedCache>,
    channel: Arc<dyn MessageChannel>,
    snapshot_ttl: Duration,
}

impl IdentityProducer {
    pub fn new(
        cache: Arc<dyn SharedCache>,
        channel: Arc<dyn MessageChannel>,
        snapshot_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            channel,
            snapshot_ttl,
        }
    }

    /// Stage `snapshot` and publish the token request, in that order.
    ///
    /// The stage must complete before the request is published: the issuer
    /// reads the snapshot when it consumes the request, and the reverse
    /// order silently drops the handshake. The publish below is only
    /// reachable after `set` has returned `Ok`.
    ///
    /// Returns as soon as the request is accepted by the channel; the
    /// token arrives asynchronously via [`IdentityProducer::await_token`].
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidInput` for an empty `user_id`, and
    /// propagates cache/channel failures (the caller must not pretend a
    /// handshake started when staging or the request publish failed).
    #[instrument(skip_all, fields(user_id = %snapshot.user_id, kind = %kind))]
    pub async fn begin_handshake(
        &self,
        snapshot: IdentitySnapshot,
        kind: OperationKind,
    ) -> Result<IdentitySnapshot, FlowError> {
        if snapshot.user_id.trim().is_empty() {
            return Err(FlowError::InvalidInput(
                "user_id must not be empty".to_string(),
            ));
        }

        let staged = serde_json::to_string(&snapshot)
            .map_err(|e| FlowError::Serialize(e.to_string()))?;
        self.cache
            .set(
                &snapshot_cache_key(&snapshot.user_id, kind),
                &staged,
                self.snapshot_ttl,
            )
            .await?;

        let request = TokenRequested {
            user_id: snapshot.user_id.clone(),
            operation_kind: kind,
        };
        publish_json(self.channel.as_ref(), queues::AUTH_ACTIVITY, &request).await?;

        info!(
            target: "hx.flow.producer",
            user_id = %snapshot.user_id,
            kind = %kind,
            "Handshake requested"
        );

        // Activity is best-effort: the handshake is already in flight.
        let kind_meta = serde_json::json!({ "operation_kind": kind.as_str() });
        let user_action = match kind {
            OperationKind::Registration => actions::USER_REGISTERED,
            OperationKind::Login => actions::USER_LOGGED_IN,
        };
        publish_activity(
            self.channel.as_ref(),
            queues::USER_ACTIVITY,
            &ActivityEvent::record(&snapshot.user_id, user_action, Some(kind_meta.clone())),
        )
        .await;
        publish_activity(
            self.channel.as_ref(),
            queues::LOGGER_ACTIVITY,
            &ActivityEvent::record(&snapshot.user_id, actions::TOKEN_REQUESTED, Some(kind_meta)),
        )
        .await;

        Ok(snapshot)
    }

    /// Poll the cache for the issued token.
    ///
    /// Returns `None` once the poll budget (`max_attempts * delay`) is
    /// exhausted — the issuer never ran, the request was lost, or issuance
    /// is simply slow. The caller must surface that as an explicit "token
    /// not yet available" outcome, never hang.
    #[instrument(skip_all, fields(user_id, kind = %kind))]
    pub async fn await_token(
        &self,
        user_id: &str,
        kind: OperationKind,
        max_attempts: u32,
        delay: Duration,
    ) -> Option<String> {
        wait_for(
            self.cache.as_ref(),
            &token_cache_key(user_id, kind),
            max_attempts,
            delay,
        )
        .await
    }
}
