//! Token issuer: consumes token requests, signs and caches tokens.

use crate::error::FlowError;
use crate::events::{TokenGenerated, TokenRequested};
use crate::publish_activity;
use async_trait::async_trait;
use chrono::Utc;
use hx_cache::SharedCache;
use hx_channel::{
    publish_json, FailurePolicy, HandlerError, MessageChannel, QueueHandler,
};
use hx_common::event::ActivityEvent;
use hx_common::types::{snapshot_cache_key, token_cache_key, IdentitySnapshot};
use hx_common::{actions, queues};
use hx_token::TokenSigner;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Consumer side of the handshake.
///
/// Handles token requests concurrently: no state is shared across users
/// beyond the cache and channel handles, so two users' requests never
/// contend, and concurrent login/registration requests for one user land
/// under different namespaced keys.
///
/// Duplicate deliveries are safe by construction — a second issuance for
/// the same request overwrites the same cache key with the same TTL.
pub struct TokenIssuer {
    cache: Arc<dyn SharedCache>,
    channel: Arc<dyn MessageChannel>,
    signer: TokenSigner,
    token_expiry_minutes: i64,
}

impl TokenIssuer {
    pub fn new(
        cache: Arc<dyn SharedCache>,
        channel: Arc<dyn MessageChannel>,
        signer: TokenSigner,
        token_expiry_minutes: i64,
    ) -> Self {
        Self {
            cache,
            channel,
            signer,
            token_expiry_minutes,
        }
    }

    /// Start consuming token requests from `auth-activity`.
    ///
    /// Transient handler failures (cache outage mid-issue) requeue the
    /// request; malformed payloads are dropped by the channel regardless.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Channel` if the consumer loop cannot start.
    pub async fn start(self: Arc<Self>) -> Result<JoinHandle<()>, FlowError> {
        let channel = Arc::clone(&self.channel);
        let handle = channel
            .consume(queues::AUTH_ACTIVITY, FailurePolicy::Requeue, self)
            .await?;
        Ok(handle)
    }

    /// Issue a token for one consumed request.
    ///
    /// If the snapshot is absent — expired before consumption, never
    /// staged, or already consumed by a duplicate delivery — the step
    /// aborts silently: no retry, no token, no events. The producer's poll
    /// budget is the mechanism that surfaces this to the original caller.
    #[instrument(skip_all, fields(user_id = %request.user_id, kind = %request.operation_kind))]
    async fn issue(&self, request: TokenRequested) -> Result<(), FlowError> {
        let snapshot_key = snapshot_cache_key(&request.user_id, request.operation_kind);

        let Some(staged) = self.cache.get(&snapshot_key).await? else {
            debug!(
                target: "hx.flow.issuer",
                "No staged identity for token request; nothing issued"
            );
            return Ok(());
        };

        let snapshot: IdentitySnapshot = match serde_json::from_str(&staged) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // A corrupt snapshot can never issue; discard it so a
                // requeued request does not loop on it.
                warn!(
                    target: "hx.flow.issuer",
                    error = %e,
                    "Discarding unparseable staged identity"
                );
                let _ = self.cache.remove(&snapshot_key).await;
                return Ok(());
            }
        };

        let token = self.signer.sign(&snapshot, self.token_expiry_minutes)?;

        // Cache TTL equals token lifetime so a stale entry never outlives
        // the token it represents.
        let ttl = Duration::from_secs((self.token_expiry_minutes.max(1) as u64) * 60);
        self.cache
            .set(
                &token_cache_key(&request.user_id, request.operation_kind),
                &token,
                ttl,
            )
            .await?;

        // The snapshot is consumed; best-effort removal (TTL is the backstop).
        if let Err(e) = self.cache.remove(&snapshot_key).await {
            warn!(
                target: "hx.flow.issuer",
                error = %e,
                "Failed to remove consumed snapshot"
            );
        }

        info!(
            target: "hx.flow.issuer",
            user_id = %request.user_id,
            kind = %request.operation_kind,
            "Token issued and cached"
        );

        // Notifications are best-effort: the token is already retrievable.
        let generated = TokenGenerated {
            user_id: request.user_id.clone(),
            operation_kind: request.operation_kind,
            issued_at: Utc::now(),
        };
        if let Err(e) =
            publish_json(self.channel.as_ref(), queues::TOKEN_GENERATED, &generated).await
        {
            warn!(
                target: "hx.flow.issuer",
                error = %e,
                "Failed to publish token-generated notification"
            );
        }

        publish_activity(
            self.channel.as_ref(),
            queues::LOGGER_ACTIVITY,
            &ActivityEvent::record(
                &request.user_id,
                actions::TOKEN_GENERATED,
                Some(serde_json::json!({
                    "operation_kind": request.operation_kind.as_str(),
                })),
            ),
        )
        .await;

        Ok(())
    }
}

#[async_trait]
impl QueueHandler for TokenIssuer {
    async fn handle(&self, payload: Vec<u8>) -> Result<(), HandlerError> {
        let request: TokenRequested = serde_json::from_slice(&payload)
            .map_err(|e| HandlerError::Malformed(e.to_string()))?;

        self.issue(request)
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))
    }
}
