//! Redis-backed message channel.
//!
//! Queues are Redis lists: publish is `RPUSH`, consume is an `LMOVE` into a
//! per-queue processing list so a message popped by a crashing process is
//! not lost. A handler returning `Ok` acknowledges by `LREM`-ing the entry
//! from the processing list; requeue is `LREM` plus `LPUSH` back onto the
//! head of the source list.
//!
//! # Connection Pattern
//!
//! A single [`ConnectionManager`] is shared by every operation. It is cheap
//! to clone, safe to use concurrently, and reconnects transparently after a
//! dropped connection, so individual operations take no locks. Connection
//! *establishment* is the only retried step: `connect_with_backoff` applies
//! bounded exponential backoff and surfaces a fatal error once the attempt
//! budget is exhausted.
//!
//! # Assumptions
//!
//! One consumer loop per queue per process. The orphan-recovery drain at
//! consumer startup moves anything left in the processing list back onto
//! the queue, which would steal in-flight messages from a second live
//! consumer of the same queue in the same keyspace.

use crate::error::{ChannelError, HandlerError};
use crate::{FailurePolicy, MessageChannel, QueueHandler};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Direction};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Initial delay between connection attempts.
const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Cap for the exponential backoff delay.
const MAX_BACKOFF_MS: u64 = 30_000;

/// How long an idle consumer sleeps between polls of an empty queue.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Back-off applied when a poll fails (e.g., mid-outage) before retrying.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(1);

fn processing_list(queue: &str) -> String {
    format!("{queue}:processing")
}

/// Message channel over Redis lists.
///
/// Cheaply cloneable; clone per component rather than sharing via a lock.
#[derive(Clone)]
pub struct RedisChannel {
    connection: ConnectionManager,
}

impl RedisChannel {
    /// Connect with one attempt. Prefer [`RedisChannel::connect_with_backoff`]
    /// at process startup.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Connection` if the transport is unreachable.
    pub async fn connect(url: &str) -> Result<Self, ChannelError> {
        // Do NOT log the URL; it may embed credentials.
        let client = Client::open(url)
            .map_err(|e| ChannelError::Connection(format!("invalid broker URL: {e}")))?;

        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| ChannelError::Connection(format!("broker unreachable: {e}")))?;

        Ok(Self { connection })
    }

    /// Connect with bounded exponential backoff (1s, 2s, 4s, ... capped).
    ///
    /// Exhausting `max_attempts` is a fatal startup condition: the caller
    /// must refuse to accept traffic rather than limp along unconnected.
    ///
    /// # Errors
    ///
    /// Returns the last `ChannelError::Connection` once the budget is spent.
    pub async fn connect_with_backoff(
        url: &str,
        max_attempts: u32,
    ) -> Result<Self, ChannelError> {
        let mut backoff = INITIAL_BACKOFF_MS;
        let mut last_error = ChannelError::Connection("no connection attempts made".to_string());

        for attempt in 1..=max_attempts {
            match Self::connect(url).await {
                Ok(channel) => {
                    info!(
                        target: "hx.channel.redis",
                        attempt,
                        "Connected to broker"
                    );
                    return Ok(channel);
                }
                Err(e) => {
                    warn!(
                        target: "hx.channel.redis",
                        attempt,
                        max_attempts,
                        backoff_ms = backoff,
                        error = %e,
                        "Broker connection failed, will retry"
                    );
                    last_error = e;
                    if attempt < max_attempts {
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF_MS);
                    }
                }
            }
        }

        Err(last_error)
    }

    /// Move orphaned entries from the processing list back onto the queue.
    ///
    /// Entries are orphaned when a previous consumer process died between
    /// popping a message and acknowledging it.
    async fn recover_orphans(connection: &ConnectionManager, queue: &str) {
        let mut conn = connection.clone();
        let processing = processing_list(queue);
        let mut recovered = 0u64;

        loop {
            let moved: Result<Option<Vec<u8>>, _> = conn.rpoplpush(&processing, queue).await;
            match moved {
                Ok(Some(_)) => recovered += 1,
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        target: "hx.channel.redis",
                        queue,
                        error = %e,
                        "Orphan recovery interrupted"
                    );
                    break;
                }
            }
        }

        if recovered > 0 {
            info!(
                target: "hx.channel.redis",
                queue,
                recovered,
                "Requeued orphaned messages from a previous consumer"
            );
        }
    }

    /// Acknowledge (remove) one copy of `payload` from the processing list.
    async fn acknowledge(connection: &ConnectionManager, queue: &str, payload: &[u8]) {
        let mut conn = connection.clone();
        let removed: Result<i64, _> = conn.lrem(processing_list(queue), 1, payload).await;
        if let Err(e) = removed {
            // Worst case the entry is re-delivered by a later orphan
            // recovery, which at-least-once semantics already permit.
            warn!(
                target: "hx.channel.redis",
                queue,
                error = %e,
                "Failed to acknowledge message"
            );
        }
    }

    async fn dispatch(
        connection: ConnectionManager,
        queue: String,
        policy: FailurePolicy,
        handler: Arc<dyn QueueHandler>,
        payload: Vec<u8>,
    ) {
        match handler.handle(payload.clone()).await {
            Ok(()) => {
                Self::acknowledge(&connection, &queue, &payload).await;
            }
            Err(HandlerError::Malformed(reason)) => {
                // Redelivering a payload that cannot be parsed never
                // succeeds; drop it regardless of the queue policy.
                warn!(
                    target: "hx.channel.redis",
                    queue,
                    reason,
                    "Dropping malformed message"
                );
                Self::acknowledge(&connection, &queue, &payload).await;
            }
            Err(HandlerError::Failed(reason)) => match policy {
                FailurePolicy::Drop => {
                    warn!(
                        target: "hx.channel.redis",
                        queue,
                        reason,
                        "Handler failed; dropping message per queue policy"
                    );
                    Self::acknowledge(&connection, &queue, &payload).await;
                }
                FailurePolicy::Requeue => {
                    warn!(
                        target: "hx.channel.redis",
                        queue,
                        reason,
                        "Handler failed; requeueing message"
                    );
                    Self::acknowledge(&connection, &queue, &payload).await;
                    let mut conn = connection.clone();
                    let pushed: Result<i64, _> = conn.lpush(&queue, payload.as_slice()).await;
                    if let Err(e) = pushed {
                        error!(
                            target: "hx.channel.redis",
                            queue,
                            error = %e,
                            "Failed to requeue message; it is lost"
                        );
                    }
                }
            },
        }
    }
}

#[async_trait]
impl MessageChannel for RedisChannel {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), ChannelError> {
        let mut conn = self.connection.clone();
        let pushed: Result<i64, _> = conn.rpush(queue, payload).await;
        pushed.map_err(|e| ChannelError::Publish {
            queue: queue.to_string(),
            reason: e.to_string(),
        })?;
        debug!(target: "hx.channel.redis", queue, bytes = payload.len(), "Published message");
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        policy: FailurePolicy,
        handler: Arc<dyn QueueHandler>,
    ) -> Result<JoinHandle<()>, ChannelError> {
        let connection = self.connection.clone();
        let queue = queue.to_string();
        let processing = processing_list(&queue);

        let task = tokio::spawn(async move {
            Self::recover_orphans(&connection, &queue).await;
            info!(target: "hx.channel.redis", queue, "Consumer started");

            let mut conn = connection.clone();
            loop {
                let moved: Result<Option<Vec<u8>>, _> = conn
                    .lmove(&queue, &processing, Direction::Left, Direction::Right)
                    .await;

                match moved {
                    Ok(Some(payload)) => {
                        // Per-message task: two users' events are handled
                        // concurrently, and one slow handler does not stall
                        // the queue.
                        tokio::spawn(Self::dispatch(
                            connection.clone(),
                            queue.clone(),
                            policy,
                            Arc::clone(&handler),
                            payload,
                        ));
                    }
                    Ok(None) => {
                        tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                    }
                    Err(e) => {
                        // ConnectionManager reconnects on its own; just
                        // back off and poll again.
                        warn!(
                            target: "hx.channel.redis",
                            queue,
                            error = %e,
                            "Queue poll failed, backing off"
                        );
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                    }
                }
            }
        });

        Ok(task)
    }
}
