//! In-memory message channel for tests and local development.
//!
//! Messages published before a consumer attaches are buffered per queue and
//! drained when `consume` is called, which mirrors how a durable broker
//! holds messages for an offline consumer. Delivery is at-least-once: a
//! requeued message goes to the back of the queue.

use crate::error::{ChannelError, HandlerError};
use crate::{FailurePolicy, MessageChannel, QueueHandler};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Short pause before an in-memory requeue so a persistently failing
/// handler cannot spin the loop hot.
const REQUEUE_DELAY: Duration = Duration::from_millis(10);

#[derive(Default)]
struct QueueState {
    /// Messages waiting for a consumer to attach.
    buffer: VecDeque<Vec<u8>>,
    /// Live consumer inbox, if one is attached.
    inbox: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

/// In-memory channel. Cheaply cloneable; clones share the same queues.
#[derive(Clone, Default)]
pub struct InMemoryChannel {
    queues: Arc<Mutex<HashMap<String, QueueState>>>,
}

impl InMemoryChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn dispatch(
        channel: InMemoryChannel,
        queue: String,
        policy: FailurePolicy,
        handler: Arc<dyn QueueHandler>,
        payload: Vec<u8>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            match handler.handle(payload.clone()).await {
                Ok(()) => {}
                Err(HandlerError::Malformed(reason)) => {
                    warn!(
                        target: "hx.channel.memory",
                        queue,
                        reason,
                        "Dropping malformed message"
                    );
                }
                Err(HandlerError::Failed(reason)) => match policy {
                    FailurePolicy::Drop => {
                        warn!(
                            target: "hx.channel.memory",
                            queue,
                            reason,
                            "Handler failed; dropping message per queue policy"
                        );
                    }
                    FailurePolicy::Requeue => {
                        warn!(
                            target: "hx.channel.memory",
                            queue,
                            reason,
                            "Handler failed; requeueing message"
                        );
                        tokio::time::sleep(REQUEUE_DELAY).await;
                        if let Err(e) = channel.publish(&queue, &payload).await {
                            warn!(
                                target: "hx.channel.memory",
                                queue,
                                error = %e,
                                "Failed to requeue message; it is lost"
                            );
                        }
                    }
                },
            }
        })
    }
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), ChannelError> {
        let mut queues = self.queues.lock().map_err(|_| ChannelError::Publish {
            queue: queue.to_string(),
            reason: "channel state poisoned".to_string(),
        })?;

        let state = queues.entry(queue.to_string()).or_default();

        if let Some(inbox) = &state.inbox {
            if inbox.send(payload.to_vec()).is_ok() {
                return Ok(());
            }
            // Consumer went away; fall back to buffering.
            state.inbox = None;
        }

        state.buffer.push_back(payload.to_vec());
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        policy: FailurePolicy,
        handler: Arc<dyn QueueHandler>,
    ) -> Result<JoinHandle<()>, ChannelError> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        {
            let mut queues = self.queues.lock().map_err(|_| ChannelError::Consume {
                queue: queue.to_string(),
                reason: "channel state poisoned".to_string(),
            })?;

            let state = queues.entry(queue.to_string()).or_default();
            // Drain anything published before this consumer attached.
            for pending in state.buffer.drain(..) {
                let _ = tx.send(pending);
            }
            state.inbox = Some(tx);
        }

        let channel = self.clone();
        let queue = queue.to_string();

        let task = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                Self::dispatch(
                    channel.clone(),
                    queue.clone(),
                    policy,
                    Arc::clone(&handler),
                    payload,
                );
            }
        });

        Ok(task)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::publish_json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::timeout;

    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    /// Forwards every delivered payload to a test-side receiver.
    struct Forwarder {
        delivered: mpsc::UnboundedSender<Vec<u8>>,
    }

    #[async_trait]
    impl QueueHandler for Forwarder {
        async fn handle(&self, payload: Vec<u8>) -> Result<(), HandlerError> {
            self.delivered
                .send(payload)
                .map_err(|e| HandlerError::Failed(e.to_string()))
        }
    }

    /// Fails the first `failures` deliveries, then forwards.
    struct FlakyForwarder {
        remaining_failures: AtomicU32,
        delivered: mpsc::UnboundedSender<Vec<u8>>,
    }

    #[async_trait]
    impl QueueHandler for FlakyForwarder {
        async fn handle(&self, payload: Vec<u8>) -> Result<(), HandlerError> {
            if self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(HandlerError::Failed("transient failure".to_string()));
            }
            self.delivered
                .send(payload)
                .map_err(|e| HandlerError::Failed(e.to_string()))
        }
    }

    /// Rejects every payload as malformed, counting attempts.
    struct Rejector {
        attempts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl QueueHandler for Rejector {
        async fn handle(&self, _payload: Vec<u8>) -> Result<(), HandlerError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(HandlerError::Malformed("not json".to_string()))
        }
    }

    #[tokio::test]
    async fn test_message_published_before_consumer_is_buffered() {
        let channel = InMemoryChannel::new();
        channel.publish("q", b"early").await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        channel
            .consume("q", FailurePolicy::Drop, Arc::new(Forwarder { delivered: tx }))
            .await
            .unwrap();

        let payload = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload, b"early");
    }

    #[tokio::test]
    async fn test_message_published_after_consumer_is_delivered() {
        let channel = InMemoryChannel::new();

        let (tx, mut rx) = mpsc::unbounded_channel();
        channel
            .consume("q", FailurePolicy::Drop, Arc::new(Forwarder { delivered: tx }))
            .await
            .unwrap();

        channel.publish("q", b"late").await.unwrap();

        let payload = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload, b"late");
    }

    #[tokio::test]
    async fn test_queues_are_isolated() {
        let channel = InMemoryChannel::new();
        channel.publish("other", b"elsewhere").await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        channel
            .consume("q", FailurePolicy::Drop, Arc::new(Forwarder { delivered: tx }))
            .await
            .unwrap();

        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_drop_policy_keeps_consumer_alive() {
        let channel = InMemoryChannel::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = Arc::new(FlakyForwarder {
            remaining_failures: AtomicU32::new(1),
            delivered: tx,
        });

        channel
            .consume("q", FailurePolicy::Drop, handler)
            .await
            .unwrap();

        // First message fails and is dropped; second is delivered.
        channel.publish("q", b"first").await.unwrap();
        channel.publish("q", b"second").await.unwrap();

        let payload = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload, b"second");
    }

    #[tokio::test]
    async fn test_requeue_policy_redelivers_until_success() {
        let channel = InMemoryChannel::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = Arc::new(FlakyForwarder {
            remaining_failures: AtomicU32::new(2),
            delivered: tx,
        });

        channel
            .consume("q", FailurePolicy::Requeue, handler)
            .await
            .unwrap();
        channel.publish("q", b"persistent").await.unwrap();

        let payload = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload, b"persistent");
    }

    #[tokio::test]
    async fn test_malformed_is_dropped_even_under_requeue_policy() {
        let channel = InMemoryChannel::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let handler = Arc::new(Rejector {
            attempts: Arc::clone(&attempts),
        });

        channel
            .consume("q", FailurePolicy::Requeue, handler)
            .await
            .unwrap();
        channel.publish("q", b"garbage").await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_publish_delivers_both_copies() {
        // At-least-once means duplicates are legal; the channel must hand
        // both copies to the handler and let it be idempotent.
        let channel = InMemoryChannel::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        channel
            .consume("q", FailurePolicy::Drop, Arc::new(Forwarder { delivered: tx }))
            .await
            .unwrap();

        channel.publish("q", b"dup").await.unwrap();
        channel.publish("q", b"dup").await.unwrap();

        for _ in 0..2 {
            let payload = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
            assert_eq!(payload, b"dup");
        }
    }

    #[tokio::test]
    async fn test_publish_json_round_trips() {
        let channel = InMemoryChannel::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        channel
            .consume("q", FailurePolicy::Drop, Arc::new(Forwarder { delivered: tx }))
            .await
            .unwrap();

        publish_json(&channel, "q", &serde_json::json!({ "user_id": "u-1" }))
            .await
            .unwrap();

        let payload = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["user_id"], "u-1");
    }
}
