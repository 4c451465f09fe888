//! Durable message channel abstraction.
//!
//! Named queues carrying JSON-encoded payloads between independently
//! deployed services. The contract is deliberately small:
//!
//! - **At-least-once delivery**: a message may be delivered more than once;
//!   handlers must be idempotent.
//! - **No ordering across queues**: only per-queue FIFO on a healthy
//!   connection, and requeue breaks even that.
//! - **Handler failures never crash the consumer**: a failing handler
//!   either requeues the message or logs-and-drops it, per queue policy.
//!
//! Two implementations: [`RedisChannel`] (Redis lists, the production
//! transport) and [`InMemoryChannel`] (tests and local development).

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub mod error;
pub mod memory;
pub mod redis;

pub use error::{ChannelError, HandlerError};
pub use memory::InMemoryChannel;
pub use redis::RedisChannel;

/// What to do with a message whose handler returned an error.
///
/// Malformed payloads are always dropped regardless of policy — redelivering
/// a payload that cannot be parsed never succeeds and would wedge the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Put the message back on the queue for redelivery.
    Requeue,
    /// Log the failure and acknowledge the message.
    Drop,
}

/// Per-message consumer callback.
///
/// Invoked once per delivered message, possibly concurrently with other
/// deliveries on the same queue. Returning `Ok` acknowledges the message.
#[async_trait]
pub trait QueueHandler: Send + Sync + 'static {
    async fn handle(&self, payload: Vec<u8>) -> Result<(), HandlerError>;
}

/// A durable, named-queue message channel.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send `payload` to `queue`, returning once the transport has accepted
    /// it — not once it has been consumed.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), ChannelError>;

    /// Start a consumer loop for `queue`, dispatching each message to
    /// `handler` on its own task. The loop runs until the returned handle
    /// is aborted or dropped by the caller's runtime shutdown.
    async fn consume(
        &self,
        queue: &str,
        policy: FailurePolicy,
        handler: Arc<dyn QueueHandler>,
    ) -> Result<JoinHandle<()>, ChannelError>;
}

/// Serialize `message` as JSON and publish it.
pub async fn publish_json<T: Serialize + ?Sized>(
    channel: &dyn MessageChannel,
    queue: &str,
    message: &T,
) -> Result<(), ChannelError> {
    let payload =
        serde_json::to_vec(message).map_err(|e| ChannelError::Serialize(e.to_string()))?;
    channel.publish(queue, &payload).await
}
