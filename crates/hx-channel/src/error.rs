use thiserror::Error;

/// Errors surfaced by a message channel implementation.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Transport connection could not be established (or re-established
    /// within the retry budget). Fatal at startup.
    #[error("Channel connection error: {0}")]
    Connection(String),

    /// A publish was not accepted by the transport.
    #[error("Publish to '{queue}' failed: {reason}")]
    Publish { queue: String, reason: String },

    /// A consumer loop could not be started.
    #[error("Consume on '{queue}' failed: {reason}")]
    Consume { queue: String, reason: String },

    /// The outgoing payload could not be serialized.
    #[error("Payload serialization failed: {0}")]
    Serialize(String),
}

/// Errors returned by a [`crate::QueueHandler`].
///
/// The distinction matters for redelivery: `Malformed` payloads are dropped
/// unconditionally, `Failed` follows the queue's [`crate::FailurePolicy`].
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload could not be parsed; redelivery can never succeed.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Handling failed for a reason that a redelivery might resolve.
    #[error("Handler failed: {0}")]
    Failed(String),
}
