//! Handshake orchestration.
//!
//! Three decoupled roles cooperate through the cache and the message
//! channel, with no distributed transaction tying the steps together:
//!
//! - [`producer::IdentityProducer`] stages an identity snapshot, publishes
//!   a token request, and later polls the cache for the issued token.
//! - [`issuer::TokenIssuer`] consumes token requests, signs tokens against
//!   staged snapshots, and caches them for pickup.
//! - [`validator::TokenValidator`] checks a presented token against the
//!   cached one.
//!
//! # State machine
//!
//! Per `(user_id, operation_kind)` the handshake moves through
//! `Requested -> Issued -> Validated`, or dies as `Requested -> Expired`
//! when the snapshot TTL or the producer's poll budget runs out. Expiry is
//! purely TTL eviction: no cleanup action, no explicit expiry event.
//!
//! # Sequencing contract
//!
//! The snapshot is staged in the cache **before** the token request is
//! published. This is correctness-critical, not incidental: the issuer
//! reads the snapshot on consumption, and publish-before-stage silently
//! drops handshakes. `begin_handshake` enforces the order structurally —
//! the publish is unreachable until the stage has returned `Ok`.

pub mod config;
pub mod error;
pub mod events;
pub mod issuer;
pub mod producer;
pub mod validator;

pub use config::Config;
pub use error::FlowError;
pub use issuer::TokenIssuer;
pub use producer::IdentityProducer;
pub use validator::{TokenValidator, Validation, TOKEN_MISMATCH};

use hx_channel::{publish_json, MessageChannel};
use hx_common::event::ActivityEvent;
use tracing::warn;

/// Publish an activity event, logging instead of failing.
///
/// Activity classification and delivery must never be the reason a
/// handshake step fails; a sink outage costs a log line, not a token.
pub(crate) async fn publish_activity(
    channel: &dyn MessageChannel,
    queue: &str,
    event: &ActivityEvent,
) {
    if let Err(e) = publish_json(channel, queue, event).await {
        warn!(
            target: "hx.flow",
            queue,
            action = %event.action,
            error = %e,
            "Failed to publish activity event"
        );
    }
}
