use hx_cache::CacheError;
use hx_channel::ChannelError;
use hx_token::TokenError;
use thiserror::Error;

/// Errors surfaced by the handshake orchestrators.
///
/// Note what is *not* here: a timed-out token poll is a first-class `None`
/// from `await_token`, and an invalid presented token is a
/// [`crate::Validation`] with `valid == false`. Only malformed input and
/// infrastructure failures are errors.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Caller passed structurally invalid input (empty identifiers).
    #[error("Malformed input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Token(#[from] TokenError),

    /// A payload could not be serialized for the wire.
    #[error("Payload serialization failed: {0}")]
    Serialize(String),
}
