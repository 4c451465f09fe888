use thiserror::Error;

/// Errors from token signing and verification.
///
/// The verification failure message is intentionally generic: callers must
/// not be able to distinguish a bad signature from an expired token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Key material could not be parsed or validated. Construction-time
    /// only; a process hitting this must refuse to start.
    #[error("Invalid key material: {0}")]
    Key(String),

    /// Signing failed with a structurally valid key.
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// The presented token did not verify: malformed, wrong signature,
    /// oversized, or expired.
    #[error("The access token is invalid or expired")]
    Invalid,
}
