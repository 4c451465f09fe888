//! Asymmetric signer/verifier for handshake bearer tokens.
//!
//! Tokens are EdDSA (Ed25519) JWTs: the private key signs, the public key
//! verifies, so any component holding only the public key can validate
//! without being able to forge. Key material is parsed and validated when a
//! [`TokenSigner`]/[`TokenVerifier`] is constructed — a missing or invalid
//! key pair must stop a process at boot, never fail lazily per request.
//!
//! Expiry is enforced by the verifier with zero clock-skew tolerance unless
//! explicitly configured.

pub mod claims;
pub mod error;
pub mod keys;
pub mod signer;
pub mod verifier;

pub use claims::Claims;
pub use error::TokenError;
pub use keys::{generate_keypair, KeyPairPem};
pub use signer::TokenSigner;
pub use verifier::TokenVerifier;

/// Maximum accepted JWT size in bytes.
///
/// Oversized tokens are rejected before any base64 decoding or signature
/// work. Typical handshake tokens are 300-600 bytes.
pub const MAX_TOKEN_SIZE_BYTES: usize = 4096;
