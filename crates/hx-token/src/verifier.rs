//! Token verification with the Ed25519 public key.

use crate::claims::Claims;
use crate::error::TokenError;
use crate::{keys, MAX_TOKEN_SIZE_BYTES};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::{debug, instrument};

/// Verifies handshake tokens.
///
/// Holds only the public key: a component carrying a `TokenVerifier` can
/// validate tokens but never mint them. Expiry is enforced with zero
/// leeway unless [`TokenVerifier::with_leeway`] is applied.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    leeway_secs: u64,
}

impl TokenVerifier {
    /// Build a verifier from a PEM-encoded raw Ed25519 public key.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the PEM body is invalid. Callers must
    /// treat this as fatal at startup.
    pub fn from_pem(public_key_pem: &str) -> Result<Self, TokenError> {
        let der = keys::decode_pem(public_key_pem)?;
        if der.len() != 32 {
            return Err(TokenError::Key(format!(
                "expected a 32-byte Ed25519 public key, got {} bytes",
                der.len()
            )));
        }

        Ok(Self {
            decoding_key: DecodingKey::from_ed_der(&der),
            leeway_secs: 0,
        })
    }

    /// Allow `seconds` of clock skew when checking expiry.
    #[must_use]
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_secs = seconds;
        self
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// The size check runs before any decoding so oversized input costs
    /// nothing. All failure modes collapse into the same generic
    /// `TokenError::Invalid`; details go to debug logs only.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for any token that does not verify.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            debug!(
                target: "hx.token",
                token_size = token.len(),
                max_size = MAX_TOKEN_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(TokenError::Invalid);
        }

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.validate_exp = true;
        // jsonwebtoken defaults to 60s leeway; this protocol wants zero
        // unless explicitly configured.
        validation.leeway = self.leeway_secs;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!(target: "hx.token", error = %e, "Token verification failed");
            TokenError::Invalid
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;
    use crate::signer::TokenSigner;
    use chrono::Utc;
    use hx_common::types::IdentitySnapshot;

    fn snapshot() -> IdentitySnapshot {
        IdentitySnapshot {
            user_id: "u-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: "admin".to_string(),
            tier: "premium".to_string(),
        }
    }

    fn signer_and_verifier() -> (TokenSigner, TokenVerifier) {
        let pair = generate_keypair().unwrap();
        (
            TokenSigner::from_pem(&pair.private_pem).unwrap(),
            TokenVerifier::from_pem(&pair.public_pem).unwrap(),
        )
    }

    #[test]
    fn test_round_trip_preserves_claims() {
        let (signer, verifier) = signer_and_verifier();

        let token = signer.sign(&snapshot(), 60).unwrap();
        let claims = verifier.verify(&token).unwrap();

        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let (signer, verifier) = signer_and_verifier();

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: "user".to_string(),
            exp: now - 120,
            iat: now - 3_720,
        };

        let token = signer.sign_claims(&claims).unwrap();
        assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_leeway_admits_recently_expired_token() {
        let pair = generate_keypair().unwrap();
        let signer = TokenSigner::from_pem(&pair.private_pem).unwrap();
        let verifier = TokenVerifier::from_pem(&pair.public_pem)
            .unwrap()
            .with_leeway(300);

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: "user".to_string(),
            exp: now - 120,
            iat: now - 3_720,
        };

        let token = signer.sign_claims(&claims).unwrap();
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn test_token_signed_with_other_key_is_invalid() {
        let (signer, _) = signer_and_verifier();
        let (_, other_verifier) = signer_and_verifier();

        let token = signer.sign(&snapshot(), 60).unwrap();
        assert!(matches!(
            other_verifier.verify(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let (signer, verifier) = signer_and_verifier();
        let token = signer.sign(&snapshot(), 60).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = "eyJyb2xlIjoiYWRtaW4ifQ";
        parts[1] = forged;
        let tampered = parts.join(".");

        assert!(matches!(verifier.verify(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let (_, verifier) = signer_and_verifier();
        assert!(matches!(
            verifier.verify("garbage-token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_oversized_token_is_invalid() {
        let (_, verifier) = signer_and_verifier();
        let oversized = "a".repeat(MAX_TOKEN_SIZE_BYTES + 1);
        assert!(matches!(
            verifier.verify(&oversized),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_from_pem_rejects_wrong_length_key() {
        let result = TokenVerifier::from_pem("-----BEGIN PUBLIC KEY-----\ndGVzdA==\n-----END PUBLIC KEY-----");
        assert!(matches!(result, Err(TokenError::Key(_))));
    }
}
