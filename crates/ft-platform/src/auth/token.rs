//! Session Tokens
//!
//! Stateless, HMAC-SHA256 signed session tokens (JWT compact form).
//! The signing secret is injected at construction and never derivable
//! from a token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::shared::error::{CredentialError, PlatformError, Result};

/// Minimum secret length accepted by [`JwtMaker`], in bytes.
pub const MIN_SECRET_KEY_LEN: usize = 32;

/// Claims carried inside a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Unique token identifier
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl Payload {
    pub fn new(username: impl Into<String>, ttl: Duration) -> Result<Self> {
        let issued_at = Utc::now();
        let expired_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| PlatformError::validation("token duration out of range"))?;

        Ok(Self {
            id: Uuid::new_v4(),
            username: username.into(),
            issued_at,
            expired_at,
        })
    }

    /// A payload is valid at `now` iff `now <= expired_at`.
    pub fn valid_at(&self, now: DateTime<Utc>) -> std::result::Result<(), CredentialError> {
        if now > self.expired_at {
            return Err(CredentialError::ExpiredToken);
        }
        Ok(())
    }
}

/// Creates and verifies session tokens.
pub trait TokenMaker: Send + Sync {
    /// Issue a token for `username` valid for `ttl`.
    fn create_token(&self, username: &str, ttl: Duration) -> Result<(String, Payload)>;

    /// Check integrity, then expiry. Returns the payload only when both pass.
    fn verify_token(&self, token: &str) -> std::result::Result<Payload, CredentialError>;
}

/// JWT-backed [`TokenMaker`] using HS256.
pub struct JwtMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtMaker {
    /// Fails when `secret` is shorter than [`MIN_SECRET_KEY_LEN`].
    pub fn new(secret: &str) -> Result<Self> {
        if secret.len() < MIN_SECRET_KEY_LEN {
            return Err(PlatformError::Configuration {
                message: format!(
                    "invalid key size: must be at least {} characters",
                    MIN_SECRET_KEY_LEN
                ),
            });
        }

        // Expiry lives in the payload and is checked by `Payload::valid_at`,
        // so the registered `exp` claim is neither required nor validated.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        info!("JwtMaker initialized with HS256");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Verify against an explicit clock.
    pub fn verify_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<Payload, CredentialError> {
        let payload = decode::<Payload>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token failed integrity check");
                CredentialError::InvalidSignature
            })?;

        payload.valid_at(now)?;
        Ok(payload)
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(&self, username: &str, ttl: Duration) -> Result<(String, Payload)> {
        let payload = Payload::new(username, ttl)?;

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| PlatformError::Signing { message: e.to_string() })?;

        Ok((token, payload))
    }

    fn verify_token(&self, token: &str) -> std::result::Result<Payload, CredentialError> {
        self.verify_token_at(token, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "12345678901234567890123456789012";

    fn maker() -> JwtMaker {
        JwtMaker::new(SECRET).unwrap()
    }

    #[test]
    fn test_create_and_verify_token() {
        let maker = maker();
        let (token, payload) = maker.create_token("alice", Duration::minutes(1)).unwrap();

        let verified = maker.verify_token(&token).unwrap();
        assert_eq!(verified, payload);
        assert_eq!(verified.username, "alice");
        assert!(verified.issued_at < verified.expired_at);
    }

    #[test]
    fn test_token_ids_are_unique() {
        let maker = maker();
        let (_, first) = maker.create_token("alice", Duration::minutes(1)).unwrap();
        let (_, second) = maker.create_token("alice", Duration::minutes(1)).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_expired_token() {
        let maker = maker();
        let (token, _) = maker.create_token("alice", Duration::seconds(-1)).unwrap();

        assert_eq!(maker.verify_token(&token), Err(CredentialError::ExpiredToken));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let maker = maker();
        let (token, payload) = maker.create_token("alice", Duration::seconds(30)).unwrap();

        assert!(maker.verify_token_at(&token, payload.expired_at).is_ok());
        assert_eq!(
            maker.verify_token_at(&token, payload.expired_at + Duration::nanoseconds(1)),
            Err(CredentialError::ExpiredToken)
        );
    }

    #[test]
    fn test_any_single_character_flip_is_rejected() {
        let maker = maker();
        let (token, _) = maker.create_token("alice", Duration::minutes(5)).unwrap();

        for (i, c) in token.char_indices() {
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + c.len_utf8(), &replacement.to_string());

            assert_eq!(
                maker.verify_token(&tampered),
                Err(CredentialError::InvalidSignature),
                "tampered token accepted at index {}",
                i
            );
        }
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other = JwtMaker::new("abcdefghijklmnopqrstuvwxyz0123456789").unwrap();
        let (token, _) = other.create_token("alice", Duration::minutes(1)).unwrap();

        assert_eq!(maker().verify_token(&token), Err(CredentialError::InvalidSignature));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert_eq!(maker().verify_token("not-a-token"), Err(CredentialError::InvalidSignature));
        assert_eq!(maker().verify_token(""), Err(CredentialError::InvalidSignature));
    }

    #[test]
    fn test_short_secret_fails_at_construction() {
        let result = JwtMaker::new("short");
        assert!(matches!(result, Err(PlatformError::Configuration { .. })));
    }
}
