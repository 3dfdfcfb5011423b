//! Password Hashing
//!
//! Argon2id hashing and verification for user passwords.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::shared::error::{PlatformError, Result};

/// Password rules applied before hashing
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    /// Only ASCII letters and digits allowed
    pub alphanumeric_only: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            alphanumeric_only: false,
        }
    }
}

impl PasswordPolicy {
    /// Rules for a replacement password chosen by an authenticated user.
    pub fn for_password_change() -> Self {
        Self {
            alphanumeric_only: true,
            ..Self::default()
        }
    }

    pub fn validate(&self, password: &str) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if password.len() < self.min_length {
            errors.push(format!("password must be at least {} characters", self.min_length));
        }

        if password.len() > self.max_length {
            errors.push(format!("password must be at most {} characters", self.max_length));
        }

        if self.alphanumeric_only && !password.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push("password must contain only letters and digits".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone)]
pub struct Argon2Config {
    /// Memory cost in KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Config {
    /// Cheap parameters for tests
    pub fn testing() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

pub struct PasswordService {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
}

impl PasswordService {
    pub fn new(config: Argon2Config, policy: PasswordPolicy) -> Result<Self> {
        let params = Params::new(config.memory_cost, config.time_cost, config.parallelism, None)
            .map_err(|e| PlatformError::Configuration {
                message: format!("invalid Argon2 parameters: {}", e),
            })?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            policy,
        })
    }

    /// Validate against the policy, then hash with a fresh salt.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        self.policy
            .validate(password)
            .map_err(|errors| PlatformError::validation(errors.join("; ")))?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PlatformError::internal(format!("failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch; `Err` only for a corrupt stored hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| PlatformError::internal(format!("invalid password hash format: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => {
                debug!("Password verification successful");
                Ok(true)
            }
            Err(argon2::password_hash::Error::Password) => {
                warn!("Password verification failed");
                Ok(false)
            }
            Err(e) => Err(PlatformError::internal(format!("password verification error: {}", e))),
        }
    }

    /// [`hash_password`](Self::hash_password) on the blocking pool.
    pub async fn spawn_hash(self: &Arc<Self>, password: &str) -> Result<String> {
        let service = Arc::clone(self);
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || service.hash_password(&password))
            .await
            .map_err(|e| PlatformError::internal(format!("password hashing task failed: {}", e)))?
    }

    /// [`verify_password`](Self::verify_password) on the blocking pool.
    pub async fn spawn_verify(self: &Arc<Self>, password: &str, hash: &str) -> Result<bool> {
        let service = Arc::clone(self);
        let (password, hash) = (password.to_owned(), hash.to_owned());

        tokio::task::spawn_blocking(move || service.verify_password(&password, &hash))
            .await
            .map_err(|e| PlatformError::internal(format!("password verification task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PasswordService {
        PasswordService::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let service = service();
        let hash = service.hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify_password("correct horse", &hash).unwrap());
        assert!(!service.verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let service = service();
        let a = service.hash_password("password123").unwrap();
        let b = service.hash_password("password123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_password_rejected() {
        let result = service().hash_password("short");
        assert!(matches!(result, Err(PlatformError::Validation { .. })));
    }

    #[test]
    fn test_password_change_policy() {
        let policy = PasswordPolicy::for_password_change();
        assert!(policy.validate("abc12345").is_ok());
        assert!(policy.validate("abc 12345").is_err());
        assert!(policy.validate("abc1234").is_err());
    }

    #[test]
    fn test_corrupt_hash_is_an_error() {
        assert!(service().verify_password("whatever", "not-a-hash").is_err());
    }

    #[tokio::test]
    async fn test_blocking_pool_variants() {
        let service = Arc::new(service());

        let hash = service.spawn_hash("correct horse").await.unwrap();
        assert!(service.spawn_verify("correct horse", &hash).await.unwrap());
        assert!(!service.spawn_verify("wrong horse", &hash).await.unwrap());

        let short = service.spawn_hash("short").await;
        assert!(matches!(short, Err(PlatformError::Validation { .. })));
        assert!(service.spawn_verify("whatever", "not-a-hash").await.is_err());
    }
}
