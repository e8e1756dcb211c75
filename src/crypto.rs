//! Password hashing and random key generation.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params, Version};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

/// Length of activation keys, reset keys and generated passwords.
const KEY_LENGTH: usize = 20;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    /// Hash password using Argon2id.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        );
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify password against a PHC string in constant time.
    pub fn verify_password(&self, password: impl AsRef<[u8]>, phc_hash: &str) -> bool {
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        );

        let Ok(parsed) = PasswordHash::new(phc_hash) else {
            return false;
        };

        argon2.verify_password(password.as_ref(), &parsed).is_ok()
    }
}

/// Generate a single-use account activation key.
pub fn generate_activation_key() -> String {
    generate_secret()
}

/// Generate a single-use password reset key.
pub fn generate_reset_key() -> String {
    generate_secret()
}

/// Generate a throwaway password for admin-created accounts.
pub fn generate_password() -> String {
    generate_secret()
}

fn generate_secret() -> String {
    Alphanumeric.sample_string(&mut OsRng, KEY_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let pwd = PasswordManager::new(None).unwrap();

        let hash = pwd.hash_password("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        assert!(pwd.verify_password("correct horse battery staple", &hash));
        assert!(!pwd.verify_password("incorrect horse", &hash));
    }

    #[test]
    fn test_verify_malformed_hash() {
        let pwd = PasswordManager::new(None).unwrap();

        assert!(!pwd.verify_password("whatever", "not a phc string"));
    }

    #[test]
    fn test_generated_keys() {
        let key = generate_activation_key();
        assert_eq!(key.len(), KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));

        // Two draws must not collide.
        assert_ne!(generate_reset_key(), generate_reset_key());
    }
}
