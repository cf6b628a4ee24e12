//! Salted Argon2id password hashing

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config::PasswordConfig;
use crate::core::error::{StorageError, WorkshopError, WorkshopResult};

/// Hashes and verifies passwords
///
/// Hashing is CPU bound, so the async entry points run it on the blocking
/// thread pool.
#[derive(Clone)]
pub struct PasswordService {
    argon: Argon2<'static>,
    dummy_hash: String,
}

fn hashing_error(e: impl std::fmt::Display) -> WorkshopError {
    WorkshopError::Storage(StorageError::Hashing {
        message: e.to_string(),
    })
}

impl PasswordService {
    /// Build a hasher with the configured Argon2id cost
    pub fn new(config: &PasswordConfig) -> WorkshopResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(hashing_error)?;
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut service = Self {
            argon,
            dummy_hash: String::new(),
        };
        service.dummy_hash = service.hash_blocking("not-a-real-password")?;
        Ok(service)
    }

    /// Hash a password with a fresh random salt (PHC string format)
    pub fn hash_blocking(&self, password: &str) -> WorkshopResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(hashing_error)
    }

    /// Check a password against a stored hash
    ///
    /// A hash that cannot be parsed never verifies.
    pub fn verify_blocking(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Hash on the blocking pool
    pub async fn hash(&self, password: String) -> WorkshopResult<String> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.hash_blocking(&password))
            .await
            .map_err(|e| WorkshopError::Internal(format!("hashing task failed: {e}")))?
    }

    /// Verify on the blocking pool
    ///
    /// With no stored hash (unknown account) the password is checked against
    /// a dummy hash and the result is always `false`, so both failures cost
    /// the same.
    pub async fn verify(&self, password: String, stored: Option<String>) -> WorkshopResult<bool> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || match stored {
            Some(hash) => this.verify_blocking(&password, &hash),
            None => {
                let _ = this.verify_blocking(&password, &this.dummy_hash);
                false
            }
        })
        .await
        .map_err(|e| WorkshopError::Internal(format!("verification task failed: {e}")))
    }
}
