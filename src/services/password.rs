//! Password hashing and verification using Argon2id.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so the
//! salt and parameters travel with the hash. A fresh random salt is drawn for
//! every call to [`PasswordService::hash`].

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::AppError;

/// Work-factor settings for the hasher.
#[derive(Debug, Clone, Copy)]
pub struct PasswordConfig {
    /// Argon2 iteration count (time cost). Must be at least 1.
    pub cost: u32,
    /// Argon2 memory cost in KiB.
    pub memory_kib: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            cost: Params::DEFAULT_T_COST,
            memory_kib: Params::DEFAULT_M_COST,
        }
    }
}

/// One-way adaptive password hasher.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Build a hasher with the given work factor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the parameters are outside Argon2's accepted range.
    pub fn new(config: PasswordConfig) -> Result<Self, AppError> {
        let params = Params::new(config.memory_kib, config.cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| AppError::Internal(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
    }

    /// Verify a password against a stored digest.
    ///
    /// A malformed digest is a non-match. The digest comparison inside
    /// `argon2` is constant-time. Parameters embedded in the digest win over
    /// the ones this service was built with, so old hashes keep verifying
    /// after a cost change.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::warn!("Stored password digest is not a valid PHC string");
            return false;
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
pub(crate) fn test_password_service() -> PasswordService {
    // Fast, insecure parameters for tests ONLY.
    PasswordService::new(PasswordConfig {
        cost: 1,
        memory_kib: 1024,
    })
    .unwrap()
}
