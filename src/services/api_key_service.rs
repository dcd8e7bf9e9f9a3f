//! API key service - generation, lookup, listing and revocation.
//!
//! # Key Format
//!
//! `rk_` followed by 40 characters from `[A-Za-z0-9]`, drawn from the thread-local
//! CSPRNG. Only the SHA-256 digest and an 8-character display prefix are stored;
//! the plaintext is handed back once, from [`ApiKeyService::create`].
//!
//! # Revocation
//!
//! Revocation is a hard delete. A revoked key looks exactly like one that
//! never existed.

use std::sync::Arc;

use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::api_key::{ApiKey, NewApiKey};
use crate::models::permission::PermissionSet;
use crate::store::{CredentialStore, StoreError};

/// Prefix of every generated key.
pub const API_KEY_PREFIX: &str = "rk_";

/// Number of random characters after the prefix.
pub const API_KEY_RANDOM_LEN: usize = 40;

/// Length of the stored display prefix.
const DISPLAY_PREFIX_LEN: usize = 8;

/// Generate a new plaintext API key.
pub fn generate_api_key() -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{API_KEY_PREFIX}{random}")
}

/// SHA-256 hex digest of a plaintext API key, as stored in `api_keys.key_hash`.
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// A newly created key together with its plaintext.
#[derive(Debug, Clone)]
pub struct CreatedApiKey {
    pub record: ApiKey,
    /// The only time the plaintext is available.
    pub key: String,
}

/// Creates, resolves and revokes API keys on top of a credential store.
#[derive(Clone)]
pub struct ApiKeyService {
    store: Arc<dyn CredentialStore>,
}

impl ApiKeyService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Create an active key owned by `user_id`.
    ///
    /// A digest collision with an existing key is retried with a fresh key.
    pub async fn create(
        &self,
        user_id: Uuid,
        name: Option<String>,
        permissions: PermissionSet,
    ) -> Result<CreatedApiKey, AppError> {
        const MAX_ATTEMPTS: usize = 3;

        for _ in 0..MAX_ATTEMPTS {
            let key = generate_api_key();
            let new_key = NewApiKey {
                user_id,
                key_hash: hash_api_key(&key),
                key_prefix: key.chars().take(DISPLAY_PREFIX_LEN).collect(),
                name: name.clone(),
                is_active: true,
                permissions: permissions.clone(),
            };

            match self.store.create_api_key(new_key).await {
                Ok(record) => {
                    tracing::info!(api_key_id = %record.id, user_id = %user_id, "API key created");
                    return Ok(CreatedApiKey { record, key });
                }
                Err(StoreError::Duplicate) => {
                    tracing::warn!(user_id = %user_id, "API key digest collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "Could not generate a unique API key".to_string(),
        ))
    }

    /// Resolve a plaintext key to its record, active or not.
    pub async fn lookup(&self, key: &str) -> Result<Option<ApiKey>, AppError> {
        Ok(self.store.find_api_key_by_hash(&hash_api_key(key)).await?)
    }

    /// Keys owned by `user_id`, newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<ApiKey>, AppError> {
        Ok(self.store.list_api_keys_by_user(user_id).await?)
    }

    /// Revoke the key with plaintext `key` on behalf of `requester_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such key
    /// - `Forbidden`: the key belongs to another user
    pub async fn revoke(&self, key: &str, requester_id: Uuid) -> Result<(), AppError> {
        let record = self.lookup(key).await?.ok_or(AppError::NotFound)?;
        self.delete_owned(record, requester_id).await
    }

    /// Revoke the key with database id `id` on behalf of `requester_id`.
    pub async fn revoke_by_id(&self, id: Uuid, requester_id: Uuid) -> Result<(), AppError> {
        let record = self
            .store
            .find_api_key_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;
        self.delete_owned(record, requester_id).await
    }

    async fn delete_owned(&self, record: ApiKey, requester_id: Uuid) -> Result<(), AppError> {
        if record.user_id != requester_id {
            tracing::warn!(
                api_key_id = %record.id,
                requester_id = %requester_id,
                "Refused to revoke API key owned by another user"
            );
            return Err(AppError::Forbidden);
        }

        // A concurrent revoke may have won the race.
        if !self.store.delete_api_key(record.id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(api_key_id = %record.id, user_id = %requester_id, "API key revoked");
        Ok(())
    }
}
