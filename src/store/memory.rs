//! In-process credential store.
//!
//! Mirrors the uniqueness rules of the Postgres schema. Used by the test suite
//! and for running the service without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::api_key::{ApiKey, NewApiKey};
use crate::models::user::{NewUser, User};
use crate::store::{CredentialStore, StoreError};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    api_keys: HashMap<Uuid, ApiKey>,
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }

        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .api_keys
            .values()
            .find(|k| k.key_hash == key_hash)
            .cloned())
    }

    async fn find_api_key_by_id(&self, id: Uuid) -> Result<Option<ApiKey>, StoreError> {
        Ok(self.tables.read().await.api_keys.get(&id).cloned())
    }

    async fn create_api_key(&self, key: NewApiKey) -> Result<ApiKey, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.api_keys.values().any(|k| k.key_hash == key.key_hash) {
            return Err(StoreError::Duplicate);
        }

        let record = ApiKey {
            id: Uuid::new_v4(),
            user_id: key.user_id,
            key_hash: key.key_hash,
            key_prefix: key.key_prefix,
            name: key.name,
            is_active: key.is_active,
            permissions: key.permissions,
            created_at: Utc::now(),
        };
        tables.api_keys.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete_api_key(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.api_keys.remove(&id).is_some())
    }

    async fn list_api_keys_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, StoreError> {
        let tables = self.tables.read().await;
        let mut keys: Vec<ApiKey> = tables
            .api_keys
            .values()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
