//! Credential store adapter.
//!
//! A thin persistence interface over users and API keys. Implementations hold
//! no business logic: they read and write records and enforce the uniqueness
//! constraints (user email, API key hash).

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::api_key::{ApiKey, NewApiKey};
use crate::models::user::{NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Errors surfaced by a credential store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (duplicate email or key hash).
    #[error("duplicate record")]
    Duplicate,

    /// The underlying database failed or is unreachable.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence operations the identity core depends on.
///
/// API keys are addressed by the SHA-256 digest of their plaintext; callers
/// hash before they look up.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by their normalized (lowercase) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a user. Fails with `StoreError::Duplicate` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError>;

    async fn find_api_key_by_id(&self, id: Uuid) -> Result<Option<ApiKey>, StoreError>;

    /// Insert an API key. Fails with `StoreError::Duplicate` if the hash already exists.
    async fn create_api_key(&self, key: NewApiKey) -> Result<ApiKey, StoreError>;

    /// Hard-delete an API key. Returns `false` if no record matched.
    async fn delete_api_key(&self, id: Uuid) -> Result<bool, StoreError>;

    /// All keys owned by `user_id`, newest first.
    async fn list_api_keys_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, StoreError>;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
