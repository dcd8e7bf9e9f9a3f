//! API Key model for programmatic authentication.
//!
//! API keys are long-lived credentials bound to a user. They are stored in the
//! database as SHA-256 hashes; the plaintext key is shown to its owner once, at
//! creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::permission::{Permission, PermissionSet};

/// Represents an API key record.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `user_id`: Owner of the key
/// - `key_hash`: SHA-256 hash of the actual API key
/// - `key_prefix`: First characters of the key, for display
/// - `name`: Optional label chosen by the owner
/// - `is_active`: Whether the key is currently valid
/// - `permissions`: Granted permission strings
/// - `created_at`: When the key was created
#[derive(Debug, Clone)]
pub struct ApiKey {
    /// Unique identifier for this API key
    pub id: Uuid,

    /// User that owns this key
    pub user_id: Uuid,

    /// SHA-256 hash of the actual API key (64 hex characters)
    ///
    /// When a request comes in with "Bearer rk_abc...", we:
    /// 1. Hash "rk_abc..." with SHA-256
    /// 2. Look up this hash in the database
    /// 3. If found and active, authenticate the request
    pub key_hash: String,

    /// Leading characters of the plaintext key so owners can tell keys apart
    pub key_prefix: String,

    pub name: Option<String>,

    /// Inactive keys are rejected by the API-key gate with a dedicated error code.
    pub is_active: bool,

    pub permissions: PermissionSet,

    pub created_at: DateTime<Utc>,
}

/// Raw `api_keys` row as sqlx decodes it.
///
/// Permissions come back as plain strings; conversion into [`ApiKey`] drops
/// anything outside the vocabulary.
#[derive(Debug, sqlx::FromRow)]
pub struct ApiKeyRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key_hash: String,
    pub key_prefix: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKeyRow> for ApiKey {
    fn from(row: ApiKeyRow) -> Self {
        let permissions = row
            .permissions
            .iter()
            .filter_map(|raw| match raw.parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(err) => {
                    tracing::warn!(api_key_id = %row.id, "Dropping stored permission: {}", err);
                    None
                }
            })
            .collect();

        Self {
            id: row.id,
            user_id: row.user_id,
            key_hash: row.key_hash,
            key_prefix: row.key_prefix,
            name: row.name,
            is_active: row.is_active,
            permissions,
            created_at: row.created_at,
        }
    }
}

/// Fields needed to persist a new API key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub user_id: Uuid,
    pub key_hash: String,
    pub key_prefix: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub permissions: PermissionSet,
}

/// Request body for `POST /api/v1/api-keys`.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "ci pipeline",
///   "permissions": ["read:recipe", "create:recipe"]
/// }
/// ```
///
/// Permission strings are validated against the vocabulary before they reach
/// the key manager.
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: Option<String>,

    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Request body for `DELETE /api/v1/api-keys`.
#[derive(Debug, Deserialize)]
pub struct RevokeApiKeyRequest {
    pub key: String,
}

/// Response body for API key endpoints.
///
/// # Security Note
///
/// The `key` field is ONLY included when creating a new key.
/// It is never returned in list operations.
///
/// # Example (Create Response)
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "key": "rk_Zk3...",
///   "key_prefix": "rk_Zk3q8",
///   "name": "ci pipeline",
///   "is_active": true,
///   "permissions": ["read:recipe"],
///   "created_at": "2025-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub key_prefix: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            key: None,
            key_prefix: key.key_prefix,
            name: key.name,
            is_active: key.is_active,
            permissions: key.permissions,
            created_at: key.created_at,
        }
    }
}

impl ApiKeyResponse {
    /// Create response with the plaintext key included (only for creation).
    pub fn with_key(mut self, key: String) -> Self {
        self.key = Some(key);
        self
    }
}
