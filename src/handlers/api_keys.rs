//! HTTP handlers for API key management.
//!
//! All routes here sit behind the session-token gate:
//! - GET /api/v1/api-keys - List the caller's keys (no plaintext)
//! - POST /api/v1/api-keys - Create a key (plaintext returned once)
//! - DELETE /api/v1/api-keys - Revoke by plaintext key
//! - DELETE /api/v1/api-keys/{id} - Revoke by id

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::api_key::{ApiKeyResponse, CreateApiKeyRequest, RevokeApiKeyRequest};
use crate::models::permission::{Permission, parse_permissions, satisfies};

/// Longest accepted key name.
const MAX_NAME_LEN: usize = 100;

/// List the caller's API keys, newest first.
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    let keys = state.api_keys.list(auth.user_id).await?;

    Ok(Json(keys.into_iter().map(Into::into).collect()))
}

/// Create a new API key.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "ci pipeline",
///   "permissions": ["read:recipe"]
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The key record, including the plaintext `key`
/// - **Error (400)**: Unknown permission string or over-long name
/// - **Error (403)**: Session lacks `create:apiKey`, or requests a permission it does not hold
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyResponse>), AppError> {
    auth.require(&[Permission::CreateApiKey])?;

    let permissions = parse_permissions(&request.permissions).map_err(|unknown| {
        AppError::Validation(format!("Unknown permissions: {}", unknown.join(", ")))
    })?;

    let name = request
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if name.as_ref().is_some_and(|n| n.chars().count() > MAX_NAME_LEN) {
        return Err(AppError::Validation(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }

    // A key can never carry more than the session that created it.
    if !satisfies(&auth.permissions, &permissions) {
        return Err(AppError::Forbidden);
    }

    let created = state
        .api_keys
        .create(auth.user_id, name, permissions)
        .await?;

    let response = ApiKeyResponse::from(created.record).with_key(created.key);
    Ok((StatusCode::CREATED, Json(response)))
}

/// Revoke a key by its plaintext value.
///
/// - **Success (204 No Content)**
/// - **Error (403)**: Key belongs to another user
/// - **Error (404)**: No such key
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<RevokeApiKeyRequest>,
) -> Result<StatusCode, AppError> {
    state.api_keys.revoke(request.key.trim(), auth.user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Revoke a key by id.
pub async fn revoke_api_key_by_id(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.api_keys.revoke_by_id(key_id, auth.user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
