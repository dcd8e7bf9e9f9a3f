//! Identity endpoint for API-key clients.

use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{middleware::auth::AuthContext, models::permission::PermissionSet};

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub user_id: Uuid,
    pub api_key_id: Option<Uuid>,
    pub permissions: PermissionSet,
}

/// `GET /api/v1/identity`: echo the identity the API-key gate resolved.
///
/// Lets programmatic clients check which user and permissions a key maps to.
pub async fn whoami(Extension(auth): Extension<AuthContext>) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        user_id: auth.user_id,
        api_key_id: auth.api_key_id,
        permissions: auth.permissions,
    })
}
