//! Authorization gates.
//!
//! Two middleware functions resolve the caller's identity before a handler runs:
//!
//! - [`require_session_token`]: `NoToken → Extracted → Verified → Authorized`
//! - [`require_api_key`]: `NoKey → Extracted → Found → ActiveChecked → Authorized`
//!
//! Each gate either inserts an [`AuthContext`] into the request extensions and
//! calls the next handler, or short-circuits with a 401. Gates only read the
//! store. Each attempt first reserves a slot in the client's
//! `credential_failures` budget; the slot is handed back when the credential
//! turns out to be good. When no slot is left the gate answers 429 without
//! touching the store, however many attempts are in flight.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::AppError;
use crate::middleware::client::client_key;
use crate::models::api_key::ApiKey;
use crate::models::permission::{Permission, PermissionSet, satisfies};
use crate::services::rate_limiter::{Reservation, RouteClass};

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers with `Extension<AuthContext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// The authenticated user
    pub user_id: Uuid,

    /// Permissions granted to this credential
    pub permissions: PermissionSet,

    /// Set when the request was authenticated with an API key
    pub api_key_id: Option<Uuid>,
}

impl AuthContext {
    /// Fail with `Forbidden` unless every permission in `required` is granted.
    pub fn require(&self, required: &[Permission]) -> Result<(), AppError> {
        let required: PermissionSet = required.iter().copied().collect();
        if satisfies(&self.permissions, &required) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, ?required, "Permission check failed");
            Err(AppError::Forbidden)
        }
    }
}

/// Extract the credential from `Authorization: Bearer <credential>`.
///
/// A missing header, a non-UTF-8 value, a different scheme or an empty
/// credential all count as `MissingCredential`.
pub fn bearer_credential(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::MissingCredential)?;

    let (scheme, credential) = value
        .trim()
        .split_once(' ')
        .ok_or(AppError::MissingCredential)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::MissingCredential);
    }

    let credential = credential.trim();
    if credential.is_empty() || credential.contains(' ') {
        return Err(AppError::MissingCredential);
    }

    Ok(credential)
}

/// Reserve a credential-failure slot for this attempt, or reject with 429.
fn reserve_attempt(state: &AppState, client: &str) -> Result<Reservation, AppError> {
    state
        .limiter
        .try_reserve(client, RouteClass::CredentialFailures)
        .map_err(|retry_after| {
            tracing::warn!(client = %client, "Credential failure budget exhausted");
            AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
        })
}

/// Keep the reserved slot for a rejected credential, return it otherwise.
fn settle<T>(
    state: &AppState,
    reservation: Reservation,
    client: &str,
    gate: &'static str,
    outcome: &Result<T, AppError>,
) {
    match outcome {
        Err(err) if err.is_credential_failure() => {
            tracing::debug!(client = %client, gate, code = err.code(), "Credential rejected");
        }
        _ => state.limiter.release(reservation),
    }
}

/// Session-token gate.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` (absent → `MissingCredential`)
/// 2. Verify signature and expiry (any failure → `InvalidCredential`)
/// 3. Inject `AuthContext { user_id, permissions }` and call the next handler
pub async fn require_session_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request, state.trust_forwarded_for);
    let reservation = reserve_attempt(&state, &client)?;

    let resolved = bearer_credential(request.headers()).and_then(|token| {
        state
            .tokens
            .verify(token)
            .ok_or(AppError::InvalidCredential)
    });
    settle(&state, reservation, &client, "session_token", &resolved);
    let claims = resolved?;

    request.extensions_mut().insert(AuthContext {
        user_id: claims.user_id,
        permissions: claims.permissions,
        api_key_id: None,
    });

    Ok(next.run(request).await)
}

/// Look up the presented key and check that it is active.
async fn resolve_api_key(state: &AppState, headers: &HeaderMap) -> Result<ApiKey, AppError> {
    let key = bearer_credential(headers)?;

    match state.api_keys.lookup(key).await? {
        Some(record) if record.is_active => Ok(record),
        Some(_) => Err(AppError::InactiveCredential),
        None => Err(AppError::InvalidCredential),
    }
}

/// API-key gate.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` (absent → `MissingCredential`)
/// 2. Hash the key and look it up (unknown → `InvalidCredential`)
/// 3. Check the active flag (inactive → `InactiveCredential`)
/// 4. Inject `AuthContext` built from the key record and call the next handler
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request, state.trust_forwarded_for);
    let reservation = reserve_attempt(&state, &client)?;

    let resolved = resolve_api_key(&state, request.headers()).await;
    settle(&state, reservation, &client, "api_key", &resolved);
    let record = resolved?;

    request.extensions_mut().insert(AuthContext {
        user_id: record.user_id,
        permissions: record.permissions,
        api_key_id: Some(record.id),
    });

    Ok(next.run(request).await)
}
