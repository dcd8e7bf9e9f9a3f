//! Liveness check that also pings the credential store.
//!
//! Both gates and every account route depend on the store, so the service is
//! only reported healthy while `CredentialStore::ping` succeeds.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{app::AppState, error::AppError};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// `"reachable"` whenever a response is produced at all
    pub credential_store: &'static str,

    pub checked_at: DateTime<Utc>,
}

/// `GET /health`
///
/// ```json
/// {
///   "status": "healthy",
///   "credential_store": "reachable",
///   "checked_at": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// An unreachable store surfaces as the standard 500 `internal_error` body;
/// the underlying error is only logged.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.store.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        credential_store: "reachable",
        checked_at: Utc::now(),
    }))
}
