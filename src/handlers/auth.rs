//! Signup and login HTTP handlers.
//!
//! This module implements the public account endpoints:
//! - POST /api/v1/auth/signup - Register a new user
//! - POST /api/v1/auth/login - Exchange email/password for a session token
//!
//! Both routes sit behind the `auth` rate-limit class.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    app::AppState,
    error::AppError,
    models::user::{LoginRequest, LoginResponse, SignupRequest, SignupResponse},
};

/// Register a new user.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Ada",
///   "email": "ada@example.com",
///   "password": "correct-horse"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The created user (never the password hash)
/// - **Error (400)**: Validation failed
/// - **Error (409)**: Email already registered (case-insensitive)
/// - **Error (429)**: Too many requests from this client
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let signup = request.validate()?;
    let user = state.accounts.signup(signup).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Log in and receive a session token.
///
/// # Response (200)
///
/// ```json
/// {
///   "message": "Logged in",
///   "access_token": "eyJ1c2VyX2lkIjoi...",
///   "token_type": "Bearer",
///   "expires_at": "2025-12-20T11:00:00Z",
///   "permissions": ["create:recipe", "create:apiKey", "..."]
/// }
/// ```
///
/// - **Error (401)**: Unknown email or wrong password (same message for both)
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (email, password) = request.validate()?;
    let outcome = state.accounts.login(&email, password).await?;

    Ok(Json(LoginResponse {
        message: "Logged in".to_string(),
        access_token: outcome.token.token,
        token_type: "Bearer".to_string(),
        expires_at: outcome.token.expires_at,
        permissions: outcome.permissions,
    }))
}
