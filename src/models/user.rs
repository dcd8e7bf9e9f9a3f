//! User data models and signup/login request/response types.
//!
//! This module defines:
//! - `User`: Database entity representing a registered user
//! - `SignupRequest` / `LoginRequest`: Request bodies, validated at the boundary
//! - `SignupResponse` / `LoginResponse`: Response bodies returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::permission::PermissionSet;

/// Minimum accepted password length on signup.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. The email is stored lowercased and is unique,
/// so `A@B.com` and `a@b.com` are the same account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for this user
    pub id: Uuid,

    /// Lowercase-normalized email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Argon2id PHC string. Never serialized.
    pub password_hash: String,

    /// Timestamp when the user signed up
    pub created_at: DateTime<Utc>,
}

/// Fields needed to persist a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Request body for `POST /api/v1/auth/signup`.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Ada",
///   "email": "ada@example.com",
///   "password": "correct-horse"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A signup request that passed boundary validation.
#[derive(Debug)]
pub struct ValidSignup {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    /// Validate and normalize the request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the name is blank, the email is
    /// malformed, or the password is shorter than `MIN_PASSWORD_LEN`.
    pub fn validate(self) -> Result<ValidSignup, AppError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        let email = normalize_email(&self.email)?;

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(ValidSignup {
            name,
            email,
            password: self.password,
        })
    }
}

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Normalize the email and reject an empty password.
    pub fn validate(self) -> Result<(String, String), AppError> {
        let email = normalize_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()));
        }
        Ok((email, self.password))
    }
}

/// Trim, lowercase and sanity-check an email address.
///
/// Accepts `local@domain` where `domain` contains a dot that is neither its
/// first nor its last character.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let invalid = || AppError::Validation("A valid email address is required".to_string());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    Ok(email)
}

/// Response body for a successful signup.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
}

impl From<User> for SignupResponse {
    fn from(user: User) -> Self {
        Self {
            message: format!("{} has been created successfully", user.name),
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Response body for a successful login.
///
/// # JSON Example
///
/// ```json
/// {
///   "message": "Logged in",
///   "access_token": "eyJ1c2VyX2lkIjoi...",
///   "token_type": "Bearer",
///   "expires_at": "2025-12-20T11:00:00Z",
///   "permissions": ["create:recipe", "create:apiKey"]
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub permissions: PermissionSet,
}
