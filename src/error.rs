//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Validation Errors**: Malformed request data, rejected at the boundary
/// - **Credential Errors**: Missing, invalid or inactive credentials (401)
/// - **Authorization Errors**: Authenticated but not allowed (403)
/// - **Throttling**: Rate limit exceeded (429)
/// - **Infrastructure Errors**: Store unreachable or internal faults (500)
///
/// Credential messages are deliberately generic: a tampered token, an expired
/// token and an unknown API key all render the same body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// No bearer credential in the `Authorization` header, or the header is malformed.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Missing credentials")]
    MissingCredential,

    /// Bad signature, expired token, unknown API key, or wrong email/password.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid or expired credentials")]
    InvalidCredential,

    /// API key exists but has been deactivated.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("API key is inactive")]
    InactiveCredential,

    /// Authenticated, but the caller does not own the resource or lacks a permission.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("You are not allowed to perform this action")]
    Forbidden,

    /// Requested resource does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Resource not found")]
    NotFound,

    /// Signup with an email that is already registered.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("An account with this email already exists")]
    EmailTaken,

    /// Too many requests from this client in the current window.
    ///
    /// Returns HTTP 429 Too Many Requests with a `Retry-After` header.
    #[error("Too many requests, please retry later")]
    RateLimited { retry_after_secs: u64 },

    /// Credential store operation failed (e.g., connection error, query error).
    ///
    /// Returns HTTP 500; the detail is logged, never sent to the client.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Any other server-side fault (hashing failure, task join error).
    ///
    /// Returns HTTP 500; the detail is logged, never sent to the client.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error code used in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::MissingCredential => "missing_credential",
            AppError::InvalidCredential => "invalid_credential",
            AppError::InactiveCredential => "inactive_credential",
            AppError::Forbidden => "forbidden",
            AppError::NotFound => "not_found",
            AppError::EmailTaken => "email_taken",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Persistence(_) | AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCredential
            | AppError::InvalidCredential
            | AppError::InactiveCredential => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `true` for errors produced by a credential check rather than by the request itself.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AppError::MissingCredential | AppError::InvalidCredential | AppError::InactiveCredential
        )
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Validation` → 400 Bad Request
/// - `MissingCredential` / `InvalidCredential` / `InactiveCredential` → 401 Unauthorized
/// - `Forbidden` → 403 Forbidden
/// - `NotFound` → 404 Not Found
/// - `EmailTaken` → 409 Conflict
/// - `RateLimited` → 429 Too Many Requests
/// - `Persistence` / `Internal` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::Persistence(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed with internal error");
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        let mut response = (status, body).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_map_to_401() {
        for err in [
            AppError::MissingCredential,
            AppError::InvalidCredential,
            AppError::InactiveCredential,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert!(err.is_credential_failure());
        }
        assert!(!AppError::Forbidden.is_credential_failure());
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let response = AppError::Internal("argon2 exploded".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from(42u64)
        );
    }
}
