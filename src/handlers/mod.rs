//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, resolved identity)
//! 2. Delegates to a service
//! 3. Returns HTTP response (JSON, status code)

/// API key management endpoints
pub mod api_keys;
/// Signup and login endpoints
pub mod auth;
pub mod health;
/// Identity echo for API-key clients
pub mod identity;
