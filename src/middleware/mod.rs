//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests (session token or API key)
//! - Throttle clients per route class
//! - Short-circuit requests (reject unauthorized or throttled)

/// Session-token and API-key gates
pub mod auth;
/// Client identity for rate-limit keys
pub mod client;
/// Fixed-window throttling
pub mod rate_limit;
