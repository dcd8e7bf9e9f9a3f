//! Data models representing stored records and request/response bodies.

/// API key record and its request/response shapes
pub mod api_key;
/// Permission vocabulary and set checks
pub mod permission;
/// User account model
pub mod user;
