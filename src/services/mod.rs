//! Business logic services.
//!
//! Services contain the identity core separated from HTTP handlers. Each one
//! is constructed once with its configuration and shared through `AppState`.

pub mod account_service;
pub mod api_key_service;
pub mod password;
pub mod rate_limiter;
pub mod token;
