//! Identity and authorization core for the recipe API.
//!
//! Users sign up with email and password, log in for a short-lived session
//! token, and mint API keys for programmatic access. Every protected route
//! runs behind a per-client rate limit and one of two authorization gates.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use app::{AppState, AuthSettings, router};
pub use error::AppError;
