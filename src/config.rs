//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct,
//! then derives the per-component settings that are injected at construction.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::services::rate_limiter::{MAX_WINDOW, RateLimitConfig, RateLimitRule};

/// Minimum accepted length of `TOKEN_SECRET`, in bytes.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Longest accepted session token lifetime (one year).
pub const MAX_TOKEN_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `TOKEN_SECRET` (required): HMAC key for session tokens, at least 32 bytes
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `TOKEN_TTL_SECONDS` (optional): session token lifetime, defaults to 3600
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `PASSWORD_HASH_COST` (optional): Argon2id iterations, defaults to 2
/// - `PASSWORD_HASH_MEMORY_KIB` (optional): Argon2id memory, defaults to 19456
/// - `TRUST_FORWARDED_FOR` (optional): key clients by `X-Forwarded-For`, defaults to false
/// - `RATE_LIMIT_EVICTION_INTERVAL_SECONDS` (optional): defaults to 60
/// - `{AUTH,API_KEYS,RESOURCES,CREDENTIAL_FAILURES}_RATE_LIMIT_WINDOW_SECONDS`
/// - `{AUTH,API_KEYS,RESOURCES,CREDENTIAL_FAILURES}_RATE_LIMIT_MAX_REQUESTS`
#[derive(Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub token_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,

    #[serde(default = "default_hash_cost")]
    pub password_hash_cost: u32,

    #[serde(default = "default_hash_memory")]
    pub password_hash_memory_kib: u32,

    #[serde(default)]
    pub trust_forwarded_for: bool,

    #[serde(default = "default_eviction_interval")]
    pub rate_limit_eviction_interval_seconds: u64,

    #[serde(default = "default_window")]
    pub auth_rate_limit_window_seconds: u64,
    #[serde(default = "default_auth_max")]
    pub auth_rate_limit_max_requests: u32,

    #[serde(default = "default_window")]
    pub api_keys_rate_limit_window_seconds: u64,
    #[serde(default = "default_api_keys_max")]
    pub api_keys_rate_limit_max_requests: u32,

    #[serde(default = "default_window")]
    pub resources_rate_limit_window_seconds: u64,
    #[serde(default = "default_resources_max")]
    pub resources_rate_limit_max_requests: u32,

    #[serde(default = "default_failure_window")]
    pub credential_failures_rate_limit_window_seconds: u64,
    #[serde(default = "default_failure_max")]
    pub credential_failures_rate_limit_max_requests: u32,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_hash_cost() -> u32 {
    2
}

fn default_hash_memory() -> u32 {
    19_456
}

fn default_eviction_interval() -> u64 {
    60
}

fn default_window() -> u64 {
    60
}

fn default_auth_max() -> u32 {
    10
}

fn default_api_keys_max() -> u32 {
    30
}

fn default_resources_max() -> u32 {
    120
}

fn default_failure_window() -> u64 {
    300
}

fn default_failure_max() -> u32 {
    20
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("TOKEN_SECRET must be at least {MIN_TOKEN_SECRET_LEN} bytes")]
    WeakTokenSecret,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{name} must be at most {max}")]
    TooLarge { name: &'static str, max: u64 },
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL, TOKEN_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    /// - The token secret is too short, a window/cost value is zero, or a
    ///   lifetime or window exceeds its upper bound
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Deserialize from explicit key/value pairs instead of the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(ConfigError::WeakTokenSecret);
        }
        if self.database_max_connections == 0 {
            return Err(ConfigError::Zero("DATABASE_MAX_CONNECTIONS"));
        }
        if self.token_ttl_seconds == 0 {
            return Err(ConfigError::Zero("TOKEN_TTL_SECONDS"));
        }
        if self.token_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(ConfigError::TooLarge {
                name: "TOKEN_TTL_SECONDS",
                max: MAX_TOKEN_TTL_SECONDS,
            });
        }
        if self.password_hash_cost == 0 {
            return Err(ConfigError::Zero("PASSWORD_HASH_COST"));
        }
        let max_window = MAX_WINDOW.as_secs();
        let windows = [
            (
                "RATE_LIMIT_EVICTION_INTERVAL_SECONDS",
                self.rate_limit_eviction_interval_seconds,
            ),
            ("AUTH_RATE_LIMIT_WINDOW_SECONDS", self.auth_rate_limit_window_seconds),
            ("API_KEYS_RATE_LIMIT_WINDOW_SECONDS", self.api_keys_rate_limit_window_seconds),
            ("RESOURCES_RATE_LIMIT_WINDOW_SECONDS", self.resources_rate_limit_window_seconds),
            (
                "CREDENTIAL_FAILURES_RATE_LIMIT_WINDOW_SECONDS",
                self.credential_failures_rate_limit_window_seconds,
            ),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
            if value > max_window {
                return Err(ConfigError::TooLarge {
                    name,
                    max: max_window,
                });
            }
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    pub fn rate_limit_eviction_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_eviction_interval_seconds)
    }

    /// Per-route-class window and ceiling.
    pub fn rate_limits(&self) -> RateLimitConfig {
        RateLimitConfig {
            auth: RateLimitRule::new(
                self.auth_rate_limit_window_seconds,
                self.auth_rate_limit_max_requests,
            ),
            api_keys: RateLimitRule::new(
                self.api_keys_rate_limit_window_seconds,
                self.api_keys_rate_limit_max_requests,
            ),
            resources: RateLimitRule::new(
                self.resources_rate_limit_window_seconds,
                self.resources_rate_limit_max_requests,
            ),
            credential_failures: RateLimitRule::new(
                self.credential_failures_rate_limit_window_seconds,
                self.credential_failures_rate_limit_max_requests,
            ),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("token_secret", &"<redacted>")
            .field("server_port", &self.server_port)
            .field("database_max_connections", &self.database_max_connections)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("password_hash_cost", &self.password_hash_cost)
            .field("password_hash_memory_kib", &self.password_hash_memory_kib)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("rate_limits", &self.rate_limits())
            .finish()
    }
}
