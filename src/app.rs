//! Application state and router assembly.
//!
//! # Route Groups
//!
//! - Public: `/health`
//! - `auth` class: signup and login, rate limited only
//! - `api_keys` class: key management behind the session-token gate
//! - `resources` class: resource routes behind the API-key gate
//!
//! Within each protected group the rate limit runs first, then the gate, then
//! the handler. Other parts of the API attach to a group through
//! [`session_protected`] and [`api_key_protected`].

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::AppError;
use crate::handlers;
use crate::middleware::{
    auth::{require_api_key, require_session_token},
    rate_limit::{RateLimitState, enforce_rate_limit},
};
use crate::services::{
    account_service::AccountService,
    api_key_service::ApiKeyService,
    password::{PasswordConfig, PasswordService},
    rate_limiter::{RateLimitConfig, RateLimiter, RouteClass},
    token::TokenService,
};
use crate::store::CredentialStore;

/// Shared state handed to every handler and middleware.
///
/// Every component receives its configuration here, at construction.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub accounts: AccountService,
    pub api_keys: ApiKeyService,
    pub tokens: TokenService,
    pub limiter: Arc<RateLimiter>,
    pub trust_forwarded_for: bool,
}

/// Everything needed to build an [`AppState`] besides the store.
#[derive(Clone)]
pub struct AuthSettings {
    pub token_secret: Vec<u8>,
    pub token_ttl: std::time::Duration,
    pub password: PasswordConfig,
    pub rate_limits: RateLimitConfig,
    pub trust_forwarded_for: bool,
}

impl From<&Config> for AuthSettings {
    fn from(config: &Config) -> Self {
        Self {
            token_secret: config.token_secret.as_bytes().to_vec(),
            token_ttl: config.token_ttl(),
            password: PasswordConfig {
                cost: config.password_hash_cost,
                memory_kib: config.password_hash_memory_kib,
            },
            rate_limits: config.rate_limits(),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, settings: AuthSettings) -> Result<Self, AppError> {
        let passwords = PasswordService::new(settings.password)?;
        let tokens = TokenService::new(settings.token_secret, settings.token_ttl);
        let accounts = AccountService::new(store.clone(), passwords, tokens.clone())?;

        Ok(Self {
            api_keys: ApiKeyService::new(store.clone()),
            accounts,
            tokens,
            limiter: Arc::new(RateLimiter::new(settings.rate_limits)),
            trust_forwarded_for: settings.trust_forwarded_for,
            store,
        })
    }
}

fn rate_limited(routes: Router<AppState>, state: &AppState, class: RouteClass) -> Router<AppState> {
    routes.route_layer(axum_middleware::from_fn_with_state(
        RateLimitState {
            app: state.clone(),
            class,
        },
        enforce_rate_limit,
    ))
}

/// Put `routes` behind the session-token gate and the `api_keys` rate limit.
pub fn session_protected(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    let gated = routes.route_layer(axum_middleware::from_fn_with_state(
        state.clone(),
        require_session_token,
    ));
    rate_limited(gated, state, RouteClass::ApiKeys)
}

/// Put `routes` behind the API-key gate and the `resources` rate limit.
pub fn api_key_protected(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    let gated = routes.route_layer(axum_middleware::from_fn_with_state(
        state.clone(),
        require_api_key,
    ));
    rate_limited(gated, state, RouteClass::Resources)
}

/// Build the full HTTP router.
pub fn router(state: AppState) -> Router {
    let auth_routes = rate_limited(
        Router::new()
            .route("/api/v1/auth/signup", post(handlers::auth::signup))
            .route("/api/v1/auth/login", post(handlers::auth::login)),
        &state,
        RouteClass::Auth,
    );

    let key_routes = session_protected(
        Router::new()
            .route(
                "/api/v1/api-keys",
                get(handlers::api_keys::list_api_keys)
                    .post(handlers::api_keys::create_api_key)
                    .delete(handlers::api_keys::revoke_api_key),
            )
            .route(
                "/api/v1/api-keys/{id}",
                delete(handlers::api_keys::revoke_api_key_by_id),
            ),
        &state,
    );

    let resource_routes = api_key_protected(
        Router::new().route("/api/v1/identity", get(handlers::identity::whoami)),
        &state,
    );

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .merge(auth_routes)
        .merge(key_routes)
        .merge(resource_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
