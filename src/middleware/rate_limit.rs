//! Per-route-class rate limiting middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::AppError;
use crate::middleware::client::client_key;
use crate::services::rate_limiter::{RateDecision, RouteClass};

/// State for [`enforce_rate_limit`]: the shared app state plus the class
/// whose budget this route group draws from.
#[derive(Clone)]
pub struct RateLimitState {
    pub app: AppState,
    pub class: RouteClass,
}

/// Count the request against `(client, class)` and reject with 429 once the
/// window's ceiling is reached. Runs before any gate or handler, so a
/// throttled request costs no store lookup or password hash.
pub async fn enforce_rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request, state.app.trust_forwarded_for);

    match state.app.limiter.check(&client, state.class) {
        RateDecision::Allowed { .. } => Ok(next.run(request).await),
        RateDecision::Throttled { retry_after } => {
            tracing::warn!(client = %client, class = %state.class, "Rate limit exceeded");
            Err(AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            })
        }
    }
}
