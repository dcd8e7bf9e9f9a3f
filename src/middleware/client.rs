//! Client identity used to key rate-limit counters.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Key used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the client key for a request.
///
/// Uses the first hop of `X-Forwarded-For` when `trust_forwarded_for` is set
/// (the service sits behind a proxy that overwrites the header), otherwise the
/// peer address of the TCP connection.
pub fn client_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
