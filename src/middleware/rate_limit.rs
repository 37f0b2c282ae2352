//! Per-client rate limiting for the authentication endpoints.
//!
//! Clients are keyed by the first `x-forwarded-for` address, then
//! `x-real-ip`, then the peer address of the connection. The server must be
//! started with `into_make_service_with_connect_info::<SocketAddr>()` for the
//! last one to be available.

use std::net::SocketAddr;
use std::sync::Arc;

use abroadly_config::RateLimitConfig;
use abroadly_core::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, RateLimiter,
    clock::{Clock, DefaultClock},
};
use tracing::warn;

use crate::state::AppState;

#[derive(Clone)]
pub struct AuthRateLimiter {
    limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

impl std::fmt::Debug for AuthRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRateLimiter")
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}

impl AuthRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = config
            .enabled
            .then(|| Arc::new(RateLimiter::keyed(config.auth_quota())));
        Self { limiter }
    }

    /// Consumes one cell for `key`. On rejection returns the seconds to wait.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            wait.as_secs().max(1)
        })
    }

    /// Drops state for clients that have fully replenished.
    pub fn retain_recent(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
        }
    }
}

pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        });

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        // Only in-process callers without a connection reach this.
        (None, None) => "unknown".to_string(),
    }
}

pub async fn auth_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(req.headers(), peer);

    match state.auth_limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            warn!(client = %key, path = %req.uri().path(), "Auth rate limit exceeded");
            let mut response =
                AppError::too_many_requests("Too many requests. Please try again later.")
                    .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(addr: &str) -> Option<SocketAddr> {
        Some(addr.parse().unwrap())
    }

    #[test]
    fn test_client_key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, peer("127.0.0.1:5000")), "203.0.113.7");
    }

    #[test]
    fn test_client_key_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_key(&headers, peer("127.0.0.1:5000")), "10.0.0.2");
    }

    #[test]
    fn test_client_key_uses_peer_ip_without_proxy_headers() {
        let headers = HeaderMap::new();
        let a = client_key(&headers, peer("198.51.100.1:40000"));
        let b = client_key(&headers, peer("198.51.100.2:40000"));
        assert_eq!(a, "198.51.100.1");
        assert_ne!(a, b);
        // Port is not part of the key.
        assert_eq!(client_key(&headers, peer("198.51.100.1:40001")), a);
    }

    #[test]
    fn test_limiter_enforces_burst_per_key() {
        let limiter = AuthRateLimiter::new(&RateLimitConfig {
            enabled: true,
            auth_per_second: 60,
            auth_burst_size: 2,
        });
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_err());
        assert!(limiter.check("b").is_ok());
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let limiter = AuthRateLimiter::new(&RateLimitConfig {
            enabled: false,
            auth_per_second: 60,
            auth_burst_size: 1,
        });
        for _ in 0..10 {
            assert!(limiter.check("a").is_ok());
        }
    }
}
