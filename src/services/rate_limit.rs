//! Redis-backed fixed-window rate limiting, keyed by client IP.
//!
//! The gateway must start even when Redis is down: callers treat a failed
//! `connect` as "rate limiting disabled" and log a warning. Once running,
//! a Redis error fails open and admits the request.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window, per client
    pub limit: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }
}

/// Shared middleware state holding the Redis connection
#[derive(Clone)]
pub struct RateLimitState {
    conn: ConnectionManager,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub async fn connect(redis_url: &str, config: RateLimitConfig) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(
            "Rate limiting initialized: {} requests per {} seconds",
            config.limit, config.window_secs
        );
        Ok(Self { conn, config })
    }

    /// Count one request for the client; true while within the window limit
    async fn admit(&self, client_key: &str) -> bool {
        let key = format!("tvgate:rate:{client_key}");
        let mut conn = self.conn.clone();

        let count: redis::RedisResult<u32> = conn.incr(&key, 1u32).await;
        match count {
            Ok(count) => {
                if count == 1 {
                    let expiry: redis::RedisResult<bool> =
                        conn.expire(&key, self.config.window_secs as i64).await;
                    if let Err(e) = expiry {
                        warn!("Failed to set rate-limit window expiry: {}", e);
                    }
                }
                count <= self.config.limit
            }
            Err(e) => {
                warn!("Rate-limit check failed, admitting request: {}", e);
                true
            }
        }
    }
}

/// Reject clients that exhausted their window with 429
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client_key = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.admit(&client_key).await {
        warn!("Rate limit exceeded for client {}", client_key);
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_window_parameters() {
        let config = RateLimitConfig::new(5, 60);
        assert_eq!(config.limit, 5);
        assert_eq!(config.window_secs, 60);
    }
}
