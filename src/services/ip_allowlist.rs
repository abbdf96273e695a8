//! Client-IP allowlisting for the webhook surface.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::warn;

/// Set of client IPs allowed to reach the gateway
#[derive(Debug, Clone)]
pub struct IpAllowlist {
    allowed: Arc<HashSet<IpAddr>>,
}

impl IpAllowlist {
    /// Parse configured entries; invalid ones are skipped with a warning.
    /// Returns `None` when no valid entries remain, which disables the check.
    pub fn from_config(entries: &[String]) -> Option<Self> {
        let mut allowed = HashSet::new();
        for entry in entries {
            match entry.trim().parse::<IpAddr>() {
                Ok(ip) => {
                    allowed.insert(ip);
                }
                Err(_) => warn!("Ignoring invalid allowlist entry: {}", entry),
            }
        }

        if allowed.is_empty() {
            None
        } else {
            Some(Self {
                allowed: Arc::new(allowed),
            })
        }
    }

    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.allowed.contains(&ip)
    }
}

/// Reject requests whose peer address is outside the allowlist
pub async fn ip_allowlist_middleware(
    State(allowlist): State<IpAllowlist>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ConnectInfo(addr)) = connect_info else {
        warn!("Rejecting request with unknown peer address");
        return StatusCode::FORBIDDEN.into_response();
    };

    if !allowlist.is_allowed(addr.ip()) {
        warn!("Rejecting request from non-allowlisted IP: {}", addr.ip());
        return StatusCode::FORBIDDEN.into_response();
    }

    next.run(request).await
}
