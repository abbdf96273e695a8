pub mod ip_allowlist;
pub mod rate_limit;
pub mod server;

pub use ip_allowlist::IpAllowlist;
pub use rate_limit::{RateLimitConfig, RateLimitState};
pub use server::{build_router, serve, AppState, HEALTH_PATH, WEBHOOK_PATH};
