pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod ingest;
pub mod notify;
pub mod scheduler;
pub mod services;
pub mod signing;
pub mod storage;

pub use config::AppConfig;
pub use coordinator::{ExecutionCoordinator, ProcessingGuard};
pub use domain::{generate_client_oid, OrderType, Side, TradeIntent, TradeSide};
pub use error::{GatewayError, Result};
pub use exchange::{build_order_payload, BitgetClient, OrderPayload};
pub use ingest::AlertIngestor;
pub use notify::{LogOnlyNotifier, RecordingNotifier, UserAlertNotifier, WebhookNotifier};
pub use scheduler::{
    FiringOutcome, PeriodicScheduler, PeriodicTradePass, ScheduledPass, TrailingStopControl,
};
pub use services::{build_router, AppState, IpAllowlist, RateLimitState};
pub use signing::{canonical_query, normalize_secret, sign, RequestSigner};
pub use storage::EventStore;
