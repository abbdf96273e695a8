//! Webhook and health HTTP server.

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{GatewayError, Result};
use crate::exchange::BitgetClient;
use crate::ingest::AlertIngestor;
use crate::storage::EventStore;

use super::ip_allowlist::{ip_allowlist_middleware, IpAllowlist};
use super::rate_limit::{rate_limit_middleware, RateLimitState};

pub const WEBHOOK_PATH: &str = "/tradingview_webhook_endpoint_example";
pub const HEALTH_PATH: &str = "/health_endpoint";

/// Shared state for the HTTP handlers
pub struct AppState {
    pub ingestor: AlertIngestor,
    pub exchange: Arc<BitgetClient>,
    pub store: Option<Arc<EventStore>>,
}

/// Assemble the router with the configured middleware stack
pub fn build_router(
    state: Arc<AppState>,
    rate_limit: Option<RateLimitState>,
    allowlist: Option<IpAllowlist>,
) -> Router {
    let mut router = Router::new()
        .route(WEBHOOK_PATH, post(webhook_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(state);

    if let Some(limiter) = rate_limit {
        router = router.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    if let Some(allowlist) = allowlist {
        router = router.layer(middleware::from_fn_with_state(
            allowlist,
            ip_allowlist_middleware,
        ));
    }

    router.layer(TraceLayer::new_for_http())
}

/// High-frequency webhook endpoint.
///
/// Accepted alerts preempt any pending scheduled pass (via the ingestor) and
/// are executed immediately. Execution failures are contained inside
/// `place_trade`: they are alerted and logged, and the sender still gets a
/// 2xx for the accepted alert.
async fn webhook_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let intent = match state.ingestor.ingest(&body) {
        Ok(intent) => intent,
        Err(GatewayError::Unauthorized) => {
            warn!("Incorrect key received");
            // Silent drop: nothing in the response hints at why
            return StatusCode::OK.into_response();
        }
        Err(e) => {
            warn!("Invalid trade message received: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid message format").into_response();
        }
    };

    record_event(
        &state,
        "alert_accepted",
        json!({
            "symbol": intent.symbol,
            "side": intent.side,
            "trade_side": intent.trade_side,
            "size": intent.size,
            "trade_name": intent.trade_name,
        }),
    )
    .await;

    match state.exchange.place_trade(&intent).await {
        Ok(response) => {
            record_event(
                &state,
                "order_submitted",
                json!({ "symbol": intent.symbol, "response": response }),
            )
            .await;
        }
        Err(e) => {
            // Already alerted and logged inside place_trade
            record_event(
                &state,
                "order_failed",
                json!({ "symbol": intent.symbol, "error": e.to_string() }),
            )
            .await;
        }
    }

    StatusCode::NO_CONTENT.into_response()
}

async fn health_handler(connect_info: Option<ConnectInfo<SocketAddr>>) -> impl IntoResponse {
    if let Some(ConnectInfo(addr)) = connect_info {
        info!("Received health check request from IP: {}", addr.ip());
    }
    Json(json!({"status": "healthy", "message": "Server is running."}))
}

/// Best-effort audit recording; a storage failure never fails the request
async fn record_event(state: &AppState, kind: &str, detail: serde_json::Value) {
    if let Some(store) = &state.store {
        if let Err(e) = store.record_event(kind, detail).await {
            warn!("Failed to record {} event: {}", kind, e);
        }
    }
}

/// Bind and serve until the shutdown future resolves
pub async fn serve(
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    info!("Starting gateway server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| GatewayError::Internal(format!("Server error: {e}")))?;

    Ok(())
}
