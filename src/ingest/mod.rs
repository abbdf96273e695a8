//! Inbound webhook alert ingestion.
//!
//! Validates and parses alert messages pushed by the signal source,
//! authenticates them by shared key, and produces typed trade intents.
//! Rejections carry no detail back to the sender beyond an HTTP status.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;

use crate::coordinator::ExecutionCoordinator;
use crate::domain::{Side, TradeIntent, TradeSide};
use crate::error::{GatewayError, Result};

/// Wire format of an alert message. The format is owned by the signal
/// source; unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct AlertMessage {
    api_key: String,
    symbol: String,
    side: Side,
    trade_side: TradeSide,
    size: Decimal,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default = "default_product_type")]
    product_type: String,
    #[serde(default = "default_trade_name")]
    trade_name: String,
}

fn default_product_type() -> String {
    "USDT-FUTURES".to_string()
}

fn default_trade_name() -> String {
    "Default".to_string()
}

/// Parses and authenticates inbound webhook bodies
pub struct AlertIngestor {
    shared_key: String,
    coordinator: Arc<ExecutionCoordinator>,
}

impl AlertIngestor {
    pub fn new(shared_key: String, coordinator: Arc<ExecutionCoordinator>) -> Self {
        Self {
            shared_key,
            coordinator,
        }
    }

    /// Validate a raw webhook body into a trade intent.
    ///
    /// On success the raw body is recorded as the last alert and the
    /// cancellation signal is raised so any pending scheduled pass yields.
    /// Rejections leave the coordinator untouched.
    pub fn ingest(&self, raw: &[u8]) -> Result<TradeIntent> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| GatewayError::InvalidFormat(format!("body is not UTF-8: {e}")))?;

        let message: AlertMessage = serde_json::from_str(text)
            .map_err(|e| GatewayError::InvalidFormat(e.to_string()))?;

        if message.api_key != self.shared_key {
            return Err(GatewayError::Unauthorized);
        }

        let intent = TradeIntent::new(
            message.symbol,
            message.side,
            message.trade_side,
            message.size,
            message.price,
            message.product_type,
            message.trade_name,
        )
        .map_err(|e| GatewayError::InvalidFormat(e.to_string()))?;

        self.coordinator.store_alert(raw);
        self.coordinator.notify_alert();

        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderType;
    use rust_decimal_macros::dec;

    const KEY: &str = "webhook-secret";

    fn ingestor() -> (AlertIngestor, Arc<ExecutionCoordinator>) {
        let coordinator = Arc::new(ExecutionCoordinator::new());
        (
            AlertIngestor::new(KEY.to_string(), coordinator.clone()),
            coordinator,
        )
    }

    #[test]
    fn accepts_valid_alert_and_signals_cancellation() {
        let (ingestor, coordinator) = ingestor();
        let body = format!(
            r#"{{"api_key":"{KEY}","symbol":"BTCUSDT","side":"buy","trade_side":"open","size":"0.001"}}"#
        );

        let intent = ingestor.ingest(body.as_bytes()).expect("valid alert");
        assert_eq!(intent.symbol, "BTCUSDT");
        assert_eq!(intent.size, dec!(0.001));
        assert_eq!(intent.order_type(), OrderType::Market);
        assert_eq!(intent.product_type, "USDT-FUTURES");
        assert_eq!(intent.trade_name, "Default");

        assert!(coordinator.cancel_pending());
        assert_eq!(coordinator.last_alert(), body.as_bytes());
    }

    #[test]
    fn carries_optional_price_through() {
        let (ingestor, _) = ingestor();
        let body = format!(
            r#"{{"api_key":"{KEY}","symbol":"ETHUSDT","side":"sell","trade_side":"close","size":"1.5","price":"2000","trade_name":"TP1"}}"#
        );

        let intent = ingestor.ingest(body.as_bytes()).expect("valid alert");
        assert_eq!(intent.price, Some(dec!(2000)));
        assert_eq!(intent.order_type(), OrderType::Limit);
        assert_eq!(intent.trade_name, "TP1");
    }

    #[test]
    fn malformed_body_is_rejected_without_touching_state() {
        let (ingestor, coordinator) = ingestor();

        let err = ingestor.ingest(b"not json at all").expect_err("must reject");
        assert!(matches!(err, GatewayError::InvalidFormat(_)));

        assert!(!coordinator.cancel_pending());
        assert!(coordinator.last_alert().is_empty());
    }

    #[test]
    fn non_utf8_body_is_invalid_format() {
        let (ingestor, _) = ingestor();
        let err = ingestor
            .ingest(&[0xff, 0xfe, 0x00])
            .expect_err("must reject");
        assert!(matches!(err, GatewayError::InvalidFormat(_)));
    }

    #[test]
    fn wrong_key_is_dropped_silently() {
        let (ingestor, coordinator) = ingestor();
        let body = r#"{"api_key":"guess","symbol":"BTCUSDT","side":"buy","trade_side":"open","size":"0.001"}"#;

        let err = ingestor.ingest(body.as_bytes()).expect_err("must reject");
        assert!(matches!(err, GatewayError::Unauthorized));

        // No intent produced, no cancellation signaled
        assert!(!coordinator.cancel_pending());
        assert!(coordinator.last_alert().is_empty());
    }

    #[test]
    fn zero_size_is_invalid_format() {
        let (ingestor, coordinator) = ingestor();
        let body = format!(
            r#"{{"api_key":"{KEY}","symbol":"BTCUSDT","side":"buy","trade_side":"open","size":"0"}}"#
        );

        let err = ingestor.ingest(body.as_bytes()).expect_err("must reject");
        assert!(matches!(err, GatewayError::InvalidFormat(_)));
        assert!(!coordinator.cancel_pending());
    }
}
