use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{GatewayError, Result};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Side {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err("invalid side; expected buy|sell"),
        }
    }
}

/// Whether the order opens or closes a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Open,
    Close,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Open => "open",
            TradeSide::Close => "close",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TradeSide::Open),
            "close" => Ok(TradeSide::Close),
            _ => Err("invalid trade side; expected open|close"),
        }
    }
}

/// Order type, derived from price presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully-specified, not-yet-submitted order description.
///
/// Immutable once constructed; field constraints are checked in `new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub side: Side,
    pub trade_side: TradeSide,
    pub size: Decimal,
    /// Limit price; absent means market order
    pub price: Option<Decimal>,
    pub product_type: String,
    pub trade_name: String,
}

impl TradeIntent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        trade_side: TradeSide,
        size: Decimal,
        price: Option<Decimal>,
        product_type: impl Into<String>,
        trade_name: impl Into<String>,
    ) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(GatewayError::Validation("symbol is empty".to_string()));
        }
        if size <= Decimal::ZERO {
            return Err(GatewayError::Validation(format!(
                "size must be positive, got {size}"
            )));
        }
        if let Some(price) = price {
            if price <= Decimal::ZERO {
                return Err(GatewayError::Validation(format!(
                    "price must be positive, got {price}"
                )));
            }
        }

        Ok(Self {
            symbol,
            side,
            trade_side,
            size,
            price,
            product_type: product_type.into(),
            trade_name: trade_name.into(),
        })
    }

    /// "limit" when a price was supplied, "market" otherwise
    pub fn order_type(&self) -> OrderType {
        if self.price.is_some() {
            OrderType::Limit
        } else {
            OrderType::Market
        }
    }
}

static OID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a client order id, unique per call.
///
/// Millisecond wall-clock plus a process-local counter; two submissions
/// inside the same millisecond still get distinct ids.
pub fn generate_client_oid() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = OID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("tvgate_{millis}_{seq}")
}
