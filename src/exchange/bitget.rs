//! Bitget USDT-futures REST client.
//!
//! Every call is signed; the canonical query/body string used for the
//! signature is exactly what goes on the wire, byte for byte.

use chrono::Utc;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::ExchangeConfig;
use crate::domain::{generate_client_oid, TradeIntent};
use crate::error::{GatewayError, Result};
use crate::notify::UserAlertNotifier;
use crate::signing::{canonical_query, ExchangeCredentials, RequestSigner};

pub const PLACE_ORDER_ENDPOINT: &str = "/api/v2/mix/order/place-order";

/// Exchange-level success code in response payloads
const SUCCESS_CODE: &str = "00000";

/// Order payload for `/api/v2/mix/order/place-order`.
///
/// Serialized in declaration order as compact JSON; the serialized string is
/// both signed and sent, so the two can never disagree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub symbol: String,
    pub product_type: String,
    pub margin_mode: &'static str,
    pub margin_coin: &'static str,
    pub size: String,
    pub side: String,
    pub trade_side: String,
    pub order_type: String,
    pub force: &'static str,
    pub client_oid: String,
    pub reduce_only: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

/// Build the fixed-shape order payload for a trade intent
pub fn build_order_payload(intent: &TradeIntent, client_oid: String) -> OrderPayload {
    OrderPayload {
        symbol: intent.symbol.clone(),
        product_type: intent.product_type.clone(),
        margin_mode: "isolated",
        margin_coin: "USDT",
        size: intent.size.to_string(),
        side: intent.side.to_string(),
        trade_side: intent.trade_side.to_string(),
        order_type: intent.order_type().to_string(),
        force: "gtc",
        client_oid,
        reduce_only: "NO",
        price: intent.price.map(|p| p.to_string()),
    }
}

/// Authenticated Bitget REST client
pub struct BitgetClient {
    http: Client,
    base_url: String,
    signer: RequestSigner,
    notifier: Arc<dyn UserAlertNotifier>,
    instance: String,
}

impl BitgetClient {
    pub fn new(
        config: &ExchangeConfig,
        notifier: Arc<dyn UserAlertNotifier>,
        instance: String,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent("tvgate/0.1")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                GatewayError::Internal(format!("failed to build exchange HTTP client: {e}"))
            })?;

        let credentials = ExchangeCredentials::new(
            config.api_key.clone(),
            config.api_secret.clone(),
            config.passphrase.clone(),
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signer: RequestSigner::new(credentials),
            notifier,
            instance,
        })
    }

    fn timestamp_ms() -> String {
        Utc::now().timestamp_millis().to_string()
    }

    /// Make an authenticated request and parse the response body as JSON
    /// regardless of HTTP status; callers inspect the payload for
    /// exchange-level error codes. A non-JSON response is a transport error
    /// carrying the raw text.
    pub async fn request<B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&[(String, String)]>,
        body: Option<&B>,
    ) -> Result<Value> {
        let timestamp = Self::timestamp_ms();
        let query_string = params.map(canonical_query).unwrap_or_default();
        let body_str = match body {
            Some(b) => serde_json::to_string(b)?,
            None => String::new(),
        };

        let headers = self.signer.headers(
            &timestamp,
            method.as_str(),
            endpoint,
            &query_string,
            &body_str,
        )?;

        let mut url = format!("{}{}", self.base_url, endpoint);
        if !query_string.is_empty() {
            // Parameter order on the wire must match the signed string
            url.push('?');
            url.push_str(&query_string);
        }

        let mut builder = self.http.request(method, &url).headers(headers);
        if !body_str.is_empty() {
            builder = builder.body(body_str);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        serde_json::from_str(&text).map_err(|_| GatewayError::Transport(format!("API error: {text}")))
    }

    /// Place a trade with the specified direction and quantity.
    ///
    /// Failures never escape uncaught: transport, signing, and
    /// exchange-reported errors are reported through the alert port and
    /// returned as typed errors.
    pub async fn place_trade(&self, intent: &TradeIntent) -> Result<Value> {
        match self.submit_order(intent).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(
                    "Error placing trade: {}. Instance {}",
                    e, self.instance
                );
                self.notifier
                    .notify(&format!(
                        "Error in trade execution. {} : {}. {}. Instance {}",
                        intent.side, intent.size, intent.trade_name, self.instance
                    ))
                    .await;
                Err(e)
            }
        }
    }

    async fn submit_order(&self, intent: &TradeIntent) -> Result<Value> {
        let payload = build_order_payload(intent, generate_client_oid());
        debug!(
            symbol = %payload.symbol,
            client_oid = %payload.client_oid,
            order_type = %payload.order_type,
            "submitting order"
        );

        let response = self
            .request(Method::POST, PLACE_ORDER_ENDPOINT, None, Some(&payload))
            .await?;

        match response.get("code").and_then(Value::as_str) {
            Some(code) if code != SUCCESS_CODE => {
                let message = response
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                Err(GatewayError::ExchangeRejection {
                    code: code.to_string(),
                    message,
                })
            }
            _ => Ok(response),
        }
    }
}
