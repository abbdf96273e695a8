//! Bitget request signing.
//!
//! The exchange rejects every request whose signature is not bit-exact, so
//! message construction, secret normalization, and query canonicalization all
//! live here as pure functions.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use sha2::Sha256;

use crate::error::{GatewayError, Result};

type HmacSha256 = Hmac<Sha256>;

/// API credentials for authenticated exchange calls
#[derive(Clone)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl ExchangeCredentials {
    pub fn new(api_key: String, api_secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            api_secret,
            passphrase,
        }
    }
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("passphrase", &"***")
            .finish()
    }
}

/// Normalize a secret before HMAC keying: strip surrounding whitespace,
/// then trailing `=` padding. Keys are sometimes pasted with either.
pub fn normalize_secret(secret: &str) -> &str {
    secret.trim().trim_end_matches('=')
}

/// Canonical query string: keys sorted ordinally, `key=value` joined by `&`.
///
/// The same ordering must be sent on the wire, so callers append this string
/// to the URL verbatim instead of letting the HTTP client re-encode params.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = params.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the message to sign for a request
fn build_message(
    timestamp: &str,
    method: &str,
    path: &str,
    query_string: &str,
    body: &str,
) -> String {
    let method = method.to_uppercase();
    if !query_string.is_empty() && !path.contains('?') {
        format!("{timestamp}{method}{path}?{query_string}{body}")
    } else {
        format!("{timestamp}{method}{path}{body}")
    }
}

/// Create the base64 HMAC-SHA256 signature for a request.
///
/// Pure function: same inputs always produce the same signature.
pub fn sign(
    secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    query_string: &str,
    body: &str,
) -> Result<String> {
    let message = build_message(timestamp, method, path, query_string, body);

    let mut mac = HmacSha256::new_from_slice(normalize_secret(secret).as_bytes())
        .map_err(|e| GatewayError::Signature(format!("HMAC init failed: {e}")))?;
    mac.update(message.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Builds the exchange's signed-request headers
#[derive(Clone)]
pub struct RequestSigner {
    credentials: ExchangeCredentials,
}

impl RequestSigner {
    pub fn new(credentials: ExchangeCredentials) -> Self {
        Self { credentials }
    }

    /// Authentication headers for one request
    pub fn headers(
        &self,
        timestamp: &str,
        method: &str,
        path: &str,
        query_string: &str,
        body: &str,
    ) -> Result<HeaderMap> {
        let signature = sign(
            &self.credentials.api_secret,
            timestamp,
            method,
            path,
            query_string,
            body,
        )?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("access-key"),
            HeaderValue::from_str(&self.credentials.api_key)
                .map_err(|e| GatewayError::Signature(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            HeaderName::from_static("access-sign"),
            HeaderValue::from_str(&signature)
                .map_err(|e| GatewayError::Signature(format!("invalid signature header: {e}")))?,
        );
        headers.insert(
            HeaderName::from_static("access-passphrase"),
            HeaderValue::from_str(&self.credentials.passphrase)
                .map_err(|e| GatewayError::Signature(format!("invalid passphrase header: {e}")))?,
        );
        headers.insert(
            HeaderName::from_static("access-timestamp"),
            HeaderValue::from_str(timestamp)
                .map_err(|e| GatewayError::Signature(format!("invalid timestamp header: {e}")))?,
        );
        headers.insert(
            HeaderName::from_static("locale"),
            HeaderValue::from_static("en-US"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }
}
