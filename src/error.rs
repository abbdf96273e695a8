use thiserror::Error;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Rate-limit backing store errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Webhook ingestion errors
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Incorrect webhook key")]
    Unauthorized,

    // Exchange call errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Exchange rejected request: code {code}, {message}")]
    ExchangeRejection { code: String, message: String },

    // Crypto/signing errors
    #[error("Signature error: {0}")]
    Signature(String),

    // Scheduler errors
    #[error("Scheduled pass failed: {0}")]
    Scheduler(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for GatewayError
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// True for rejections the webhook path answers with a client error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::InvalidFormat(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_rejection_formats_code_and_message() {
        let err = GatewayError::ExchangeRejection {
            code: "40034".to_string(),
            message: "Parameter does not match".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("40034"));
        assert!(text.contains("Parameter does not match"));
    }

    #[test]
    fn invalid_format_is_client_error() {
        assert!(GatewayError::InvalidFormat("bad utf-8".into()).is_client_error());
        assert!(!GatewayError::Unauthorized.is_client_error());
    }
}
