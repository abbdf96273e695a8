use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

use crate::domain::{Side, TradeSide};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub exchange: ExchangeConfig,
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Identifier included in operational alerts so multi-instance
    /// deployments can be told apart.
    #[serde(default = "default_instance")]
    pub instance: String,
    /// Only the main instance runs the periodic scheduler.
    #[serde(default)]
    pub main_api: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the webhook/health server
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Clone, Deserialize)]
pub struct WebhookConfig {
    /// Shared key expected inside every alert message
    pub shared_key: String,
    /// Client IPs allowed to reach the webhook/health routes.
    /// Empty list disables the check.
    #[serde(default)]
    pub allowed_ips: Vec<String>,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("shared_key", &"***")
            .field("allowed_ips", &self.allowed_ips)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct ExchangeConfig {
    /// REST API base URL
    #[serde(default = "default_exchange_base_url")]
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
    /// Bounded timeout on every exchange call; an unbounded call would
    /// hold the processing-active flag indefinitely.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("passphrase", &"***")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_exchange_base_url() -> String {
    "https://api.bitget.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduled firings
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Length of the cancellation-polled delay window, in ticks
    #[serde(default = "default_delay_ticks")]
    pub delay_ticks: u32,
    /// Tick duration in milliseconds (1s in production; tests shrink it)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Trade submitted when a firing survives the delay window
    pub trade: PeriodicTradeConfig,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_delay_ticks() -> u32 {
    30
}

fn default_tick_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeriodicTradeConfig {
    pub symbol: String,
    pub side: Side,
    pub trade_side: TradeSide,
    pub size: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default = "default_product_type")]
    pub product_type: String,
    #[serde(default = "default_trade_name")]
    pub trade_name: String,
}

fn default_product_type() -> String {
    "USDT-FUTURES".to_string()
}

fn default_trade_name() -> String {
    "Scheduled".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Redis connection URL; unset disables rate limiting
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Requests allowed per window, per client
    #[serde(default = "default_rate_limit")]
    pub limit: u32,
    /// Window length in seconds
    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            limit: default_rate_limit(),
            window_secs: default_rate_window_secs(),
        }
    }
}

fn default_rate_limit() -> u32 {
    5
}

fn default_rate_window_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; unset disables the audit store
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertingConfig {
    /// Webhook URL for operational user alerts; unset disables delivery
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_instance() -> String {
    "1".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("rate_limit.limit", 5)?
            .set_default("rate_limit.window_secs", 60)?
            .set_default("database.max_connections", 5)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("TVGATE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TVGATE_SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("TVGATE")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.apply_bare_env_overrides();
        Ok(config)
    }

    /// Overrides from the handful of unprefixed variables deployments
    /// conventionally set: API_KEY, MAIN_API, DATABASE_URL, REDIS_URL,
    /// INSTANCE_ID.
    fn apply_bare_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("API_KEY") {
            if !key.is_empty() {
                self.webhook.shared_key = key;
            }
        }
        if let Ok(flag) = std::env::var("MAIN_API") {
            self.main_api = parse_bool_flag(&flag);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = Some(url);
            }
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            if !url.is_empty() {
                self.rate_limit.redis_url = Some(url);
            }
        }
        if let Ok(id) = std::env::var("INSTANCE_ID") {
            if !id.is_empty() {
                self.instance = id;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.webhook.shared_key.is_empty() {
            errors.push("webhook.shared_key must be set".to_string());
        }

        if self.exchange.api_key.is_empty()
            || self.exchange.api_secret.is_empty()
            || self.exchange.passphrase.is_empty()
        {
            errors.push("exchange credentials must be set".to_string());
        }

        if self.exchange.request_timeout_secs == 0 {
            errors.push("exchange.request_timeout_secs must be positive".to_string());
        }

        if self.scheduler.delay_ticks == 0 {
            errors.push("scheduler.delay_ticks must be positive".to_string());
        }

        if self.scheduler.tick_ms == 0 {
            errors.push("scheduler.tick_ms must be positive".to_string());
        }

        if self.scheduler.trade.size <= Decimal::ZERO {
            errors.push("scheduler.trade.size must be positive".to_string());
        }

        if let Some(price) = self.scheduler.trade.price {
            if price <= Decimal::ZERO {
                errors.push("scheduler.trade.price must be positive".to_string());
            }
        }

        if self.rate_limit.limit == 0 {
            errors.push("rate_limit.limit must be positive".to_string());
        }

        if self.rate_limit.window_secs == 0 {
            errors.push("rate_limit.window_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Boolean-like flag parsing: "true", "1", "yes", "on" (case-insensitive).
pub fn parse_bool_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            webhook: WebhookConfig {
                shared_key: "secret".to_string(),
                allowed_ips: Vec::new(),
            },
            exchange: ExchangeConfig {
                base_url: default_exchange_base_url(),
                api_key: "bg-access-key".to_string(),
                api_secret: "bg-hmac-secret".to_string(),
                passphrase: "bg-passphrase".to_string(),
                request_timeout_secs: 10,
            },
            scheduler: SchedulerConfig {
                interval_secs: 300,
                delay_ticks: 30,
                tick_ms: 1000,
                trade: PeriodicTradeConfig {
                    symbol: "BTCUSDT".to_string(),
                    side: Side::Buy,
                    trade_side: TradeSide::Open,
                    size: dec!(0.001),
                    price: None,
                    product_type: default_product_type(),
                    trade_name: default_trade_name(),
                },
            },
            rate_limit: RateLimitSettings::default(),
            database: DatabaseConfig::default(),
            alerting: AlertingConfig::default(),
            logging: LoggingConfig::default(),
            instance: default_instance(),
            main_api: false,
        }
    }

    #[test]
    fn bool_flag_parsing_matches_deploy_conventions() {
        for truthy in ["true", "1", "yes", "on", "TRUE", " On "] {
            assert!(parse_bool_flag(truthy), "{truthy} should parse as true");
        }
        for falsy in ["false", "0", "no", "off", ""] {
            assert!(!parse_bool_flag(falsy), "{falsy} should parse as false");
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn missing_shared_key_fails_validation() {
        let mut config = sample_config();
        config.webhook.shared_key.clear();
        let errors = config.validate().expect_err("must fail");
        assert!(errors.iter().any(|e| e.contains("shared_key")));
    }

    #[test]
    fn non_positive_trade_size_fails_validation() {
        let mut config = sample_config();
        config.scheduler.trade.size = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn secrets_are_masked_in_debug_output() {
        let config = sample_config();
        let debug = format!("{:?}", config.exchange);
        assert!(!debug.contains("bg-hmac-secret"));
        assert!(!debug.contains("bg-passphrase"));
        assert!(debug.contains("***"));
    }
}
