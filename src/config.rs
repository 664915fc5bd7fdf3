use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_SHIPPING_FEE: u64 = 30_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAYMENT_EXPIRE_MINUTES: i64 = 15;
const CONFIG_DIR: &str = "config";

/// Payment gateway configuration (VNPay sandbox contract).
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct VnpayConfig {
    /// Merchant terminal code issued by the gateway
    #[validate(length(min = 1))]
    pub tmn_code: String,

    /// HMAC-SHA512 secret shared with the gateway
    #[validate(length(min = 16))]
    pub hash_secret: String,

    /// Gateway payment page URL
    #[serde(default = "default_vnpay_url")]
    #[validate(url)]
    pub payment_url: String,

    /// Return URL the gateway redirects to after the customer pays
    #[validate(url)]
    pub return_url: String,

    /// Minutes until a payment request expires
    #[serde(default = "default_payment_expire_minutes")]
    pub expire_minutes: i64,
}

impl Default for VnpayConfig {
    fn default() -> Self {
        Self {
            tmn_code: "DEMO".to_string(),
            hash_secret: "development_hash_secret_not_for_production".to_string(),
            payment_url: default_vnpay_url(),
            return_url: "http://localhost:8080/project/vnpay-ipn".to_string(),
            expire_minutes: default_payment_expire_minutes(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Base URL of the hosted realtime-database REST surface
    #[validate(url)]
    pub rtdb_base_url: String,

    /// Flat shipping fee applied at checkout (store currency units)
    #[serde(default = "default_shipping_fee")]
    pub shipping_fee: Decimal,

    /// HTTP timeout for backend calls in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Payment gateway configuration
    #[serde(default)]
    #[validate]
    pub vnpay: VnpayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rtdb_base_url: "http://localhost:9000".to_string(),
            shipping_fee: default_shipping_fee(),
            request_timeout_secs: default_request_timeout_secs(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            vnpay: VnpayConfig::default(),
        }
    }
}

fn default_shipping_fee() -> Decimal {
    Decimal::from(DEFAULT_SHIPPING_FEE)
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_vnpay_url() -> String {
    "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string()
}

fn default_payment_expire_minutes() -> i64 {
    DEFAULT_PAYMENT_EXPIRE_MINUTES
}

/// Loads configuration from layered sources: `config/default`, the
/// per-environment file selected by `RUN_ENV`, then `APP__*` environment
/// variables (double underscore separates nesting, e.g.
/// `APP__VNPAY__TMN_CODE`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    Ok(app)
}

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set and non-empty.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("carmart_core={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.shipping_fee, Decimal::from(30_000u64));
        assert_eq!(cfg.vnpay.expire_minutes, 15);
    }

    #[test]
    fn short_hash_secret_is_rejected() {
        let cfg = AppConfig {
            vnpay: VnpayConfig {
                hash_secret: "short".to_string(),
                ..VnpayConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let cfg = AppConfig {
            rtdb_base_url: "not a url".to_string(),
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
