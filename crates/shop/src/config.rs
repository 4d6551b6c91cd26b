//! Shop configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOP_OPERATOR_IDS` - Comma-separated user ids notified on new orders
//!
//! ## Optional
//! - `SHOP_ORDER_PREFIX` - Order number prefix (default: `DF`, 1-8
//!   alphanumeric ASCII characters)
//! - `SHOP_CHECKOUT_TIMEOUT_SECS` - Checkout dialogue idle window in
//!   seconds (default: 600)
//! - `SHOP_SELECTION_TTL_SECS` - Idle lifetime of in-progress option
//!   selections in seconds (default: 300)

use std::time::Duration;

use thiserror::Error;

use dragonfruit_core::UserId;

const DEFAULT_ORDER_PREFIX: &str = "DF";
const DEFAULT_CHECKOUT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_SELECTION_TTL_SECS: u64 = 300;
const MAX_ORDER_PREFIX_LENGTH: usize = 8;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Fulfillment core configuration.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Prefix of generated order numbers.
    pub order_prefix: String,
    /// Idle window after which a checkout dialogue expires.
    pub checkout_idle_timeout: Duration,
    /// Idle lifetime of in-progress option selections.
    pub selection_ttl: Duration,
    /// Operators notified when an order is created.
    pub operator_ids: Vec<UserId>,
}

impl ShopConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any
    /// value fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let order_prefix = std::env::var("SHOP_ORDER_PREFIX")
            .unwrap_or_else(|_| DEFAULT_ORDER_PREFIX.to_owned());
        validate_prefix(&order_prefix)?;

        let checkout_idle_timeout = Duration::from_secs(parse_secs(
            "SHOP_CHECKOUT_TIMEOUT_SECS",
            DEFAULT_CHECKOUT_TIMEOUT_SECS,
        )?);
        let selection_ttl = Duration::from_secs(parse_secs(
            "SHOP_SELECTION_TTL_SECS",
            DEFAULT_SELECTION_TTL_SECS,
        )?);

        let raw_operators = std::env::var("SHOP_OPERATOR_IDS")
            .map_err(|_| ConfigError::MissingEnvVar("SHOP_OPERATOR_IDS".to_owned()))?;
        let operator_ids = parse_operator_ids(&raw_operators)?;

        Ok(Self {
            order_prefix,
            checkout_idle_timeout,
            selection_ttl,
            operator_ids,
        })
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    let ok = !prefix.is_empty()
        && prefix.len() <= MAX_ORDER_PREFIX_LENGTH
        && prefix.chars().all(|c| c.is_ascii_alphanumeric());
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "SHOP_ORDER_PREFIX".to_owned(),
            "must be 1-8 alphanumeric ASCII characters".to_owned(),
        ))
    }
}

fn parse_secs(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(var.to_owned(), "must be a positive integer".to_owned())
            }),
        Err(_) => Ok(default),
    }
}

fn parse_operator_ids(raw: &str) -> Result<Vec<UserId>, ConfigError> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id: i64 = part.parse().map_err(|_| {
            ConfigError::InvalidEnvVar(
                "SHOP_OPERATOR_IDS".to_owned(),
                format!("not a user id: {part}"),
            )
        })?;
        ids.push(UserId::new(id));
    }
    Ok(ids)
}
