//! Service configuration read from the environment (and `.env` via `dotenvy`).

use std::time::Duration;

use thiserror::Error;

use crate::pricing::ShippingRates;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60 * 24;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// Postgres session storage; in-memory storage when unset.
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    /// Storefront cart API; an in-memory cart backend is used when unset.
    pub cart_api_url: Option<String>,
    pub order_api_url: Option<String>,
    pub api_timeout: Duration,
    pub session_ttl_secs: i64,
    pub shipping_rates: ShippingRates,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|e| invalid("PORT", e))?,
            None => DEFAULT_PORT,
        };
        let api_timeout_secs: u64 = match var("CART_API_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|e| invalid("CART_API_TIMEOUT_SECS", e))?,
            None => DEFAULT_API_TIMEOUT_SECS,
        };
        if api_timeout_secs == 0 {
            return Err(invalid("CART_API_TIMEOUT_SECS", "must be positive"));
        }
        let session_ttl_secs = match var("SESSION_TTL_SECS") {
            Some(raw) => raw.parse().map_err(|e| invalid("SESSION_TTL_SECS", e))?,
            None => DEFAULT_SESSION_TTL_SECS,
        };
        let shipping_rates = match var("SHIPPING_RATES") {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| invalid("SHIPPING_RATES", e))?,
            None => ShippingRates::default(),
        };
        let cart_api_url = var("CART_API_URL");
        let order_api_url = var("ORDER_API_URL").or_else(|| cart_api_url.clone());

        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            nats_url: var("NATS_URL"),
            cart_api_url,
            order_api_url,
            api_timeout: Duration::from_secs(api_timeout_secs),
            session_ttl_secs,
            shipping_rates,
        })
    }
}

fn invalid(key: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid { key, reason: reason.to_string() }
}
