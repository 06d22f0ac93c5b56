//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::{Locale, Money};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOCALE` — storefront locale (default: `"en"`)
/// - `FREE_SHIPPING_THRESHOLD_CENTS` — free-shipping unlock (default: `6000`)
/// - `QUOTE_DEBOUNCE_MS` — shipping-quote debounce window (default: `400`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub locale: Locale,
    pub free_shipping_threshold: Money,
    pub quote_debounce: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            locale: std::env::var("LOCALE")
                .map(Locale::new)
                .unwrap_or_default(),
            free_shipping_threshold: std::env::var("FREE_SHIPPING_THRESHOLD_CENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Money::from_cents)
                .unwrap_or_else(|| Money::from_major(60)),
            quote_debounce: std::env::var("QUOTE_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or_else(|| Duration::from_millis(400)),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            locale: Locale::default(),
            free_shipping_threshold: Money::from_major(60),
            quote_debounce: Duration::from_millis(400),
        }
    }
}
