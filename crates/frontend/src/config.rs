//! Frontend configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (unless `API_GATEWAY_ADDR` is set)
//! - `PRODUCT_CATALOG_SERVICE_ADDR` - Catalog backend `host:port`
//! - `CART_SERVICE_ADDR` - Cart store backend `host:port`
//! - `CHECKOUT_SERVICE_ADDR` - Checkout backend `host:port`
//! - `SHIPPING_SERVICE_ADDR` - Shipping quote backend `host:port`
//! - `AUTH_SERVICE_ADDR` - Auth backend `host:port`
//!
//! ## Optional
//! - `API_GATEWAY_ADDR` - Route every backend call through one gateway `host:port`
//! - `LISTEN_ADDR` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8080)
//! - `BASE_URL` - Path prefix for every route and redirect (default: empty)
//! - `BACKEND_TIMEOUT_SECS` - Per-call backend timeout (default: 5)
//! - `COOKIE_MAX_AGE_SECS` - Max-age shared by all client cookies (default: 172800)
//! - `DEFAULT_CURRENCY` - Display currency without a cookie (default: USD)
//! - `EXCHANGE_RATES` - `CODE=rate,...` pairs added to the built-in USD-relative table
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use boutique_core::{CurrencyCode, CurrencyConverter};
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: &str = "5";
const DEFAULT_COOKIE_MAX_AGE_SECS: &str = "172800";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Frontend application configuration.
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Path prefix, without trailing slash (e.g. `/shop`)
    pub base_url: String,
    /// Backend addresses
    pub backends: BackendAddrs,
    /// Timeout applied to every outbound backend call
    pub backend_timeout: Duration,
    /// Max-age shared by every client cookie
    pub cookie_max_age: Duration,
    /// Display currency for visitors without a currency cookie
    pub default_currency: CurrencyCode,
    /// Rates added to (or replacing entries of) the built-in table
    pub exchange_rates: Vec<(CurrencyCode, f64)>,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// `host:port` of every backend the frontend consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAddrs {
    pub catalog: String,
    pub cart: String,
    pub checkout: String,
    pub shipping: String,
    pub auth: String,
}

impl BackendAddrs {
    /// Every backend reached through a single gateway.
    #[must_use]
    pub fn gateway(addr: &str) -> Self {
        Self {
            catalog: addr.to_string(),
            cart: addr.to_string(),
            checkout: addr.to_string(),
            shipping: addr.to_string(),
            auth: addr.to_string(),
        }
    }
}

/// Sentry configuration.
///
/// Implements `Debug` manually to redact the DSN, which embeds the project key.
#[derive(Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<SecretString>,
    pub environment: Option<String>,
}

impl std::fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .finish()
    }
}

impl FrontendConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("LISTEN_ADDR", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("LISTEN_ADDR".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url = normalize_base_url(&get_env_or_default("BASE_URL", ""));

        let backends = match get_optional_env("API_GATEWAY_ADDR") {
            Some(gateway) => BackendAddrs::gateway(&gateway),
            None => BackendAddrs {
                catalog: get_required_env("PRODUCT_CATALOG_SERVICE_ADDR")?,
                cart: get_required_env("CART_SERVICE_ADDR")?,
                checkout: get_required_env("CHECKOUT_SERVICE_ADDR")?,
                shipping: get_required_env("SHIPPING_SERVICE_ADDR")?,
                auth: get_required_env("AUTH_SERVICE_ADDR")?,
            },
        };

        let backend_timeout = Duration::from_secs(get_positive_secs(
            "BACKEND_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        let cookie_max_age = Duration::from_secs(get_positive_secs(
            "COOKIE_MAX_AGE_SECS",
            DEFAULT_COOKIE_MAX_AGE_SECS,
        )?);

        let default_currency = CurrencyCode::parse(&get_env_or_default("DEFAULT_CURRENCY", "USD"))
            .map_err(|e| ConfigError::InvalidEnvVar("DEFAULT_CURRENCY".to_string(), e.to_string()))?;
        let exchange_rates = get_optional_env("EXCHANGE_RATES")
            .map(|raw| parse_exchange_rates(&raw))
            .transpose()?
            .unwrap_or_default();

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN").map(SecretString::from),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
        };

        let config = Self {
            host,
            port,
            base_url,
            backends,
            backend_timeout,
            cookie_max_age,
            default_currency,
            exchange_rates,
            sentry,
        };
        // Reject bad rates at startup rather than on first conversion.
        config.converter()?;
        Ok(config)
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Build the process-wide rate table: built-in rates plus overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if an override rate is not positive and finite.
    pub fn converter(&self) -> Result<CurrencyConverter, ConfigError> {
        CurrencyConverter::default()
            .with_rates(self.exchange_rates.iter().cloned())
            .map_err(|e| ConfigError::InvalidEnvVar("EXCHANGE_RATES".to_string(), e.to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a strictly positive number of seconds.
fn get_positive_secs(key: &str, default: &str) -> Result<u64, ConfigError> {
    let value = get_env_or_default(key, default)
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

/// Strip trailing slashes and ensure a leading one (`shop/` -> `/shop`).
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Parse `CODE=rate,CODE=rate` pairs.
fn parse_exchange_rates(raw: &str) -> Result<Vec<(CurrencyCode, f64)>, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("EXCHANGE_RATES".to_string(), msg);

    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (code, rate) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected CODE=rate, got '{pair}'")))?;
            let code = CurrencyCode::parse(code.trim()).map_err(|e| invalid(e.to_string()))?;
            let rate = rate
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(format!("{code}: {e}")))?;
            Ok((code, rate))
        })
        .collect()
}
