//! Type-Safe Configuration with Validation
//!
//! Loads the weather API location, credentials and logging options from
//! environment variables. Parsing goes through a lookup function so tests
//! never mutate the process environment.

use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default weather API base URL.
pub const DEFAULT_API_URL: &str = "https://api.darksky.net/forecast";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: String, reason: String },

    /// Invalid timeout value
    #[error("Invalid timeout: must be greater than 0")]
    InvalidTimeout,

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError { name: String, reason: String },
}

/// Weather service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Weather API base URL
    pub api_url: Url,
    /// API key inserted as the first path segment, when the API needs one
    pub api_key: Option<String>,
    /// Request timeout in seconds (must be > 0)
    pub timeout_secs: u64,
    /// Log level filter
    pub log_level: String,
    /// Emit JSON logs
    pub log_json: bool,
}

impl Config {
    /// Configuration for `api_url` with every other setting at its default.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    /// Loads configuration from environment variables with validation.
    ///
    /// Reads `WEATHER_API_URL`, `WEATHER_API_KEY`, `WEATHER_TIMEOUT_SECS`,
    /// `LOG_LEVEL` and `LOG_JSON`, after a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration using an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            api_url: parse_url(&lookup, "WEATHER_API_URL", DEFAULT_API_URL)?,
            api_key: lookup("WEATHER_API_KEY").filter(|key| !key.trim().is_empty()),
            timeout_secs: parse_var(&lookup, "WEATHER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: parse_var(&lookup, "LOG_JSON", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Set the request timeout in seconds.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Use `api_key` in request paths.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_url(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> Result<Url, ConfigError> {
    let url_str = lookup(name).unwrap_or_else(|| default.to_string());
    Url::parse(&url_str).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })
}
