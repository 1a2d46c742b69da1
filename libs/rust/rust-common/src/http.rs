//! Shared reqwest client construction.
//!
//! Every outbound client in the forecast platform (the weather API client
//! and the contract verifier talking to a live provider) is built here so
//! timeouts, pooling and TLS stay consistent.

use crate::PlatformError;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Outbound HTTP settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout (default: 30s)
    pub timeout: Duration,
    /// TCP connect timeout (default: 10s)
    pub connect_timeout: Duration,
    /// How long an idle pooled connection is kept (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Idle connections kept per host; 0 disables pooling (default: 10)
    pub pool_max_idle_per_host: usize,
    /// `User-Agent` sent with every request
    pub user_agent: String,
    /// `Accept` sent with every request, if any
    pub accept: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: "forecast-platform-rust/1.0".to_string(),
            accept: None,
        }
    }
}

impl HttpConfig {
    /// Set the whole-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Send `Accept: {media_type}` by default.
    #[must_use]
    pub fn with_accept(mut self, media_type: impl Into<String>) -> Self {
        self.accept = Some(media_type.into());
        self
    }

    /// Disable connection pooling; every request opens a fresh connection.
    #[must_use]
    pub const fn without_pooling(mut self) -> Self {
        self.pool_max_idle_per_host = 0;
        self
    }
}

/// Build a reqwest client (rustls) from `config`.
///
/// # Errors
///
/// - [`PlatformError::InvalidInput`] if the `Accept` value is not a valid
///   header value
/// - [`PlatformError::Http`] if the client cannot be built
///
/// # Examples
///
/// ```
/// use rust_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default()
///     .with_timeout(Duration::from_secs(5))
///     .with_accept("application/json")
///     .without_pooling();
/// let client = build_http_client(&config).expect("Failed to build client");
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, PlatformError> {
    let mut headers = HeaderMap::new();
    if let Some(accept) = &config.accept {
        let value = HeaderValue::from_str(accept)
            .map_err(|e| PlatformError::invalid_input(format!("accept header: {e}")))?;
        headers.insert(ACCEPT, value);
    }

    let client = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .use_rustls_tls()
        .build()?;
    Ok(client)
}
