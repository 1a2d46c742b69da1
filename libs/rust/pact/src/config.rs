//! Consumer recorder and provider verifier configuration.
//!
//! Both configs are built explicitly (builder style) or loaded from
//! environment variables via `from_env`. Parsing goes through a lookup
//! function so tests never touch the process environment.

use crate::error::{PactError, PactResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default directory contract artifacts are written to.
pub const DEFAULT_PACT_DIR: &str = "target/pacts";

/// Consumer recorder configuration.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Consumer name written to the artifact
    pub consumer: String,
    /// Provider name written to the artifact
    pub provider: String,
    /// Interface the stub server binds to
    pub host: String,
    /// Port the stub server binds to; 0 picks an ephemeral port
    pub port: u16,
    /// Directory the artifact is written to on success; `None` skips writing
    pub artifact_dir: Option<PathBuf>,
}

impl RecorderConfig {
    /// Create a configuration for a consumer/provider pair, binding an
    /// ephemeral loopback port and not writing an artifact.
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            artifact_dir: None,
        }
    }

    /// Load from `PACT_CONSUMER`, `PACT_PROVIDER`, `PACT_STUB_HOST`,
    /// `PACT_STUB_PORT` and `PACT_DIR`, after reading a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Config`] for missing names or malformed values.
    pub fn from_env() -> PactResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Config`] for missing names or malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PactResult<Self> {
        let consumer = require(&lookup, "PACT_CONSUMER")?;
        let provider = require(&lookup, "PACT_PROVIDER")?;
        let mut config = Self::new(consumer, provider);
        if let Some(host) = lookup("PACT_STUB_HOST") {
            config.host = host;
        }
        config.port = parse_var(&lookup, "PACT_STUB_PORT", 0)?;
        config.artifact_dir = Some(
            lookup("PACT_DIR").map_or_else(|| PathBuf::from(DEFAULT_PACT_DIR), PathBuf::from),
        );
        Ok(config)
    }

    /// Set the stub server port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the stub server bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Write the artifact to `dir` when the consumer run passes.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// `host:port` the stub server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Provider verifier configuration.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Per-request timeout when contacting the provider under test
    pub request_timeout: Duration,
    /// Interactions verified at once; 1 means sequential
    pub concurrency: usize,
    /// Caller's assertion that state hooks are isolated per interaction
    pub hooks_isolated: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            concurrency: 1,
            hooks_isolated: false,
        }
    }
}

impl VerifierConfig {
    /// Load from `PACT_REQUEST_TIMEOUT_MS` and `PACT_VERIFY_CONCURRENCY`,
    /// after reading a `.env` file if present.
    ///
    /// A concurrency above 1 taken from the environment still requires
    /// [`with_isolated_hooks`](Self::with_isolated_hooks) before use.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Config`] for malformed values.
    pub fn from_env() -> PactResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Config`] for malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PactResult<Self> {
        let defaults = Self::default();
        let timeout_ms = parse_var(
            &lookup,
            "PACT_REQUEST_TIMEOUT_MS",
            u64::try_from(defaults.request_timeout.as_millis()).unwrap_or(u64::MAX),
        )?;
        let concurrency = parse_var(&lookup, "PACT_VERIFY_CONCURRENCY", defaults.concurrency)?;
        Ok(Self {
            request_timeout: Duration::from_millis(timeout_ms),
            concurrency,
            ..defaults
        })
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Verify up to `concurrency` interactions at once.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Declare that state hooks do not interfere with each other.
    #[must_use]
    pub const fn with_isolated_hooks(mut self) -> Self {
        self.hooks_isolated = true;
        self
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Config`] for a zero timeout or concurrency, or
    /// for concurrent verification without isolated hooks.
    pub fn validate(&self) -> PactResult<()> {
        if self.request_timeout.is_zero() {
            return Err(PactError::config("request timeout must be greater than 0"));
        }
        if self.concurrency == 0 {
            return Err(PactError::config("concurrency must be at least 1"));
        }
        if self.concurrency > 1 && !self.hooks_isolated {
            return Err(PactError::config(
                "concurrent verification requires state hooks isolated per interaction",
            ));
        }
        Ok(())
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> PactResult<String> {
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| PactError::config(format!("missing required variable {name}")))
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> PactResult<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| PactError::config(format!("failed to parse {name}: {e}"))),
        None => Ok(default),
    }
}
