//! Weather service error types.

use forecast_pact::ParseError;
use rust_common::PlatformError;
use thiserror::Error;

/// Errors raised while fetching or reading a forecast.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WeatherError {
    /// The weather API answered with a non-success status
    #[error("Weather API returned status {status} for {url}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The forecast lacks a field the service reads, or has it in the wrong shape
    #[error("Unreadable forecast: {0}")]
    Parse(#[from] ParseError),

    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Shared platform failure
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl WeatherError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Platform(e) => e.is_retryable(),
            Self::Parse(_) => false,
        }
    }
}
