//! Centralized error types for all Rust libraries.
//!
//! This module provides a unified error type that can be used across the
//! forecast-platform crates, with built-in retryability classification.

use thiserror::Error;

/// Common error type for platform operations.
///
/// All errors are classified as either retryable or non-retryable,
/// which helps callers decide whether to retry failed operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem or socket I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout occurred
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are transient failures that may succeed on retry,
    /// such as network issues or temporary unavailability.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::Timeout("forecast".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::InvalidInput("latitude".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
