//! Contract engine error types using thiserror 2.0.
//!
//! Errors split into two families. Setup errors (a frozen store, a malformed
//! artifact, a missing state hook, a port conflict) are fatal: they mean the
//! test harness is broken and the run stops. Contract violations are
//! collected and reported together at the end of a run.

use crate::consumer::ConsumerFailure;
use crate::verification::VerificationResult;
use rust_common::PlatformError;
use std::time::Duration;
use thiserror::Error;

/// Contract engine errors.
#[derive(Error, Debug)]
pub enum PactError {
    /// An interaction with the same provider state and description exists
    #[error("Duplicate interaction '{description}' for provider state '{provider_state}'")]
    DuplicateInteraction {
        /// Provider state of the rejected interaction
        provider_state: String,
        /// Description of the rejected interaction
        description: String,
    },

    /// The store no longer accepts interactions
    #[error("Interaction store is frozen; interactions cannot be recorded once the stub server has started")]
    StoreFrozen,

    /// A pattern failed validation
    #[error("Invalid pattern at {path}: {reason}")]
    InvalidPattern {
        /// Path to the invalid matcher
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// A consumer run was started without interactions
    #[error("No interactions declared; a consumer test must declare at least one")]
    NoInteractions,

    /// The stub server could not bind its port
    #[error("Failed to bind stub server to {addr}: {source}")]
    PortBind {
        /// Requested address
        addr: String,
        /// Underlying bind error
        #[source]
        source: std::io::Error,
    },

    /// The consumer run finished with unexercised or unmatched interactions
    #[error("Consumer verification failed:\n{}", format_lines(.failures))]
    ConsumerVerificationFailed {
        /// Every failure observed during the run
        failures: Vec<ConsumerFailure>,
    },

    /// A contract artifact could not be parsed
    #[error("Invalid contract artifact at {path}: {reason}")]
    ArtifactParse {
        /// Path inside the artifact, e.g. `interactions[0].request.method`
        path: String,
        /// What is wrong
        reason: String,
    },

    /// No state hook is registered for a declared provider state
    #[error("No state hook registered for provider state '{state}' (interaction '{interaction}')")]
    MissingStateHook {
        /// The provider state without a hook
        state: String,
        /// The interaction that declared it
        interaction: String,
        /// Results of the interactions verified before the run stopped
        completed: Vec<VerificationResult>,
    },

    /// Provider verification finished with failing interactions
    #[error("Provider verification failed:\n{}", .failures.join("\n"))]
    VerificationFailed {
        /// One line per failing interaction
        failures: Vec<String>,
    },

    /// The provider did not answer in time
    #[error("Provider did not respond within {0:?}")]
    Timeout(Duration),

    /// The provider could not be reached or sent an unreadable response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Platform error (from rust-common)
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for contract engine operations.
pub type PactResult<T> = Result<T, PactError>;

impl PactError {
    /// Whether this error means the test setup is broken, as opposed to a
    /// contract violation or a transient failure.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateInteraction { .. }
                | Self::StoreFrozen
                | Self::InvalidPattern { .. }
                | Self::NoInteractions
                | Self::PortBind { .. }
                | Self::ArtifactParse { .. }
                | Self::MissingStateHook { .. }
                | Self::Config(_)
        )
    }

    /// Create an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an artifact parse error.
    #[must_use]
    pub fn artifact(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArtifactParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

fn format_lines<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PactError::artifact("interactions[0].request", "missing field 'method'");
        assert_eq!(
            err.to_string(),
            "Invalid contract artifact at interactions[0].request: missing field 'method'"
        );
    }

    #[test]
    fn test_fatal_errors() {
        assert!(PactError::StoreFrozen.is_fatal());
        assert!(PactError::NoInteractions.is_fatal());
        assert!(PactError::artifact("consumer", "missing").is_fatal());
        assert!(
            PactError::MissingStateHook {
                state: "weather forecast data".to_string(),
                interaction: "forecast for Hamburg".to_string(),
                completed: vec![],
            }
            .is_fatal()
        );
        assert!(!PactError::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(!PactError::transport("connection refused").is_fatal());
        assert!(!PactError::VerificationFailed { failures: vec![] }.is_fatal());
    }

    #[test]
    fn test_consumer_failures_are_listed() {
        let err = PactError::ConsumerVerificationFailed {
            failures: vec![ConsumerFailure::UnexercisedInteraction {
                provider_state: "weather forecast data".to_string(),
                description: "forecast for Hamburg".to_string(),
            }],
        };
        let text = err.to_string();
        assert!(text.contains("forecast for Hamburg"));
        assert!(text.contains("never invoked"));
    }

    #[test]
    fn test_from_platform_error() {
        let platform_err = PlatformError::unavailable("weather-api");
        let err: PactError = platform_err.into();
        assert!(matches!(err, PactError::Platform(_)));
    }
}
