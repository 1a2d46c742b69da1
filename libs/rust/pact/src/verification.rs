//! Provider verification results.

use crate::error::{PactError, PactResult};
use crate::matcher::Mismatch;
use crate::message::HttpResponse;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why an interaction failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The response did not match the pattern
    Mismatch(Mismatch),
    /// The provider did not answer within the request timeout
    Timeout(Duration),
    /// The provider could not be reached
    Transport(String),
    /// The state hook failed
    StateSetup(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch(mismatch) => write!(f, "mismatch at {mismatch}"),
            Self::Timeout(after) => write!(f, "no response within {after:?}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::StateSetup(msg) => write!(f, "state setup failed: {msg}"),
        }
    }
}

/// Outcome of verifying one interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    /// The provider honoured the interaction
    Pass,
    /// The provider broke the interaction
    Fail(FailureReason),
}

/// Verification result of one interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Interaction description
    pub interaction_description: String,
    /// Provider state the interaction required
    pub provider_state: String,
    /// Pass or failure reason
    pub outcome: Outcome,
    /// Response the provider actually sent, if any
    pub actual_response: Option<HttpResponse>,
}

impl VerificationResult {
    /// Whether the interaction passed.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self.outcome, Outcome::Pass)
    }

    /// Failure reason, if the interaction failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&FailureReason> {
        match &self.outcome {
            Outcome::Pass => None,
            Outcome::Fail(reason) => Some(reason),
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.interaction_description)?;
        if !self.provider_state.is_empty() {
            write!(f, " given '{}'", self.provider_state)?;
        }
        match &self.outcome {
            Outcome::Pass => write!(f, ": OK"),
            Outcome::Fail(reason) => write!(f, ": FAILED ({reason})"),
        }
    }
}

/// Results of a provider verification run, in artifact order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Consumer named by the artifact
    pub consumer: String,
    /// Provider named by the artifact
    pub provider: String,
    /// One result per interaction
    pub results: Vec<VerificationResult>,
}

impl VerificationReport {
    /// Whether every interaction passed.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.results.iter().all(VerificationResult::is_pass)
    }

    /// Failing results, in artifact order.
    #[must_use]
    pub fn failures(&self) -> Vec<&VerificationResult> {
        self.results.iter().filter(|r| !r.is_pass()).collect()
    }

    /// Turn a failing report into an error.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::VerificationFailed`] with one line per failing
    /// interaction.
    pub fn ensure_passed(&self) -> PactResult<()> {
        let failures = self.failures();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PactError::VerificationFailed {
                failures: failures.iter().map(ToString::to_string).collect(),
            })
        }
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().len();
        writeln!(
            f,
            "Verifying {} against contract from {}: {} interaction(s), {} failed",
            self.provider,
            self.consumer,
            self.results.len(),
            failed
        )?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        Ok(())
    }
}
