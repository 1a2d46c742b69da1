//! Verification matrix for can-i-deploy decisions.
//!
//! Each provider run yields one [`MatrixEntry`] per consumer contract. A
//! version may be deployed only when every entry it takes part in verified.

use crate::verification::VerificationReport;
use serde::{Deserialize, Serialize};

/// Result of a can-i-deploy check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanIDeployResult {
    /// Whether deployment is allowed
    pub ok: bool,
    /// Human-readable reason
    pub reason: String,
    /// Entries the decision was based on
    pub matrix: Vec<MatrixEntry>,
}

impl CanIDeployResult {
    /// Decide from matrix entries.
    #[must_use]
    pub fn from_matrix(matrix: Vec<MatrixEntry>) -> Self {
        let failed: Vec<_> = matrix
            .iter()
            .filter(|e| !e.success)
            .map(|e| {
                format!(
                    "{} ({}) -> {} ({}): {} failing interaction(s)",
                    e.consumer, e.consumer_version, e.provider, e.provider_version, e.failed_interactions
                )
            })
            .collect();

        let ok = failed.is_empty();
        let reason = if ok {
            format!("All {} contract(s) verified", matrix.len())
        } else {
            format!("Verification failed: {}", failed.join(", "))
        };

        Self { ok, reason, matrix }
    }

    /// Check if deployment is allowed.
    #[must_use]
    pub const fn can_deploy(&self) -> bool {
        self.ok
    }
}

/// One verified consumer/provider pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixEntry {
    /// Consumer name
    pub consumer: String,
    /// Consumer version the contract came from
    pub consumer_version: String,
    /// Provider name
    pub provider: String,
    /// Provider version that was verified
    pub provider_version: String,
    /// Whether every interaction passed
    pub success: bool,
    /// Number of interactions verified
    pub interactions: usize,
    /// Number of failing interactions
    pub failed_interactions: usize,
}

impl MatrixEntry {
    /// Summarise a verification report.
    #[must_use]
    pub fn from_report(
        report: &VerificationReport,
        consumer_version: impl Into<String>,
        provider_version: impl Into<String>,
    ) -> Self {
        let failed_interactions = report.failures().len();
        Self {
            consumer: report.consumer.clone(),
            consumer_version: consumer_version.into(),
            provider: report.provider.clone(),
            provider_version: provider_version.into(),
            success: failed_interactions == 0,
            interactions: report.results.len(),
            failed_interactions,
        }
    }
}
