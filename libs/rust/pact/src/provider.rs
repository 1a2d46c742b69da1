//! Provider verifier.
//!
//! Replays every interaction of a contract against the provider under test
//! and checks each response against its pattern. Verification is
//! exhaustive: a failing interaction is recorded and the run moves on, so a
//! single run reports every broken interaction. Only a missing state hook
//! stops the run, since the provider cannot claim a state it cannot set up.

use crate::artifact::ContractArtifact;
use crate::client::ProviderClient;
use crate::config::VerifierConfig;
use crate::contract::Interaction;
use crate::error::{PactError, PactResult};
use crate::message::HttpResponse;
use crate::state::StateHooks;
use crate::verification::{FailureReason, Outcome, VerificationReport, VerificationResult};
use futures::StreamExt;
use futures::stream;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Verifies a provider against contract artifacts.
#[derive(Debug)]
pub struct ProviderVerifier<C> {
    config: VerifierConfig,
    client: C,
    hooks: StateHooks,
}

impl<C: ProviderClient> ProviderVerifier<C> {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Config`] if `config` does not validate, e.g.
    /// concurrent verification without isolated hooks.
    pub fn new(config: VerifierConfig, client: C, hooks: StateHooks) -> PactResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client,
            hooks,
        })
    }

    /// Verifier configuration.
    #[must_use]
    pub const fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify every interaction of `artifact`, in artifact order.
    ///
    /// The returned report may contain failures; use
    /// [`VerificationReport::ensure_passed`] to turn them into an error.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::MissingStateHook`] when an interaction declares a
    /// provider state with no registered hook. The error carries the results
    /// of the interactions verified before it.
    #[instrument(skip_all, fields(
        consumer = %artifact.consumer,
        provider = %artifact.provider,
        interactions = artifact.interactions.len(),
        concurrency = self.config.concurrency,
    ))]
    pub async fn verify(&self, artifact: &ContractArtifact) -> PactResult<VerificationReport> {
        let mut steps = stream::iter(&artifact.interactions)
            .map(|interaction| async move { (interaction, self.verify_interaction(interaction).await) })
            .buffered(self.config.concurrency);

        let mut results = Vec::with_capacity(artifact.interactions.len());
        while let Some((interaction, step)) = steps.next().await {
            match step {
                Some(result) => results.push(result),
                None => {
                    warn!(
                        state = %interaction.provider_state,
                        interaction = %interaction.description,
                        "No state hook registered; stopping verification"
                    );
                    return Err(PactError::MissingStateHook {
                        state: interaction.provider_state.clone(),
                        interaction: interaction.description.clone(),
                        completed: results,
                    });
                }
            }
        }

        let report = VerificationReport {
            consumer: artifact.consumer.clone(),
            provider: artifact.provider.clone(),
            results,
        };
        info!(
            passed = report.results.len() - report.failures().len(),
            failed = report.failures().len(),
            "Provider verification finished"
        );
        Ok(report)
    }

    /// Read the artifact at `path` and verify it.
    ///
    /// # Errors
    ///
    /// Any error from [`ContractArtifact::read_from`] or [`verify`](Self::verify).
    pub async fn verify_file(&self, path: impl AsRef<Path>) -> PactResult<VerificationReport> {
        let artifact = ContractArtifact::read_from(path.as_ref())?;
        self.verify(&artifact).await
    }

    /// Verify one interaction. `None` means its state has no hook.
    async fn verify_interaction(&self, interaction: &Interaction) -> Option<VerificationResult> {
        let state = interaction.provider_state.as_str();
        let finish = |outcome: Outcome, actual_response: Option<HttpResponse>| {
            match &outcome {
                Outcome::Pass => info!(interaction = %interaction.description, "Interaction verified"),
                Outcome::Fail(reason) => warn!(
                    interaction = %interaction.description,
                    state = %state,
                    %reason,
                    "Interaction failed verification"
                ),
            }
            VerificationResult {
                interaction_description: interaction.description.clone(),
                provider_state: interaction.provider_state.clone(),
                outcome,
                actual_response,
            }
        };

        if !state.is_empty() {
            let hook = self.hooks.get(state)?;
            if let Err(e) = hook.set_up(state).await {
                return Some(finish(
                    Outcome::Fail(FailureReason::StateSetup(format!("{e:#}"))),
                    None,
                ));
            }
        }

        let request = interaction.request.render();
        let timeout = self.config.request_timeout;
        let result = match tokio::time::timeout(timeout, self.client.send(&request)).await {
            Err(_) => finish(Outcome::Fail(FailureReason::Timeout(timeout)), None),
            Ok(Err(PactError::Timeout(after))) => finish(Outcome::Fail(FailureReason::Timeout(after)), None),
            Ok(Err(PactError::Transport(msg))) => finish(Outcome::Fail(FailureReason::Transport(msg)), None),
            Ok(Err(e)) => finish(Outcome::Fail(FailureReason::Transport(e.to_string())), None),
            Ok(Ok(response)) => {
                let outcome = match interaction.response.matches(&response) {
                    Ok(()) => Outcome::Pass,
                    Err(mismatch) => Outcome::Fail(FailureReason::Mismatch(mismatch)),
                };
                finish(outcome, Some(response))
            }
        };
        Some(result)
    }
}
