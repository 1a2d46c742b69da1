//! Consumer side of the contract workflow.
//!
//! A [`ConsumerRecorder`] collects the interactions a client expects, serves
//! them from a stub server while the client under test runs, then checks
//! that every declared interaction was exercised and that no request went
//! unmatched. A passing run produces the [`ContractArtifact`] handed to the
//! provider.

mod stub;

pub use stub::StubServer;

use crate::artifact::ContractArtifact;
use crate::config::RecorderConfig;
use crate::contract::Interaction;
use crate::error::{PactError, PactResult};
use crate::matcher::Mismatch;
use crate::message::HttpRequest;
use crate::store::InteractionStore;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Why a consumer run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerFailure {
    /// A declared interaction was never requested by the client
    UnexercisedInteraction {
        /// Provider state of the interaction
        provider_state: String,
        /// Interaction description
        description: String,
    },
    /// The client sent a request no interaction matched
    UnmatchedStubRequest {
        /// Request method
        method: String,
        /// Request path
        path: String,
    },
}

impl fmt::Display for ConsumerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexercisedInteraction {
                provider_state,
                description,
            } => write!(
                f,
                "interaction '{description}' (provider state '{provider_state}') was never invoked by the client"
            ),
            Self::UnmatchedStubRequest { method, path } => {
                write!(f, "request {method} {path} matched no declared interaction")
            }
        }
    }
}

/// A request the stub server could not serve.
#[derive(Debug, Clone)]
pub struct UnmatchedRequest {
    /// The request as received
    pub request: HttpRequest,
    /// Why each declared interaction rejected it, as `(description, mismatch)`
    pub candidates: Vec<(String, Mismatch)>,
}

/// A request that matched several interactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousMatch {
    /// Request method
    pub method: String,
    /// Request path
    pub path: String,
    /// Interaction that served the request
    pub selected: String,
    /// Older interactions that also matched
    pub shadowed: Vec<String>,
}

/// Invocation count of one declared interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionUsage {
    /// Provider state
    pub provider_state: String,
    /// Interaction description
    pub description: String,
    /// Number of stub requests served
    pub hits: u64,
}

/// Outcome of a consumer run.
#[derive(Debug, Clone)]
pub struct ConsumerReport {
    /// Every declared interaction with its hit count, in recording order
    pub usage: Vec<InteractionUsage>,
    /// Requests no interaction matched
    pub unmatched: Vec<UnmatchedRequest>,
    /// Requests served despite matching several interactions
    pub ambiguities: Vec<AmbiguousMatch>,
}

impl ConsumerReport {
    /// Failures in report order: unexercised interactions first, then
    /// unmatched requests.
    #[must_use]
    pub fn failures(&self) -> Vec<ConsumerFailure> {
        let unexercised = self
            .usage
            .iter()
            .filter(|usage| usage.hits == 0)
            .map(|usage| ConsumerFailure::UnexercisedInteraction {
                provider_state: usage.provider_state.clone(),
                description: usage.description.clone(),
            });
        let unmatched = self
            .unmatched
            .iter()
            .map(|u| ConsumerFailure::UnmatchedStubRequest {
                method: u.request.method.clone(),
                path: u.request.path.clone(),
            });
        unexercised.chain(unmatched).collect()
    }

    /// Whether every interaction was exercised and every request matched.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.unmatched.is_empty() && self.usage.iter().all(|usage| usage.hits > 0)
    }
}

pub(crate) struct RecorderState {
    pub(crate) store: InteractionStore,
    unmatched: Mutex<Vec<UnmatchedRequest>>,
    ambiguities: Mutex<Vec<AmbiguousMatch>>,
}

impl RecorderState {
    pub(crate) fn record_unmatched(&self, unmatched: UnmatchedRequest) {
        self.unmatched.lock().push(unmatched);
    }

    pub(crate) fn record_ambiguity(&self, request: &HttpRequest, selected: &str, shadowed: Vec<String>) {
        self.ambiguities.lock().push(AmbiguousMatch {
            method: request.method.clone(),
            path: request.path.clone(),
            selected: selected.to_string(),
            shadowed,
        });
    }
}

/// Drives the consumer side of a contract test.
///
/// ```no_run
/// use forecast_pact::{ConsumerRecorder, Interaction, Pattern, RecorderConfig, RequestPattern, ResponsePattern};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let recorder = ConsumerRecorder::new(RecorderConfig::new("weather-service", "weather-api"));
/// recorder.record(Interaction::new(
///     "forecast for Hamburg",
///     "weather forecast data",
///     RequestPattern::new("GET", "/53.5511,9.9937"),
///     ResponsePattern::new(200).body(Pattern::literal(json!({"summary": "Rain"}))),
/// ))?;
///
/// let server = recorder.start().await?;
/// reqwest::get(format!("{}/53.5511,9.9937", server.url())).await?;
/// let artifact = recorder.finish(server).await?;
/// # Ok(())
/// # }
/// ```
pub struct ConsumerRecorder {
    config: RecorderConfig,
    state: Arc<RecorderState>,
}

impl ConsumerRecorder {
    /// Create a recorder with an empty interaction store.
    #[must_use]
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            state: Arc::new(RecorderState {
                store: InteractionStore::new(),
                unmatched: Mutex::new(Vec::new()),
                ambiguities: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Recorder configuration.
    #[must_use]
    pub const fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// The underlying interaction store.
    #[must_use]
    pub fn store(&self) -> &InteractionStore {
        &self.state.store
    }

    /// Declare an expected interaction.
    ///
    /// # Errors
    ///
    /// See [`InteractionStore::record`]; after [`start`](Self::start) this
    /// always fails with [`PactError::StoreFrozen`].
    pub fn record(&self, interaction: Interaction) -> PactResult<()> {
        self.state.store.record(interaction)
    }

    /// Freeze the store and start the stub server.
    ///
    /// # Errors
    ///
    /// - [`PactError::NoInteractions`] if nothing was declared
    /// - [`PactError::PortBind`] if the configured address is unavailable
    #[instrument(skip(self), fields(consumer = %self.config.consumer, provider = %self.config.provider))]
    pub async fn start(&self) -> PactResult<StubServer> {
        if self.state.store.is_empty() {
            return Err(PactError::NoInteractions);
        }
        self.state.store.freeze();
        StubServer::bind(Arc::clone(&self.state), &self.config.bind_addr()).await
    }

    /// Snapshot of the run so far.
    #[must_use]
    pub fn report(&self) -> ConsumerReport {
        ConsumerReport {
            usage: self
                .state
                .store
                .entries()
                .iter()
                .map(|entry| InteractionUsage {
                    provider_state: entry.interaction().provider_state.clone(),
                    description: entry.interaction().description.clone(),
                    hits: entry.hits(),
                })
                .collect(),
            unmatched: self.state.unmatched.lock().clone(),
            ambiguities: self.state.ambiguities.lock().clone(),
        }
    }

    /// Check every declared interaction was exercised and nothing went
    /// unmatched.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::ConsumerVerificationFailed`] listing every failure.
    pub fn verify(&self) -> PactResult<ConsumerReport> {
        let report = self.report();
        for ambiguity in &report.ambiguities {
            warn!(
                method = %ambiguity.method,
                path = %ambiguity.path,
                selected = %ambiguity.selected,
                shadowed = ?ambiguity.shadowed,
                "Ambiguous stub match"
            );
        }
        let failures = report.failures();
        if failures.is_empty() {
            Ok(report)
        } else {
            for failure in &failures {
                warn!(%failure, "Consumer contract failure");
            }
            Err(PactError::ConsumerVerificationFailed { failures })
        }
    }

    /// Stop the stub server, verify the run and produce the artifact.
    ///
    /// The server is stopped before verification, so its port is released
    /// whether or not the run passed. When an artifact directory is
    /// configured the artifact is also written there.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::ConsumerVerificationFailed`] for a failing run,
    /// or an I/O error if the artifact cannot be written.
    #[instrument(skip_all, fields(consumer = %self.config.consumer, provider = %self.config.provider))]
    pub async fn finish(self, server: StubServer) -> PactResult<ContractArtifact> {
        server.shutdown().await;
        self.verify()?;

        let artifact = ContractArtifact::from_store(
            &self.config.consumer,
            &self.config.provider,
            &self.state.store,
        );
        if let Some(dir) = &self.config.artifact_dir {
            let path = artifact.write_to_dir(dir)?;
            info!(path = %path.display(), "Contract artifact written");
        }
        info!(interactions = artifact.interactions.len(), "Consumer contract verified");
        Ok(artifact)
    }

    /// Start the stub server, run `client` against its base URL, then
    /// [`finish`](Self::finish).
    ///
    /// # Errors
    ///
    /// Any error from [`start`](Self::start) or [`finish`](Self::finish).
    pub async fn run<F, Fut, T>(self, client: F) -> PactResult<(T, ContractArtifact)>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = T>,
    {
        let server = self.start().await?;
        let output = client(server.url()).await;
        let artifact = self.finish(server).await?;
        Ok((output, artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{RequestPattern, ResponsePattern};
    use crate::matcher::Pattern;
    use serde_json::json;

    fn forecast() -> Interaction {
        Interaction::new(
            "forecast for Hamburg",
            "weather forecast data",
            RequestPattern::new("GET", "/53.5511,9.9937"),
            ResponsePattern::new(200).body(Pattern::literal(json!({"summary": "Rain"}))),
        )
    }

    #[tokio::test]
    async fn test_start_requires_interactions() {
        let recorder = ConsumerRecorder::new(RecorderConfig::new("c", "p"));
        assert!(matches!(recorder.start().await, Err(PactError::NoInteractions)));
    }

    #[tokio::test]
    async fn test_record_after_start_is_frozen() {
        let recorder = ConsumerRecorder::new(RecorderConfig::new("c", "p"));
        recorder.record(forecast()).unwrap();
        let server = recorder.start().await.unwrap();

        let late = Interaction::new(
            "late",
            "weather forecast data",
            RequestPattern::new("GET", "/late"),
            ResponsePattern::new(204),
        );
        assert!(matches!(recorder.record(late), Err(PactError::StoreFrozen)));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_port_conflict_is_fatal() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let recorder = ConsumerRecorder::new(RecorderConfig::new("c", "p").with_port(port));
        recorder.record(forecast()).unwrap();
        let err = recorder.start().await.unwrap_err();
        assert!(matches!(err, PactError::PortBind { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unexercised_interaction_fails_verification() {
        let recorder = ConsumerRecorder::new(RecorderConfig::new("c", "p"));
        recorder.record(forecast()).unwrap();

        let err = recorder.verify().unwrap_err();
        match err {
            PactError::ConsumerVerificationFailed { failures } => {
                assert_eq!(
                    failures,
                    vec![ConsumerFailure::UnexercisedInteraction {
                        provider_state: "weather forecast data".to_string(),
                        description: "forecast for Hamburg".to_string(),
                    }]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
