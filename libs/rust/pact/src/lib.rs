//! Consumer-driven contract testing engine.
//!
//! The consumer side records the interactions a client expects, serves them
//! from a stub server while the client runs and writes the exercised set as
//! a contract artifact. The provider side replays that artifact against the
//! real service and reports every interaction it breaks.
//!
//! # Features
//! - Matchers: exact values, full-string regexes, kinds and each-like arrays
//! - Interaction store with concurrent stub lookup and atomic hit counts
//! - Stub server on a configurable local port (axum)
//! - Stable, diffable JSON contract artifacts
//! - Provider verification over HTTP or against an in-process router
//! - Tolerant reader for consumer-side payload decoding
//! - Can-i-deploy matrix

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod artifact;
pub mod client;
pub mod config;
pub mod consumer;
pub mod contract;
pub mod error;
pub mod kind;
pub mod matcher;
pub mod matrix;
pub mod message;
pub mod provider;
pub mod state;
pub mod store;
pub mod tolerant;
pub mod verification;

pub use artifact::{ArtifactMetadata, CONTRACT_FORMAT_VERSION, ContractArtifact};
pub use client::{HttpProviderClient, ProviderClient, RouterProviderClient};
pub use config::{DEFAULT_PACT_DIR, RecorderConfig, VerifierConfig};
pub use consumer::{ConsumerFailure, ConsumerRecorder, ConsumerReport, StubServer};
pub use contract::{Interaction, RequestPattern, ResponsePattern, match_request, match_response};
pub use error::{PactError, PactResult};
pub use kind::ValueKind;
pub use matcher::{MatchResult, Matcher, Mismatch, Pattern, match_pattern};
pub use matrix::{CanIDeployResult, MatrixEntry};
pub use message::{HttpRequest, HttpResponse};
pub use provider::ProviderVerifier;
pub use state::{StateHook, StateHooks};
pub use store::{InteractionStore, StubLookup};
pub use tolerant::{ParseError, TolerantRecord, Whitelist};
pub use verification::{FailureReason, Outcome, VerificationReport, VerificationResult};
