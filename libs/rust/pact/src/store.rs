//! In-memory interaction store.
//!
//! Interactions are recorded in order during the set-up phase. Once the
//! stub server starts the store is frozen and only read: lookups take a
//! shared lock and hit counters are atomics, so concurrent stub requests
//! never lose an update.

use crate::contract::Interaction;
use crate::error::{PactError, PactResult};
use crate::matcher::Mismatch;
use crate::message::HttpRequest;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

/// A recorded interaction with its invocation counter.
#[derive(Debug)]
pub struct RecordedInteraction {
    interaction: Interaction,
    hits: AtomicU64,
}

impl RecordedInteraction {
    /// The recorded interaction.
    #[must_use]
    pub const fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// How many stub requests this interaction has served.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Acquire)
    }

    fn hit(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Outcome of looking up a stub for an incoming request.
#[derive(Debug)]
pub enum StubLookup {
    /// A recorded interaction matched
    Matched {
        /// The most recently recorded matching interaction
        interaction: Arc<RecordedInteraction>,
        /// Descriptions of older interactions that also matched
        shadowed: Vec<String>,
    },
    /// Nothing matched
    NotFound {
        /// Why each recorded interaction was rejected, as `(description, mismatch)`
        candidates: Vec<(String, Mismatch)>,
    },
}

/// Ordered collection of interactions, unique by `(provider_state, description)`.
#[derive(Debug, Default)]
pub struct InteractionStore {
    entries: RwLock<Vec<Arc<RecordedInteraction>>>,
    frozen: AtomicBool,
}

impl InteractionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an interaction.
    ///
    /// # Errors
    ///
    /// - [`PactError::StoreFrozen`] once [`freeze`](Self::freeze) was called
    /// - [`PactError::InvalidPattern`] if a matcher is unusable
    /// - [`PactError::DuplicateInteraction`] if the identity is taken
    pub fn record(&self, interaction: Interaction) -> PactResult<()> {
        if self.is_frozen() {
            return Err(PactError::StoreFrozen);
        }
        interaction.validate()?;

        let mut entries = self.entries.write();
        // Re-check under the lock so a concurrent freeze wins.
        if self.is_frozen() {
            return Err(PactError::StoreFrozen);
        }
        if entries
            .iter()
            .any(|entry| entry.interaction.key() == interaction.key())
        {
            return Err(PactError::DuplicateInteraction {
                provider_state: interaction.provider_state,
                description: interaction.description,
            });
        }

        debug!(
            description = %interaction.description,
            provider_state = %interaction.provider_state,
            "Recorded interaction"
        );
        entries.push(Arc::new(RecordedInteraction {
            interaction,
            hits: AtomicU64::new(0),
        }));
        Ok(())
    }

    /// Build a store by recording every interaction in order.
    ///
    /// # Errors
    ///
    /// The first error [`record`](Self::record) returns.
    pub fn try_from_iter(interactions: impl IntoIterator<Item = Interaction>) -> PactResult<Self> {
        let store = Self::new();
        for interaction in interactions {
            store.record(interaction)?;
        }
        Ok(store)
    }

    /// Stop accepting new interactions.
    pub fn freeze(&self) {
        let _guard = self.entries.write();
        self.frozen.store(true, Ordering::Release);
    }

    /// Whether the store is frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Number of recorded interactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no interactions are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Find the interaction serving `request` and count the hit.
    ///
    /// When several interactions match, the most recently recorded one is
    /// selected and the others are reported as shadowed (and logged).
    #[must_use]
    pub fn find_matching_stub(&self, request: &HttpRequest) -> StubLookup {
        let entries = self.entries.read();
        let mut selected: Option<&Arc<RecordedInteraction>> = None;
        let mut shadowed = Vec::new();
        let mut candidates = Vec::new();

        for entry in entries.iter().rev() {
            match entry.interaction.request.matches(request) {
                Ok(()) if selected.is_none() => selected = Some(entry),
                Ok(()) => shadowed.push(entry.interaction.description.clone()),
                Err(mismatch) => {
                    candidates.push((entry.interaction.description.clone(), mismatch));
                }
            }
        }

        match selected {
            Some(entry) => {
                let hits = entry.hit();
                if !shadowed.is_empty() {
                    warn!(
                        method = %request.method,
                        path = %request.path,
                        selected = %entry.interaction.description,
                        shadowed = ?shadowed,
                        "Request matches several interactions; using the most recently recorded"
                    );
                }
                debug!(description = %entry.interaction.description, hits, "Stub matched");
                StubLookup::Matched {
                    interaction: Arc::clone(entry),
                    shadowed,
                }
            }
            None => {
                candidates.reverse();
                StubLookup::NotFound { candidates }
            }
        }
    }

    /// All interactions in recording order.
    #[must_use]
    pub fn all_interactions(&self) -> Vec<Interaction> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.interaction.clone())
            .collect()
    }

    /// Recorded entries with their hit counters, in recording order.
    #[must_use]
    pub fn entries(&self) -> Vec<Arc<RecordedInteraction>> {
        self.entries.read().clone()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{RequestPattern, ResponsePattern};
    use crate::matcher::{Matcher, Pattern};
    use serde_json::json;

    fn interaction(description: &str, state: &str, path: &str) -> Interaction {
        Interaction::new(
            description,
            state,
            RequestPattern::new("GET", path),
            ResponsePattern::new(200).body(Pattern::literal(json!({"summary": "Rain"}))),
        )
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let store = InteractionStore::new();
        store.record(interaction("forecast", "data", "/a")).unwrap();
        store.record(interaction("forecast", "other state", "/a")).unwrap();

        let err = store.record(interaction("forecast", "data", "/b")).unwrap_err();
        assert!(matches!(err, PactError::DuplicateInteraction { .. }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_frozen_store_rejects_records() {
        let store = InteractionStore::new();
        store.record(interaction("forecast", "data", "/a")).unwrap();
        store.freeze();
        let err = store.record(interaction("another", "data", "/b")).unwrap_err();
        assert!(matches!(err, PactError::StoreFrozen));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let store = InteractionStore::new();
        let bad = Interaction::new(
            "bad",
            "",
            RequestPattern::matching("GET", Matcher::regex("[0-9]+", "nope")),
            ResponsePattern::new(200),
        );
        assert!(matches!(store.record(bad), Err(PactError::InvalidPattern { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_recorded_wins() {
        let store = InteractionStore::new();
        store.record(interaction("first", "a", "/same")).unwrap();
        store.record(interaction("second", "b", "/same")).unwrap();

        match store.find_matching_stub(&HttpRequest::new("GET", "/same")) {
            StubLookup::Matched { interaction, shadowed } => {
                assert_eq!(interaction.interaction().description, "second");
                assert_eq!(interaction.hits(), 1);
                assert_eq!(shadowed, vec!["first".to_string()]);
            }
            StubLookup::NotFound { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn test_not_found_lists_candidates() {
        let store = InteractionStore::new();
        store.record(interaction("first", "a", "/one")).unwrap();
        store.record(interaction("second", "a", "/two")).unwrap();

        match store.find_matching_stub(&HttpRequest::new("GET", "/three")) {
            StubLookup::NotFound { candidates } => {
                let names: Vec<_> = candidates.iter().map(|(d, _)| d.as_str()).collect();
                assert_eq!(names, vec!["first", "second"]);
                assert!(candidates.iter().all(|(_, m)| m.path == "path"));
            }
            StubLookup::Matched { .. } => panic!("expected no match"),
        }
    }

    #[test]
    fn test_recording_order_preserved() {
        let store = InteractionStore::try_from_iter(
            ["c", "a", "b"]
                .into_iter()
                .map(|d| interaction(d, "state", &format!("/{d}"))),
        )
        .unwrap();
        let order: Vec<_> = store
            .all_interactions()
            .into_iter()
            .map(|i| i.description)
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_try_from_iter_rejects_duplicates() {
        let err = InteractionStore::try_from_iter([
            interaction("forecast", "state", "/a"),
            interaction("forecast", "state", "/b"),
        ])
        .unwrap_err();
        assert!(matches!(err, PactError::DuplicateInteraction { .. }));

        let err = InteractionStore::try_from_iter([Interaction::new(
            "bad regex",
            "",
            RequestPattern::matching("GET", Matcher::regex("(", "/x")),
            ResponsePattern::new(200),
        )])
        .unwrap_err();
        assert!(matches!(err, PactError::InvalidPattern { .. }));
    }

    #[test]
    fn test_concurrent_hits_are_counted() {
        let store = Arc::new(InteractionStore::new());
        store.record(interaction("forecast", "data", "/hit")).unwrap();
        store.freeze();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        let _ = store.find_matching_stub(&HttpRequest::new("GET", "/hit"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.entries()[0].hits(), 2000);
    }
}
