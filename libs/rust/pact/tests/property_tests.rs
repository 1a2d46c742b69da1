//! Property-based tests for the contract engine.
//!
//! Tests validate:
//! - Store identity: distinct interactions are accepted, duplicates rejected
//! - Artifact round-trip and byte-stable rewriting
//! - Matcher field-subset rule and self-consistent examples
//! - Tolerant reader ignores unknown fields
//! - can-i-deploy requires every contract verified

use forecast_pact::tolerant::parse;
use forecast_pact::{
    CanIDeployResult, ContractArtifact, FailureReason, InteractionStore, Matcher, MatrixEntry,
    Outcome, PactError, Pattern, ResponsePattern, ValueKind, VerificationReport,
    VerificationResult, Whitelist,
};
use proptest::prelude::*;
use serde_json::{Value, json};
use test_utils::generators::{
    interactions_strategy, key_strategy, pattern_strategy, scalar_strategy,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property: Distinct Identities Are Accepted**
    /// *For any* interactions with distinct `(provider_state, description)`,
    /// the store SHALL accept all of them and reject a repeated identity.
    #[test]
    fn prop_store_accepts_distinct_rejects_duplicates(interactions in interactions_strategy()) {
        let store = InteractionStore::new();
        for interaction in &interactions {
            prop_assert!(store.record(interaction.clone()).is_ok());
        }
        prop_assert_eq!(store.len(), interactions.len());

        let duplicate = interactions[0].clone();
        prop_assert!(
            matches!(store.record(duplicate), Err(PactError::DuplicateInteraction { .. })),
            "Repeated identity should be rejected"
        );
        prop_assert_eq!(store.len(), interactions.len());
    }

    /// **Property: Artifact Round-Trip**
    /// *For any* non-empty well-formed store, reading the written artifact
    /// SHALL give back the same interactions in the same order.
    #[test]
    fn prop_artifact_round_trip(interactions in interactions_strategy()) {
        let store = InteractionStore::try_from_iter(interactions).unwrap();
        let artifact = ContractArtifact::from_store("weather-service", "weather-api", &store);

        let text = artifact.to_json_string().unwrap();
        let parsed = ContractArtifact::from_json_str(&text).unwrap();

        prop_assert_eq!(&parsed, &artifact);
        prop_assert_eq!(parsed.into_store().unwrap().all_interactions(), store.all_interactions());
    }

    /// **Property: Stable Artifact Bytes**
    /// *For any* store, writing it twice, or writing what was read back,
    /// SHALL produce identical bytes.
    #[test]
    fn prop_artifact_bytes_are_stable(interactions in interactions_strategy()) {
        let artifact = ContractArtifact::new("weather-service", "weather-api", interactions);
        let first = artifact.to_json_string().unwrap();
        let second = artifact.to_json_string().unwrap();
        prop_assert_eq!(&first, &second);

        let rewritten = ContractArtifact::from_json_str(&first).unwrap().to_json_string().unwrap();
        prop_assert_eq!(first, rewritten);
    }

    /// **Property: Examples Satisfy Their Pattern**
    /// *For any* valid pattern, its rendered example SHALL match it.
    #[test]
    fn prop_pattern_example_matches(pattern in pattern_strategy()) {
        prop_assert!(pattern.validate("body").is_ok());
        prop_assert_eq!(pattern.matches(&pattern.example(), "body"), Ok(()));
    }

    /// **Property: Field-Subset Rule**
    /// *For any* object body, a literal pattern of it SHALL still match once
    /// the provider adds unknown fields.
    #[test]
    fn prop_extra_fields_are_ignored(
        body in prop::collection::btree_map(key_strategy(), scalar_strategy(), 1..5),
        extra in prop::collection::btree_map("extra_[a-z]{1,6}", scalar_strategy(), 1..4),
    ) {
        let expected: serde_json::Map<String, Value> = body.into_iter().collect();
        let pattern = Pattern::literal(Value::Object(expected.clone()));

        let mut actual = expected;
        actual.extend(extra);
        prop_assert_eq!(pattern.matches(&Value::Object(actual), "body"), Ok(()));
    }

    /// **Property: Tolerant Reader Ignores Additive Fields**
    /// *For any* additive noise around a whitelisted field, parsing SHALL
    /// extract the whitelisted value only.
    #[test]
    fn prop_tolerant_reader_ignores_noise(
        summary in "[A-Za-z ]{1,16}",
        noise in prop::collection::btree_map("n[a-z]{1,6}", scalar_strategy(), 0..5),
    ) {
        let mut currently = serde_json::Map::new();
        currently.insert("summary".to_string(), Value::from(summary.clone()));
        currently.insert("extra".to_string(), Value::Object(noise.clone().into_iter().collect()));
        let mut root: serde_json::Map<String, Value> = noise.into_iter().collect();
        root.insert("currently".to_string(), Value::Object(currently));

        let whitelist = Whitelist::new().field("currently.summary", ValueKind::String);
        let record = parse(&Value::Object(root).to_string(), &whitelist).unwrap();
        prop_assert_eq!(record.str("currently.summary"), Some(summary.as_str()));
        prop_assert_eq!(record.len(), 1);
    }

    /// **Property: can-i-deploy Requires All Verified**
    /// *For any* set of verification reports, deployment SHALL be allowed
    /// exactly when every report passed.
    #[test]
    fn prop_can_i_deploy_requires_all_verified(outcomes in prop::collection::vec(any::<bool>(), 1..6)) {
        let matrix: Vec<MatrixEntry> = outcomes
            .iter()
            .enumerate()
            .map(|(i, passed)| {
                let outcome = if *passed {
                    Outcome::Pass
                } else {
                    Outcome::Fail(FailureReason::Transport("connection refused".to_string()))
                };
                let report = VerificationReport {
                    consumer: format!("consumer-{i}"),
                    provider: "weather-api".to_string(),
                    results: vec![VerificationResult {
                        interaction_description: "forecast for Hamburg".to_string(),
                        provider_state: "weather forecast data".to_string(),
                        outcome,
                        actual_response: None,
                    }],
                };
                MatrixEntry::from_report(&report, "1.0.0", "2.0.0")
            })
            .collect();

        let result = CanIDeployResult::from_matrix(matrix);
        prop_assert_eq!(result.can_deploy(), outcomes.iter().all(|passed| *passed));
    }
}

#[test]
fn test_field_subset_rule() {
    let pattern = ResponsePattern::new(200).body(Pattern::object([(
        "summary",
        Pattern::from(Matcher::exact("Rain")),
    )]));

    let extra = forecast_pact::HttpResponse::new(200).with_body(json!({"summary": "Rain", "icon": "rain-icon"}));
    assert!(pattern.matches(&extra).is_ok());

    let cloudy = forecast_pact::HttpResponse::new(200).with_body(json!({"summary": "Cloudy"}));
    assert_eq!(pattern.matches(&cloudy).unwrap_err().path, "body.summary");
}

#[test]
fn test_tolerant_reader_missing_field() {
    let whitelist = Whitelist::new().field("currently.summary", ValueKind::String);
    let err = parse(r#"{"currently":{}}"#, &whitelist).unwrap_err();
    assert_eq!(
        err,
        forecast_pact::ParseError::MissingField {
            path: "currently.summary".to_string()
        }
    );
}
