//! End-to-end contract flow tests.
//!
//! A consumer run writes the contract to disk; the provider run reads it back
//! and replays it against the fake weather API, over loopback HTTP or
//! in-process through the router.

use forecast_integration_tests::{forecast_hooks, record_weather_contract};
use forecast_pact::{
    CanIDeployResult, ContractArtifact, FailureReason, HttpProviderClient, MatrixEntry,
    Outcome, PactError, ProviderVerifier, RouterProviderClient, StateHooks, VerifierConfig,
};
use proptest::prelude::*;
use serde_json::json;
use std::path::PathBuf;
use test_utils::fixtures::{
    BERLIN, CONSUMER, FORECAST_STATE, PROVIDER, any_forecast_interaction, forecast_path,
    forecast_payload, hamburg_interaction,
};
use test_utils::generators::summary_strategy;
use test_utils::mocks::{FakeWeatherProvider, SeedForecastHook};

fn contract_file(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join(format!("{CONSUMER}-{PROVIDER}.json"))
}

#[tokio::test]
async fn test_contract_verified_against_live_provider() {
    let dir = tempfile::tempdir().unwrap();
    record_weather_contract(dir.path(), vec![hamburg_interaction()])
        .await
        .unwrap();

    let provider = FakeWeatherProvider::new();
    let addr = provider.spawn().await.unwrap();
    let config = VerifierConfig::default();
    let client = HttpProviderClient::for_verifier(format!("http://{addr}"), &config).unwrap();
    let verifier = ProviderVerifier::new(
        config,
        client,
        forecast_hooks(&provider, forecast_payload("Rain")),
    )
    .unwrap();

    let report = verifier.verify_file(contract_file(&dir)).await.unwrap();
    assert!(report.is_pass(), "{report}");
    assert_eq!(report.consumer, CONSUMER);
    assert_eq!(report.provider, PROVIDER);
    assert_eq!(provider.requests().await, vec!["53.5511,9.9937"]);

    let actual = report.results[0].actual_response.as_ref().unwrap();
    assert_eq!(actual.status, 200);

    let decision = CanIDeployResult::from_matrix(vec![MatrixEntry::from_report(&report, "1.0.0", "2.0.0")]);
    assert!(decision.can_deploy());
    assert_eq!(decision.reason, "All 1 contract(s) verified");
}

#[tokio::test]
async fn test_contract_verified_in_process() {
    let dir = tempfile::tempdir().unwrap();
    record_weather_contract(dir.path(), vec![hamburg_interaction()])
        .await
        .unwrap();

    let provider = FakeWeatherProvider::new();
    let verifier = ProviderVerifier::new(
        VerifierConfig::default(),
        RouterProviderClient::new(provider.router()),
        forecast_hooks(&provider, forecast_payload("Rain")),
    )
    .unwrap();

    let report = verifier.verify_file(contract_file(&dir)).await.unwrap();
    assert!(report.is_pass(), "{report}");
    report.ensure_passed().unwrap();
}

#[tokio::test]
async fn test_additive_provider_change_still_verifies() {
    let dir = tempfile::tempdir().unwrap();
    record_weather_contract(dir.path(), vec![hamburg_interaction()])
        .await
        .unwrap();

    let mut payload = forecast_payload("Rain");
    payload["alerts"] = json!([{"title": "Storm warning", "severity": "watch"}]);
    payload["currently"]["uvIndex"] = json!(1);

    let provider = FakeWeatherProvider::new();
    let verifier = ProviderVerifier::new(
        VerifierConfig::default(),
        RouterProviderClient::new(provider.router()),
        forecast_hooks(&provider, payload),
    )
    .unwrap();

    let report = verifier.verify_file(contract_file(&dir)).await.unwrap();
    assert!(report.is_pass(), "{report}");
}

#[tokio::test]
async fn test_renamed_summary_breaks_the_contract() {
    let dir = tempfile::tempdir().unwrap();
    record_weather_contract(dir.path(), vec![hamburg_interaction()])
        .await
        .unwrap();

    let mut payload = forecast_payload("Rain");
    let summary = payload["currently"]
        .as_object_mut()
        .and_then(|currently| currently.remove("summary"))
        .unwrap();
    payload["currently"]["headline"] = summary;

    let provider = FakeWeatherProvider::new();
    let verifier = ProviderVerifier::new(
        VerifierConfig::default(),
        RouterProviderClient::new(provider.router()),
        forecast_hooks(&provider, payload),
    )
    .unwrap();

    let report = verifier.verify_file(contract_file(&dir)).await.unwrap();
    assert!(!report.is_pass());
    match &report.results[0].outcome {
        Outcome::Fail(FailureReason::Mismatch(mismatch)) => {
            assert_eq!(mismatch.path, "body.currently.summary");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    match report.ensure_passed().unwrap_err() {
        PactError::VerificationFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].contains("forecast for Hamburg"));
            assert!(failures[0].contains("body.currently.summary"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let decision = CanIDeployResult::from_matrix(vec![MatrixEntry::from_report(&report, "1.0.0", "2.0.0")]);
    assert!(!decision.can_deploy());
    assert_eq!(
        decision.reason,
        "Verification failed: weather-service (1.0.0) -> weather-api (2.0.0): 1 failing interaction(s)"
    );
}

#[tokio::test]
async fn test_missing_forecast_fails_on_status() {
    let dir = tempfile::tempdir().unwrap();
    record_weather_contract(dir.path(), vec![hamburg_interaction()])
        .await
        .unwrap();

    // The hook seeds Berlin, so the Hamburg request gets a 404.
    let provider = FakeWeatherProvider::new();
    let hooks = StateHooks::new().with(
        FORECAST_STATE,
        SeedForecastHook::new(&provider, forecast_path(BERLIN), forecast_payload("Rain")),
    );
    let verifier = ProviderVerifier::new(
        VerifierConfig::default(),
        RouterProviderClient::new(provider.router()),
        hooks,
    )
    .unwrap();

    let report = verifier.verify_file(contract_file(&dir)).await.unwrap();
    match &report.results[0].outcome {
        Outcome::Fail(FailureReason::Mismatch(mismatch)) => assert_eq!(mismatch.path, "status"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_provider_without_hooks_stops_verification() {
    let dir = tempfile::tempdir().unwrap();
    record_weather_contract(dir.path(), vec![hamburg_interaction()])
        .await
        .unwrap();

    let provider = FakeWeatherProvider::new();
    let verifier = ProviderVerifier::new(
        VerifierConfig::default(),
        RouterProviderClient::new(provider.router()),
        StateHooks::new(),
    )
    .unwrap();

    match verifier.verify_file(contract_file(&dir)).await.unwrap_err() {
        PactError::MissingStateHook { state, completed, .. } => {
            assert_eq!(state, FORECAST_STATE);
            assert!(completed.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(provider.requests().await.is_empty());
}

#[tokio::test]
async fn test_contract_file_is_stable_across_runs() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    record_weather_contract(first.path(), vec![hamburg_interaction()])
        .await
        .unwrap();
    record_weather_contract(second.path(), vec![hamburg_interaction()])
        .await
        .unwrap();

    let a = std::fs::read(contract_file(&first)).unwrap();
    let b = std::fs::read(contract_file(&second)).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_corrupt_contract_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(contract_file(&dir), r#"{"consumer":"weather-service","provider":"weather-api"}"#).unwrap();

    let provider = FakeWeatherProvider::new();
    let verifier = ProviderVerifier::new(
        VerifierConfig::default(),
        RouterProviderClient::new(provider.router()),
        forecast_hooks(&provider, forecast_payload("Rain")),
    )
    .unwrap();

    let err = verifier.verify_file(contract_file(&dir)).await.unwrap_err();
    assert!(matches!(err, PactError::ArtifactParse { .. }), "{err}");
    assert!(err.is_fatal());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// **Property: Type-Matched Summaries Accept Any Provider Text**
    /// *For any* summary the provider returns, a contract matching the
    /// summary by type SHALL verify.
    #[test]
    fn prop_any_summary_satisfies_type_matched_contract(summary in summary_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let report = runtime.block_on(async {
            let artifact = ContractArtifact::new(CONSUMER, PROVIDER, vec![any_forecast_interaction()]);
            let provider = FakeWeatherProvider::new();
            let hooks = StateHooks::new().with(
                FORECAST_STATE,
                SeedForecastHook::new(&provider, forecast_path(BERLIN), forecast_payload(&summary)),
            );
            let verifier = ProviderVerifier::new(
                VerifierConfig::default(),
                RouterProviderClient::new(provider.router()),
                hooks,
            )
            .unwrap();
            verifier.verify(&artifact).await.unwrap()
        });
        prop_assert!(report.is_pass(), "{}", report);
    }
}
