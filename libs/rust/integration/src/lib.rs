//! Shared steps of the forecast contract flow.
//!
//! The consumer side runs the real [`WeatherClient`] against the recorder's
//! stub server; the provider side replays the written contract against a
//! [`FakeWeatherProvider`] seeded through state hooks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use forecast_pact::{ConsumerRecorder, ContractArtifact, Interaction, RecorderConfig, StateHooks};
use serde_json::Value;
use std::path::Path;
use test_utils::fixtures::{CONSUMER, FORECAST_STATE, HAMBURG, PROVIDER, forecast_path};
use test_utils::mocks::{FakeWeatherProvider, SeedForecastHook};
use tracing::info;
use weather_service::WeatherClient;

/// Record `interactions`, fetch the Hamburg forecast through the weather
/// client and write the contract to `dir`.
///
/// # Errors
///
/// Fails when the consumer run fails or the client cannot read the stubbed
/// forecast.
pub async fn record_weather_contract(
    dir: &Path,
    interactions: Vec<Interaction>,
) -> anyhow::Result<ContractArtifact> {
    let recorder = ConsumerRecorder::new(
        RecorderConfig::new(CONSUMER, PROVIDER).with_artifact_dir(dir),
    );
    for interaction in interactions {
        recorder.record(interaction)?;
    }

    let (forecast, artifact) = recorder
        .run(|base_url| async move {
            WeatherClient::with_client(base_url, None, reqwest::Client::new())
                .fetch_weather(HAMBURG.0, HAMBURG.1)
                .await
        })
        .await?;

    let forecast = forecast?;
    info!(summary = %forecast.summary, "Consumer run recorded");
    Ok(artifact)
}

/// Hooks that seed `provider` with `payload` for Hamburg under the forecast
/// state.
#[must_use]
pub fn forecast_hooks(provider: &FakeWeatherProvider, payload: Value) -> StateHooks {
    StateHooks::new().with(
        FORECAST_STATE,
        SeedForecastHook::new(provider, forecast_path(HAMBURG), payload),
    )
}
