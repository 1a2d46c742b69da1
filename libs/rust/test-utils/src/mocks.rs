//! Mock implementations for testing.
//!
//! [`FakeWeatherProvider`] stands in for the upstream weather API: an axum
//! router serving seeded forecasts by coordinates. State hooks here record
//! the states they were asked to prepare.

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use forecast_pact::StateHook;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Fake upstream weather API.
///
/// Serves `GET /{lat},{lon}` and `GET /{api_key}/{lat},{lon}` from seeded
/// payloads; unknown coordinates get a 404.
#[derive(Debug, Clone, Default)]
pub struct FakeWeatherProvider {
    forecasts: Arc<RwLock<HashMap<String, Value>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl FakeWeatherProvider {
    /// Create a provider with no forecasts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `payload` for `coordinates`, given as `lat,lon`.
    pub async fn set_forecast(&self, coordinates: &str, payload: Value) {
        self.forecasts
            .write()
            .await
            .insert(coordinates.trim_start_matches('/').to_string(), payload);
    }

    /// Remove every forecast.
    pub async fn clear(&self) {
        self.forecasts.write().await.clear();
    }

    /// Coordinates requested so far, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    /// Router serving the seeded forecasts.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/:coordinates", get(forecast))
            .route("/:api_key/:coordinates", get(keyed_forecast))
            .with_state(self.clone())
    }

    /// Serve the router on an ephemeral loopback port for the rest of the
    /// test.
    ///
    /// # Errors
    ///
    /// Returns an error if no port can be bound.
    pub async fn spawn(&self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(addr)
    }

    async fn lookup(&self, coordinates: String) -> Response {
        let payload = self.forecasts.read().await.get(&coordinates).cloned();
        self.requests.write().await.push(coordinates.clone());
        match payload {
            Some(payload) => axum::Json(payload).into_response(),
            None => (
                StatusCode::NOT_FOUND,
                axum::Json(json!({"error": "no forecast", "coordinates": coordinates})),
            )
                .into_response(),
        }
    }
}

async fn forecast(State(provider): State<FakeWeatherProvider>, Path(coordinates): Path<String>) -> Response {
    provider.lookup(coordinates).await
}

async fn keyed_forecast(
    State(provider): State<FakeWeatherProvider>,
    Path((_api_key, coordinates)): Path<(String, String)>,
) -> Response {
    provider.lookup(coordinates).await
}

/// State hook that seeds a [`FakeWeatherProvider`] with a forecast.
#[derive(Debug, Clone)]
pub struct SeedForecastHook {
    provider: FakeWeatherProvider,
    coordinates: String,
    payload: Value,
}

impl SeedForecastHook {
    /// Seed `payload` for `coordinates` whenever the state is set up.
    #[must_use]
    pub fn new(provider: &FakeWeatherProvider, coordinates: impl Into<String>, payload: Value) -> Self {
        Self {
            provider: provider.clone(),
            coordinates: coordinates.into(),
            payload,
        }
    }
}

#[async_trait]
impl StateHook for SeedForecastHook {
    async fn set_up(&self, _state: &str) -> anyhow::Result<()> {
        self.provider.clear().await;
        self.provider
            .set_forecast(&self.coordinates, self.payload.clone())
            .await;
        Ok(())
    }
}

/// State hook recording every state it prepares.
#[derive(Debug, Clone, Default)]
pub struct RecordingStateHook {
    calls: Arc<RwLock<Vec<String>>>,
    fail_with: Option<String>,
}

impl RecordingStateHook {
    /// Create a hook that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hook that records the call, then fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: Arc::default(),
            fail_with: Some(message.into()),
        }
    }

    /// States prepared so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl StateHook for RecordingStateHook {
    async fn set_up(&self, state: &str) -> anyhow::Result<()> {
        self.calls.write().await.push(state.to_string());
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}
