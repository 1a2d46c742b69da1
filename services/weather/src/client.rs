//! Weather API client.

use crate::config::Config;
use crate::error::WeatherError;
use crate::forecast::WeatherResponse;
use reqwest::Client;
use rust_common::{HttpConfig, build_http_client};
use tracing::{debug, instrument, warn};

/// Client for the upstream weather API.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl WeatherClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Platform`] if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        let http = HttpConfig::default()
            .with_timeout(config.timeout())
            .with_accept("application/json")
            .with_user_agent(concat!("weather-service/", env!("CARGO_PKG_VERSION")));
        let client = build_http_client(&http)?;
        Ok(Self::with_client(
            config.api_url.as_str(),
            config.api_key.clone(),
            client,
        ))
    }

    /// Build a client around an existing HTTP client.
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, api_key: Option<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key,
            client,
        }
    }

    /// URL of the forecast for a coordinate pair.
    #[must_use]
    pub fn forecast_url(&self, lat: f64, lon: f64) -> String {
        match &self.api_key {
            Some(key) => format!("{}/{key}/{lat},{lon}", self.base_url),
            None => format!("{}/{lat},{lon}", self.base_url),
        }
    }

    /// Fetch the current forecast for a coordinate pair.
    ///
    /// # Errors
    ///
    /// - [`WeatherError::Http`] if the request fails
    /// - [`WeatherError::UnexpectedStatus`] for a non-2xx answer
    /// - [`WeatherError::Parse`] if the body lacks `currently.summary`
    #[instrument(skip(self))]
    pub async fn fetch_weather(&self, lat: f64, lon: f64) -> Result<WeatherResponse, WeatherError> {
        let url = self.forecast_url(lat, lon);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Weather API rejected forecast request");
            return Err(WeatherError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let forecast = WeatherResponse::from_body(&body)?;
        debug!(summary = %forecast.summary, "Forecast received");
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::{HAMBURG, forecast_payload};
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> WeatherClient {
        let mut config = Config::new(Url::parse(&server.uri()).unwrap()).with_timeout_secs(2);
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        WeatherClient::new(&config).unwrap()
    }

    #[test]
    fn test_forecast_url() {
        let client = WeatherClient::with_client("http://localhost:9000/", None, Client::new());
        assert_eq!(client.forecast_url(HAMBURG.0, HAMBURG.1), "http://localhost:9000/53.5511,9.9937");

        let keyed = WeatherClient::with_client("http://localhost:9000", Some("k3y".to_string()), Client::new());
        assert_eq!(keyed.forecast_url(52.52, 13.405), "http://localhost:9000/k3y/52.52,13.405");
    }

    #[tokio::test]
    async fn test_fetch_weather_reads_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/53.5511,9.9937"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_payload("Rain")))
            .expect(1)
            .mount(&server)
            .await;

        let forecast = client_for(&server, None).fetch_weather(HAMBURG.0, HAMBURG.1).await.unwrap();
        assert_eq!(forecast.summary, "Rain");
    }

    #[tokio::test]
    async fn test_fetch_weather_with_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secret/53.5511,9.9937"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_payload("Clear")))
            .mount(&server)
            .await;

        let forecast = client_for(&server, Some("secret"))
            .fetch_weather(HAMBURG.0, HAMBURG.1)
            .await
            .unwrap();
        assert_eq!(forecast.summary, "Clear");
    }

    #[tokio::test]
    async fn test_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server, None).fetch_weather(HAMBURG.0, HAMBURG.1).await.unwrap_err();
        assert!(matches!(err, WeatherError::UnexpectedStatus { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_renamed_summary_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"currently": {"headline": "Rain"}})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, None).fetch_weather(HAMBURG.0, HAMBURG.1).await.unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_a_retryable_http_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = WeatherClient::with_client(format!("http://127.0.0.1:{port}"), None, Client::new());

        let err = client.fetch_weather(HAMBURG.0, HAMBURG.1).await.unwrap_err();
        assert!(matches!(err, WeatherError::Http(_)));
        assert!(err.is_retryable());
    }
}
