//! Clients that deliver rendered requests to the provider under test.

use crate::config::VerifierConfig;
use crate::error::{PactError, PactResult};
use crate::message::{
    HttpRequest, HttpResponse, collect_headers, decode_body, encode_body, encode_path,
};
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, Request};
use rust_common::{HttpConfig, build_http_client};
use std::future::Future;
use std::time::Duration;
use tower::ServiceExt;
use tracing::debug;

/// Largest response body read from an in-process provider.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Sends a concrete request to the provider under test.
pub trait ProviderClient: Send + Sync {
    /// Send `request` and return the provider's response.
    ///
    /// Implementations report connection problems as
    /// [`PactError::Transport`] and an expired client-side timeout as
    /// [`PactError::Timeout`]. The verifier applies its own timeout on top.
    fn send(&self, request: &HttpRequest) -> impl Future<Output = PactResult<HttpResponse>> + Send;
}

/// Client for a provider running as a separate process.
#[derive(Debug, Clone)]
pub struct HttpProviderClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProviderClient {
    /// Create a client for the provider at `base_url`, e.g.
    /// `http://127.0.0.1:8080`, with the default verifier request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> PactResult<Self> {
        Self::with_timeout(base_url, VerifierConfig::default().request_timeout)
    }

    /// Create a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> PactResult<Self> {
        let client = build_http_client(&HttpConfig::default().with_timeout(timeout))?;
        Ok(Self::with_client(base_url, client, timeout))
    }

    /// Create a client for the timeout a verifier is configured with.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn for_verifier(base_url: impl Into<String>, config: &VerifierConfig) -> PactResult<Self> {
        Self::with_timeout(base_url, config.request_timeout)
    }

    /// Create a client using an existing reqwest client built with `timeout`.
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        }
    }

    /// Request timeout reported when the provider does not answer.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request_error(&self, url: &str, context: &str, e: &reqwest::Error) -> PactError {
        if e.is_timeout() {
            PactError::Timeout(self.timeout)
        } else {
            PactError::transport(format!("{url}: {context}{e}"))
        }
    }

    /// Provider base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ProviderClient for HttpProviderClient {
    async fn send(&self, request: &HttpRequest) -> PactResult<HttpResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| PactError::transport(format!("invalid method {}: {e}", request.method)))?;
        let url = format!("{}{}", self.base_url, encode_path(&request.path));
        debug!(%method, %url, "Sending request to provider");

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(encode_body(body));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.request_error(&url, "", &e))?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.request_error(&url, "failed to read body: ", &e))?;

        Ok(HttpResponse {
            status,
            headers,
            body: decode_body(&bytes),
        })
    }
}

/// Client driving an in-process `axum` router without opening a socket.
#[derive(Debug, Clone)]
pub struct RouterProviderClient {
    router: Router,
}

impl RouterProviderClient {
    /// Wrap a router.
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self { router }
    }
}

impl ProviderClient for RouterProviderClient {
    async fn send(&self, request: &HttpRequest) -> PactResult<HttpResponse> {
        let mut builder = Request::builder()
            .method(request.method.as_str())
            .uri(encode_path(&request.path));
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PactError::transport(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| PactError::transport(format!("invalid header value for {name}: {e}")))?;
            builder = builder.header(name, value);
        }
        let body = request
            .body
            .as_ref()
            .map_or_else(Body::empty, |body| Body::from(encode_body(body)));
        let http_request = builder
            .body(body)
            .map_err(|e| PactError::transport(format!("invalid request: {e}")))?;

        let response = match self.router.clone().oneshot(http_request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let bytes = axum::body::to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| PactError::transport(format!("failed to read body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body: decode_body(&bytes),
        })
    }
}
