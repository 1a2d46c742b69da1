//! Stub HTTP server serving recorded interactions.

use super::{RecorderState, UnmatchedRequest};
use crate::error::{PactError, PactResult};
use crate::message::{
    HttpRequest, HttpResponse, collect_headers, decode_body, decode_path, encode_body,
};
use crate::store::StubLookup;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// How long graceful shutdown may take before the server task is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A running stub server.
///
/// The listening socket belongs to the server task. [`shutdown`](Self::shutdown)
/// stops it and waits until the port is released; dropping the server
/// without calling it aborts the task.
#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StubServer {
    pub(crate) async fn bind(state: Arc<RecorderState>, bind_addr: &str) -> PactResult<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| PactError::PortBind {
                addr: bind_addr.to_string(),
                source,
            })?;
        let addr = listener.local_addr()?;

        let app = Router::new()
            .fallback(serve_stub)
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "Stub server failed");
            }
        });

        info!(%addr, "Stub server listening");
        Ok(Self {
            addr,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    /// Bound socket address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop serving and release the port.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!(addr = %self.addr, "Stub server did not stop in time; aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
        info!(addr = %self.addr, "Stub server stopped");
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn serve_stub(
    State(state): State<Arc<RecorderState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = HttpRequest {
        method: method.as_str().to_ascii_uppercase(),
        path: decode_path(uri.path()),
        headers: collect_headers(&headers),
        body: decode_body(&body),
    };

    match state.store.find_matching_stub(&request) {
        StubLookup::Matched {
            interaction,
            shadowed,
        } => {
            if !shadowed.is_empty() {
                state.record_ambiguity(&request, &interaction.interaction().description, shadowed);
            }
            into_axum_response(&interaction.interaction().response.render())
        }
        StubLookup::NotFound { candidates } => {
            warn!(method = %request.method, path = %request.path, "Unmatched stub request");
            let body = json!({
                "error": "unmatched request",
                "method": request.method,
                "path": request.path,
                "mismatches": candidates
                    .iter()
                    .map(|(description, mismatch)| json!({
                        "interaction": description,
                        "path": mismatch.path,
                        "expected": mismatch.expected,
                        "actual": mismatch.actual,
                    }))
                    .collect::<Vec<_>>(),
            });
            state.record_unmatched(UnmatchedRequest {
                request,
                candidates,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
        }
    }
}

fn into_axum_response(response: &HttpResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping header that is not valid HTTP"),
        }
    }
    let body = response.body.as_ref().map(encode_body).unwrap_or_default();
    (status, headers, Body::from(body)).into_response()
}
