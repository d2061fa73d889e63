//! Upstream forwarding.
//!
//! # Responsibilities
//! - Translate a parsed [`Request`] into one HTTP/1.1 exchange with a backend
//! - Buffer the backend response and relay it minus hop-by-hop headers
//! - Classify failures: transport failures trigger failover, the rest do not
//!
//! # Design Decisions
//! - No connection reuse: each forward opens a fresh connection
//! - The timeout covers the whole exchange, body included
//! - Backend 4xx/5xx are responses, not failures

use std::time::Duration;

use axum::body::Body;
use hyper::header::{HeaderName, HeaderValue};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::time;

use crate::http::request::{join_path_and_query, Request};
use crate::http::response::Response;
use crate::load_balancer::backend;

/// Response headers that describe the backend connection, not the payload.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "transfer-encoding",
    "content-encoding",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "upgrade",
];

/// Client headers never copied onto the upstream request.
///
/// The client re-derives `Host` and `Content-Length` for the new hop, and
/// the body has already been de-framed so `Transfer-Encoding` no longer applies.
pub const STRIPPED_REQUEST_HEADERS: &[&str] =
    &["host", "content-length", "accept-encoding", "transfer-encoding"];

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream request: {0}")]
    Build(#[from] hyper::http::Error),

    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed reading upstream body: {0}")]
    Body(#[from] axum::Error),
}

impl UpstreamError {
    /// Whether the failure says something about the backend's health.
    pub fn is_transport(&self) -> bool {
        !matches!(self, UpstreamError::Build(_))
    }
}

/// HTTP client used for every forwarded request.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
}

impl UpstreamClient {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());
        Self { client }
    }

    /// Send `request` to `host:port` with `path` in place of the client's path.
    pub async fn forward(
        &self,
        host: &str,
        port: u16,
        request: &Request,
        path: &str,
        timeout: Duration,
    ) -> Result<Response, UpstreamError> {
        let uri = backend::backend_uri(host, port, &join_path_and_query(path, request.query()));

        let mut builder = hyper::Request::builder().method(request.method()).uri(&uri);
        for (name, value) in request.headers() {
            if STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
                continue;
            }
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                tracing::debug!(header = %name, "Skipping header not representable upstream");
                continue;
            };
            builder = builder.header(name, value);
        }
        let upstream_request = builder.body(Body::from(request.body().clone()))?;

        tracing::debug!(method = %request.method(), uri = %uri, "Forwarding request");

        match time::timeout(timeout, self.exchange(upstream_request)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(timeout)),
        }
    }

    async fn exchange(&self, request: hyper::Request<Body>) -> Result<Response, UpstreamError> {
        let upstream = self.client.request(request).await?;
        let (parts, body) = upstream.into_parts();
        let body = axum::body::to_bytes(Body::new(body), usize::MAX).await?;

        let mut response = Response::new(parts.status.as_u16());
        for (name, value) in parts.headers.iter() {
            if HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
                continue;
            }
            response.append_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        response.set_body(body);
        Ok(response)
    }
}

impl Default for UpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}
