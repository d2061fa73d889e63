//! Reverse proxy request handler.
//!
//! # Data Flow
//! ```text
//! Request
//!     → RoutingTable::route (pool + forwarded path)
//!     → loop:
//!         pool.next_backend()
//!           None / already tried → 503 {"error":"no backend available"}
//!         UpstreamClient::forward
//!           response        → relay
//!           transport error → mark_unhealthy, next candidate
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::http::handler::{Handler, HandlerError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::observability::metrics;
use crate::proxy::upstream::UpstreamClient;
use crate::routing::RoutingTable;

pub const NO_BACKEND_MESSAGE: &str = "no backend available";

pub struct ProxyHandler {
    routes: Arc<RoutingTable>,
    upstream: UpstreamClient,
}

impl ProxyHandler {
    pub fn new(routes: Arc<RoutingTable>) -> Self {
        Self {
            routes,
            upstream: UpstreamClient::new(),
        }
    }

    pub fn routes(&self) -> &Arc<RoutingTable> {
        &self.routes
    }
}

#[async_trait]
impl Handler for ProxyHandler {
    async fn handle(&self, request: Request) -> Result<Response, HandlerError> {
        let route = self.routes.route(request.path());
        let pool = route.pool;
        let mut tried = HashSet::new();

        loop {
            let port = match pool.next_backend() {
                Some(port) if tried.insert(port) => port,
                _ => {
                    tracing::warn!(
                        route = %route.name,
                        tried = tried.len(),
                        "No backend available"
                    );
                    return Ok(Response::json_error(503, NO_BACKEND_MESSAGE));
                }
            };

            match self
                .upstream
                .forward(pool.host(), port, &request, &route.path, pool.timeout())
                .await
            {
                Ok(response) => {
                    tracing::debug!(
                        route = %route.name,
                        port,
                        status = response.status(),
                        "Upstream responded"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transport() => {
                    tracing::warn!(route = %route.name, port, error = %e, "Upstream failed, trying next backend");
                    metrics::record_upstream_failure(route.name, port);
                    pool.mark_unhealthy(port);
                }
                Err(e) => {
                    tracing::debug!(route = %route.name, error = %e, "Request cannot be forwarded");
                    return Ok(Response::json_error(400, &e.to_string()));
                }
            }
        }
    }
}
