//! Backend liveness probes.
//!
//! A probe answers one question for one `host:port`: is it worth sending
//! traffic to right now? Any failure to get an answer counts as "no".

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use hyper::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpStream;
use tokio::time;

use crate::load_balancer::backend;

const USER_AGENT: &str = "pool-router-health-check";

#[async_trait]
pub trait Probe: Send + Sync + fmt::Debug {
    /// `true` when the backend at `host:port` should be in rotation.
    async fn probe(&self, host: &str, port: u16, health_path: &str, timeout: Duration) -> bool;
}

/// `GET {health_path}` over HTTP/1.1.
///
/// Any status below 500 counts as healthy: a 404 from a backend that has no
/// health route still proves the process is up and answering.
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
}

impl HttpProbe {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProbe").finish_non_exhaustive()
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, host: &str, port: u16, health_path: &str, timeout: Duration) -> bool {
        let uri = backend::backend_uri(host, port, health_path);
        let request = match Request::builder()
            .method("GET")
            .uri(&uri)
            .header("user-agent", USER_AGENT)
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status();
                let healthy = status.as_u16() < 500;
                if !healthy {
                    tracing::debug!(port, status = %status, "Health check failed: server error");
                }
                healthy
            }
            Ok(Err(e)) => {
                tracing::debug!(port, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(port, timeout = ?timeout, "Health check failed: timeout");
                false
            }
        }
    }
}

/// Plain TCP connect; healthy when the port accepts a connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, host: &str, port: u16, _health_path: &str, timeout: Duration) -> bool {
        let addr = backend::authority(host, port);
        match time::timeout(timeout, TcpStream::connect(addr.as_str())).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(port, error = %e, "TCP probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(port, "TCP probe timed out");
                false
            }
        }
    }
}
