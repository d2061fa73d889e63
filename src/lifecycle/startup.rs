//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every backend pool and the routing table from configuration
//! - Prime pool health before accepting traffic
//! - Start the health monitor and the HTTP server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::ports::{parse_listen_ports, parse_port_candidates, PortSpecError};
use crate::config::schema::{PoolConfig, ProbeKind, RouterConfig};
use crate::health::active::HealthMonitor;
use crate::health::probe::{HttpProbe, Probe, TcpProbe};
use crate::http::parser::RequestLimits;
use crate::http::server::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::load_balancer::pool::{BackendPool, PoolError};
use crate::net::listener::{Listener, ListenerError};
use crate::proxy::handler::ProxyHandler;
use crate::routing::{RoutingError, RoutingTable, DEFAULT_ROUTE};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{section}: {source}")]
    Ports {
        section: String,
        #[source]
        source: PortSpecError,
    },

    #[error("pool {name:?}: {source}")]
    Pool {
        name: String,
        #[source]
        source: PoolError,
    },

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("router task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Handles to a router that is accepting traffic.
pub struct RunningRouter {
    local_addr: SocketAddr,
    routes: Arc<RoutingTable>,
    server: JoinHandle<()>,
    monitor: JoinHandle<()>,
}

impl RunningRouter {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn routes(&self) -> &Arc<RoutingTable> {
        &self.routes
    }

    /// Wait for the server and health monitor to stop.
    ///
    /// Both stop once the [`Shutdown`] passed to [`start`] is triggered.
    pub async fn wait(self) -> Result<(), StartupError> {
        self.server.await?;
        self.monitor.await?;
        Ok(())
    }
}

/// Build pools and routes from `config` and start serving.
pub async fn start(config: &RouterConfig, shutdown: &Shutdown) -> Result<RunningRouter, StartupError> {
    let ports = parse_listen_ports(&config.listener.ports, config.listener.auto_fallback).map_err(
        |source| StartupError::Ports {
            section: "listener.ports".to_string(),
            source,
        },
    )?;

    let probe: Arc<dyn Probe> = match config.discovery.probe {
        ProbeKind::Http => Arc::new(HttpProbe::new()),
        ProbeKind::Tcp => Arc::new(TcpProbe),
    };

    let fallback = build_pool(DEFAULT_ROUTE, "backend", &config.backend, &probe)?;
    let mut routes = RoutingTable::new(fallback);
    for (i, tenant) in config.tenants.iter().enumerate() {
        let pool = build_pool(
            &tenant.name,
            &format!("tenants[{i}]"),
            &tenant.resolve(&config.backend),
            &probe,
        )?;
        routes = routes.with_prefix(tenant.name.clone(), &tenant.prefix, pool)?;
    }
    let routes = Arc::new(routes);

    let monitor = HealthMonitor::new(routes.pools(), config.discovery.interval());
    monitor.refresh_all().await;

    let listener = Listener::bind_first_available(&config.listener.host, &ports).await?;
    let local_addr = listener.local_addr().map_err(StartupError::LocalAddr)?;
    let monitor = tokio::spawn(monitor.run(shutdown.subscribe()));

    let targets: Vec<String> = routes
        .pools()
        .iter()
        .map(|(name, pool)| format!("{name}:{}:{:?}", pool.host(), pool.candidates()))
        .collect();
    tracing::info!(address = %local_addr, targets = ?targets, "Router listening");

    let server = HttpServer::new(listener, ProxyHandler::new(routes.clone()))
        .with_limits(RequestLimits::from(&config.limits))
        .with_drain_timeout(Duration::from_secs(config.listener.shutdown_grace_secs));
    let server = tokio::spawn(server.run(shutdown.subscribe()));

    Ok(RunningRouter {
        local_addr,
        routes,
        server,
        monitor,
    })
}

fn build_pool(
    name: &str,
    section: &str,
    config: &PoolConfig,
    probe: &Arc<dyn Probe>,
) -> Result<Arc<BackendPool>, StartupError> {
    let candidates = parse_port_candidates(&config.ports).map_err(|source| StartupError::Ports {
        section: format!("{section}.ports"),
        source,
    })?;

    let pool = BackendPool::new(
        config.host.clone(),
        candidates,
        config.health_path.clone(),
        config.timeout(),
        probe.clone(),
    )
    .map_err(|source| StartupError::Pool {
        name: name.to_string(),
        source,
    })?;

    tracing::debug!(
        pool = %name,
        host = %pool.host(),
        candidates = pool.candidates().len(),
        "Backend pool configured"
    );
    Ok(Arc::new(pool))
}
