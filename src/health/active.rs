//! Active health checking.
//!
//! # Responsibilities
//! - Periodically refresh every backend pool
//! - Log when a pool's healthy set changes
//! - Publish per-pool healthy counts

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::load_balancer::pool::BackendPool;
use crate::observability::metrics;

/// Shortest refresh interval the monitor will run at.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct HealthMonitor {
    pools: Vec<(String, Arc<BackendPool>)>,
    interval: Duration,
}

impl HealthMonitor {
    /// `interval` is raised to [`MIN_INTERVAL`] when shorter.
    pub fn new(pools: Vec<(String, Arc<BackendPool>)>, interval: Duration) -> Self {
        Self {
            pools,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Refresh every pool once, in registration order.
    pub async fn refresh_all(&self) {
        for (name, pool) in &self.pools {
            let before = pool.snapshot();
            let healthy = pool.refresh().await;

            if healthy != before {
                tracing::info!(
                    pool = %name,
                    healthy = ?healthy,
                    candidates = pool.candidates().len(),
                    "Backend pool health changed"
                );
            } else {
                tracing::debug!(pool = %name, healthy = ?healthy, "Backend pool refreshed");
            }
            if healthy.is_empty() {
                tracing::warn!(pool = %name, "No healthy backends in pool");
            }

            metrics::record_pool_health(name, healthy.len());
        }
    }

    /// Refresh on every tick until `shutdown` fires.
    ///
    /// The first tick lands one interval from now; callers prime the pools
    /// with [`refresh_all`](Self::refresh_all) before serving traffic.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            pools = self.pools.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
