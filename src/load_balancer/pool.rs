//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the static candidate ports for one backend host
//! - Track which candidates are currently healthy
//! - Hand out healthy ports in round-robin order
//! - Drop a port from rotation the moment a request fails against it
//!
//! # Design Decisions
//! - One mutex per pool guards the (healthy, cursor) pair; it is never held
//!   across a probe or any other await point
//! - `refresh` probes sequentially in candidate order, so the healthy subset
//!   keeps the configured order

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::health::probe::Probe;
use crate::load_balancer::round_robin::RoundRobin;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("at least one backend port is required")]
    NoCandidates,
}

/// The managed candidate set for one routing destination.
pub struct BackendPool {
    host: String,
    candidates: Vec<u16>,
    health_path: String,
    timeout: Duration,
    probe: Arc<dyn Probe>,
    rotation: Mutex<RoundRobin>,
}

impl BackendPool {
    /// Create a pool. Nothing is healthy until the first [`refresh`](Self::refresh).
    pub fn new(
        host: impl Into<String>,
        candidates: Vec<u16>,
        health_path: impl Into<String>,
        timeout: Duration,
        probe: Arc<dyn Probe>,
    ) -> Result<Self, PoolError> {
        if candidates.is_empty() {
            return Err(PoolError::NoCandidates);
        }
        Ok(Self {
            host: host.into(),
            candidates,
            health_path: health_path.into(),
            timeout,
            probe,
            rotation: Mutex::new(RoundRobin::new()),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn candidates(&self) -> &[u16] {
        &self.candidates
    }

    pub fn health_path(&self) -> &str {
        &self.health_path
    }

    /// Per-probe and per-forward timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe every candidate and replace the healthy subset.
    ///
    /// Returns the new healthy subset.
    pub async fn refresh(&self) -> Vec<u16> {
        let mut healthy = Vec::with_capacity(self.candidates.len());
        for &port in &self.candidates {
            if self
                .probe
                .probe(&self.host, port, &self.health_path, self.timeout)
                .await
            {
                healthy.push(port);
            }
        }

        self.rotation().replace(healthy.clone());
        healthy
    }

    /// Next healthy port in rotation, or `None` when nothing is healthy.
    pub fn next_backend(&self) -> Option<u16> {
        self.rotation().next()
    }

    /// Take `port` out of rotation until a later refresh finds it healthy.
    ///
    /// Returns whether the port was in rotation.
    pub fn mark_unhealthy(&self, port: u16) -> bool {
        let removed = self.rotation().remove(port);
        if removed {
            tracing::warn!(host = %self.host, port, "Backend marked unhealthy");
        }
        removed
    }

    /// Copy of the current healthy subset.
    pub fn snapshot(&self) -> Vec<u16> {
        self.rotation().members().to_vec()
    }

    fn rotation(&self) -> MutexGuard<'_, RoundRobin> {
        self.rotation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for BackendPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendPool")
            .field("host", &self.host)
            .field("candidates", &self.candidates)
            .field("health_path", &self.health_path)
            .field("timeout", &self.timeout)
            .field("healthy", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct StaticProbe(Mutex<HashMap<u16, bool>>);

    impl StaticProbe {
        fn new(status: &[(u16, bool)]) -> Arc<Self> {
            Arc::new(Self(Mutex::new(status.iter().copied().collect())))
        }

        fn set(&self, port: u16, healthy: bool) {
            self.0.lock().unwrap().insert(port, healthy);
        }
    }

    #[async_trait]
    impl Probe for StaticProbe {
        async fn probe(&self, _host: &str, port: u16, _path: &str, _timeout: Duration) -> bool {
            self.0.lock().unwrap().get(&port).copied().unwrap_or(false)
        }
    }

    fn pool(probe: Arc<StaticProbe>, candidates: &[u16]) -> BackendPool {
        BackendPool::new(
            "localhost",
            candidates.to_vec(),
            "/health",
            Duration::from_millis(100),
            probe,
        )
        .unwrap()
    }

    #[test]
    fn empty_candidates_rejected() {
        let probe = StaticProbe::new(&[]);
        let err = BackendPool::new("localhost", vec![], "/health", Duration::from_secs(1), probe)
            .unwrap_err();
        assert_eq!(err, PoolError::NoCandidates);
    }

    #[tokio::test]
    async fn nothing_healthy_before_first_refresh() {
        let pool = pool(StaticProbe::new(&[(9000, true)]), &[9000]);
        assert_eq!(pool.next_backend(), None);
        assert!(pool.snapshot().is_empty());
    }

    #[tokio::test]
    async fn refresh_and_round_robin() {
        let probe = StaticProbe::new(&[(9000, true), (9001, false), (9002, true)]);
        let pool = pool(probe, &[9000, 9001, 9002]);

        assert_eq!(pool.refresh().await, vec![9000, 9002]);
        assert_eq!(pool.snapshot(), vec![9000, 9002]);
        assert_eq!(pool.next_backend(), Some(9000));
        assert_eq!(pool.next_backend(), Some(9002));
        assert_eq!(pool.next_backend(), Some(9000));

        assert!(pool.mark_unhealthy(9000));
        assert_eq!(pool.snapshot(), vec![9002]);
        assert_eq!(pool.next_backend(), Some(9002));

        assert!(pool.mark_unhealthy(9002));
        assert_eq!(pool.next_backend(), None);
        assert!(!pool.mark_unhealthy(9002));
    }

    #[tokio::test]
    async fn recovered_backend_rejoins_on_refresh() {
        let probe = StaticProbe::new(&[(9000, true), (9001, false)]);
        let pool = pool(probe.clone(), &[9000, 9001]);

        pool.refresh().await;
        assert_eq!(pool.snapshot(), vec![9000]);

        probe.set(9001, true);
        pool.refresh().await;
        assert_eq!(pool.snapshot(), vec![9000, 9001]);
    }

    #[tokio::test]
    async fn refresh_keeps_candidate_order() {
        let probe = StaticProbe::new(&[(7002, true), (7000, true), (7001, true)]);
        let pool = pool(probe, &[7000, 7001, 7002]);
        assert_eq!(pool.refresh().await, vec![7000, 7001, 7002]);
    }

    #[tokio::test]
    async fn concurrent_selection_is_fair() {
        let probe = StaticProbe::new(&[(1, true), (2, true), (3, true)]);
        let pool = Arc::new(pool(probe, &[1, 2, 3]));
        pool.refresh().await;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                (0..30).filter_map(|_| pool.next_backend()).collect::<Vec<_>>()
            }));
        }

        let mut counts: HashMap<u16, usize> = HashMap::new();
        for task in tasks {
            for port in task.await.unwrap() {
                *counts.entry(port).or_default() += 1;
            }
        }
        assert_eq!(counts.values().sum::<usize>(), 240);
        assert!(counts.values().all(|&n| n == 80), "uneven rotation: {counts:?}");
    }
}
