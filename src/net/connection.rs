//! Connection identity and lifetime tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for log correlation
//! - Count in-flight connections so shutdown can drain them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::observability::metrics;

/// Relaxed ordering suffices: only uniqueness matters.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts live connections. Cheap to clone; clones share the count.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. The returned guard releases it on drop.
    pub fn track(&self) -> ConnectionGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_active_connections(now);
        ConnectionGuard {
            active: Arc::clone(&self.active),
            id: ConnectionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until every tracked connection has closed or `deadline` passes.
    ///
    /// Returns `true` when fully drained.
    pub async fn wait_for_drain(&self, deadline: Duration) -> bool {
        let give_up = Instant::now() + deadline;
        while self.active_count() > 0 {
            if Instant::now() >= give_up {
                return false;
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }
        true
    }
}

/// Keeps one connection counted for as long as it lives.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let now = self.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_active_connections(now);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
