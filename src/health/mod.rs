//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → BackendPool::refresh for each pool
//!     → probe.rs (HTTP GET health path, or TCP connect)
//!     → healthy subset replaced atomically
//!
//! Request failure (proxy):
//!     → BackendPool::mark_unhealthy
//!     → port leaves rotation until the next refresh
//! ```
//!
//! # Design Decisions
//! - No thresholds: one probe result decides membership
//! - Probes run outside the pool lock
//! - Health state is per-pool, not global

pub mod active;
pub mod probe;

pub use active::HealthMonitor;
pub use probe::{HttpProbe, Probe, TcpProbe};
