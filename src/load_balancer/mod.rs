//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → BackendPool identified
//!     → pool.rs (lock, read healthy subset)
//!     → round_robin.rs (port at cursor, advance)
//!     → backend.rs (host:port → upstream URI)
//!     → Return port or "none available"
//! ```
//!
//! # Design Decisions
//! - Unweighted round robin only
//! - Healthy subset owned by the pool, refreshed by the health monitor and
//!   trimmed by the proxy on transport failure
//! - Unhealthy backends excluded from selection

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use pool::{BackendPool, PoolError};
pub use round_robin::RoundRobin;
