//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (ordered prefix rules, then fallback)
//!     → matcher.rs (segment-aware prefix match + strip)
//!     → Return: pool + path to forward
//! ```
//!
//! # Design Decisions
//! - Routes built at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins; the fallback matches everything last

pub mod matcher;
pub mod router;

pub use router::{RouteMatch, RoutingError, RoutingTable, DEFAULT_ROUTE};
