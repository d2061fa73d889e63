//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (SO_REUSEADDR bind, backlog 128, accept)
//!     → connection.rs (connection id, in-flight tracking)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - "Address in use" is a distinct error so callers can walk a port list
//! - Each connection tracked for graceful shutdown

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError, LISTEN_BACKLOG};
