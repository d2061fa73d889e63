//! Pool router library: an HTTP/1.1 server over raw sockets and a reverse
//! proxy that round-robins across health-checked backend port pools.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod proxy;
pub mod routing;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::{RunningRouter, Shutdown};
