//! Reverse proxy: routing a request to a pool and relaying the backend's answer.

pub mod handler;
pub mod upstream;

pub use handler::{ProxyHandler, NO_BACKEND_MESSAGE};
pub use upstream::{UpstreamClient, UpstreamError};
