//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener)
//!     → server.rs (one task per connection, 30s idle timeout)
//!     → parser.rs (bounded parse into request.rs)
//!     → handler.rs (external handler, or the proxy)
//!     → writer.rs (serialize response.rs, force Content-Length / Connection: close)
//!     → close
//! ```
//!
//! # Design Decisions
//! - Exactly one request per connection; no keep-alive, no chunked bodies
//! - Parse failures answer 400, handler failures answer 500, stalls get no answer
//! - Wire types are plain values; only the server touches sockets

pub mod handler;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;
pub mod writer;

pub use handler::{handler_fn, Handler, HandlerError, HeadAsGet};
pub use parser::{ParseError, RequestLimits};
pub use request::Request;
pub use response::Response;
pub use server::HttpServer;
