//! HTTP/1.1 server over raw TCP.
//!
//! # Responsibilities
//! - Run the accept loop until shutdown
//! - Serve each connection in its own task: parse one request, dispatch to
//!   the handler, write one response, close
//! - Turn parse failures into 400 and handler failures into 500
//! - Drain in-flight connections on shutdown

use std::io;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::http::handler::Handler;
use crate::http::parser::{self, ParseError, RequestLimits};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;

/// Default time allowed for in-flight connections to finish on shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after an accept failure that is not tied to a single connection.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// One-request-per-connection HTTP server.
pub struct HttpServer<H> {
    listener: Listener,
    handler: Arc<H>,
    limits: Arc<RequestLimits>,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl<H: Handler> HttpServer<H> {
    pub fn new(listener: Listener, handler: H) -> Self {
        Self {
            listener,
            handler: Arc::new(handler),
            limits: Arc::new(RequestLimits::default()),
            tracker: ConnectionTracker::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, limits: RequestLimits) -> Self {
        self.limits = Arc::new(limits);
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the live-connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let addr = self.listener.local_addr().ok();
        tracing::info!(address = ?addr, "HTTP server starting");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            match accept_backoff(&e) {
                                None => tracing::debug!(error = %e, "Connection dropped before accept"),
                                Some(pause) => {
                                    tracing::warn!(error = %e, backoff = ?pause, "Accept failed");
                                    tokio::time::sleep(pause).await;
                                }
                            }
                            continue;
                        }
                    };
                    let guard = self.tracker.track();
                    let handler = Arc::clone(&self.handler);
                    let limits = Arc::clone(&self.limits);
                    let span = tracing::debug_span!("connection", id = %guard.id(), peer = %peer);
                    tokio::spawn(
                        async move {
                            let _guard = guard;
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::trace!(error = %e, "Failed to set TCP_NODELAY");
                            }
                            serve_connection(stream, Some(peer), handler.as_ref(), &limits).await;
                        }
                        .instrument(span),
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("HTTP server received shutdown signal, no longer accepting");
                    break;
                }
            }
        }

        let in_flight = self.tracker.active_count();
        if in_flight > 0 {
            tracing::info!(in_flight, "Draining connections");
            if !self.tracker.wait_for_drain(self.drain_timeout).await {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain deadline reached with connections still open"
                );
            }
        }

        tracing::info!("HTTP server stopped");
    }
}

/// How long to pause after `error` before accepting again.
///
/// Failures of a single peer's handshake need no pause. Anything else, such
/// as descriptor exhaustion, would repeat immediately.
fn accept_backoff(error: &ListenerError) -> Option<Duration> {
    let ListenerError::Accept(io_error) = error else {
        return Some(ACCEPT_BACKOFF);
    };
    match io_error.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

/// Serve exactly one request on `stream`, then close it.
pub async fn serve_connection<S, H>(
    mut stream: S,
    peer: Option<SocketAddr>,
    handler: &H,
    limits: &RequestLimits,
) where
    S: AsyncRead + AsyncWrite + Unpin,
    H: Handler + ?Sized,
{
    let started = Instant::now();

    let request = match parser::read_request(&mut stream, peer, limits).await {
        Ok(Some(request)) => request,
        Ok(None) => {
            tracing::debug!("Peer closed before sending a complete request");
            return;
        }
        Err(e) if e.is_protocol_error() => {
            tracing::debug!(error = %e, "Rejecting malformed request");
            let mut response = Response::json_error(400, &e.to_string());
            finish(&mut stream, &mut response, false, limits.idle_timeout).await;
            metrics::record_request("-", 400, started);
            return;
        }
        Err(ParseError::Timeout(idle)) => {
            tracing::debug!(idle = ?idle, "Connection idle, abandoning");
            return;
        }
        Err(e) => {
            tracing::debug!(error = %e, "Connection failed while reading request");
            return;
        }
    };

    let method = request.method().to_string();
    let path = request.path().to_string();
    let head_only = request.is_head();

    let mut response = dispatch(handler, request).await;
    tracing::debug!(method = %method, path = %path, status = response.status(), "Request handled");

    finish(&mut stream, &mut response, head_only, limits.idle_timeout).await;
    metrics::record_request(&method, response.status(), started);
}

/// Run the handler, coercing errors and panics into a 500.
async fn dispatch<H>(handler: &H, request: Request) -> Response
where
    H: Handler + ?Sized,
{
    match AssertUnwindSafe(handler.handle(request)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Handler failed");
            Response::json_error(500, INTERNAL_ERROR_MESSAGE)
        }
        Err(_) => {
            tracing::error!("Handler panicked");
            Response::json_error(500, INTERNAL_ERROR_MESSAGE)
        }
    }
}

/// Write the response and close, giving up once the peer stops reading for
/// longer than `idle`.
async fn finish<S>(stream: &mut S, response: &mut Response, head_only: bool, idle: Duration)
where
    S: AsyncWrite + Unpin,
{
    let written = tokio::time::timeout(idle, async {
        writer::write_response(stream, response, head_only).await?;
        stream.shutdown().await
    })
    .await;

    match written {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Write failed, aborting connection"),
        Err(_) => tracing::debug!(idle = ?idle, "Peer stopped reading, abandoning response"),
    }
}
