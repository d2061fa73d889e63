//! TCP listener with address reuse and a bounded accept backlog.
//!
//! # Responsibilities
//! - Resolve and bind host:port with SO_REUSEADDR
//! - Report "address in use" as its own condition so callers can move on to
//!   the next candidate port
//! - Accept incoming TCP connections
//!
//! # Design Decisions
//! - Admission control is the listen backlog (128); beyond it the OS applies
//!   its own backpressure
//! - No per-listener connection cap; each connection holds one request only

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

/// Pending-connection queue length passed to `listen(2)`.
pub const LISTEN_BACKLOG: u32 = 128;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Another socket already owns the address.
    #[error("address {0} is already in use")]
    AddrInUse(SocketAddr),

    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),

    #[error("no candidate ports to bind")]
    NoCandidates,
}

impl ListenerError {
    pub fn is_addr_in_use(&self) -> bool {
        matches!(self, ListenerError::AddrInUse(_))
    }

    fn from_bind(addr: SocketAddr, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::AddrInUse {
            ListenerError::AddrInUse(addr)
        } else {
            ListenerError::Bind { addr, source }
        }
    }
}

/// A bound, listening TCP socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind `host:port`. Port 0 asks the OS for a free port.
    pub async fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let addr = resolve(host, port).await?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|e| ListenerError::from_bind(addr, e))?;

        socket
            .set_reuseaddr(true)
            .map_err(|e| ListenerError::from_bind(addr, e))?;
        socket.bind(addr).map_err(|e| ListenerError::from_bind(addr, e))?;
        let inner = socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| ListenerError::from_bind(addr, e))?;

        let local_addr = inner.local_addr().map_err(|e| ListenerError::from_bind(addr, e))?;
        tracing::info!(
            address = %local_addr,
            backlog = LISTEN_BACKLOG,
            "Listener bound"
        );

        Ok(Self { inner })
    }

    /// Bind the first candidate port that is not already in use.
    ///
    /// Only "address in use" moves on to the next candidate; any other
    /// failure is returned immediately.
    pub async fn bind_first_available(host: &str, candidates: &[u16]) -> Result<Self, ListenerError> {
        let mut last_error = None;
        for &port in candidates {
            match Self::bind(host, port).await {
                Ok(listener) => return Ok(listener),
                Err(e) if e.is_addr_in_use() => {
                    tracing::warn!(host, port, "Port in use, trying next candidate");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or(ListenerError::NoCandidates))
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, peer) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        tracing::trace!(peer_addr = %peer, "Connection accepted");
        Ok((stream, peer))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ListenerError> {
    let resolve_error = |source| ListenerError::Resolve {
        host: host.to_string(),
        port,
        source,
    };
    tokio::net::lookup_host((host, port))
        .await
        .map_err(resolve_error)?
        .next()
        .ok_or_else(|| resolve_error(io::Error::new(io::ErrorKind::NotFound, "no addresses")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1", 0).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn address_in_use_is_distinguishable() {
        let first = Listener::bind("127.0.0.1", 0).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = Listener::bind("127.0.0.1", port).await.unwrap_err();
        assert!(err.is_addr_in_use(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn first_available_skips_ports_in_use() {
        let taken = Listener::bind("127.0.0.1", 0).await.unwrap();
        let taken_port = taken.local_addr().unwrap().port();

        let listener = Listener::bind_first_available("127.0.0.1", &[taken_port, 0])
            .await
            .unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), taken_port);
    }

    #[tokio::test]
    async fn first_available_reports_exhaustion() {
        let taken = Listener::bind("127.0.0.1", 0).await.unwrap();
        let taken_port = taken.local_addr().unwrap().port();

        let err = Listener::bind_first_available("127.0.0.1", &[taken_port])
            .await
            .unwrap_err();
        assert!(err.is_addr_in_use());

        let err = Listener::bind_first_available("127.0.0.1", &[]).await.unwrap_err();
        assert!(matches!(err, ListenerError::NoCandidates));
    }
}
