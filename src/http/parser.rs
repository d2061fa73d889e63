//! Bounded, fail-fast HTTP/1.x request parser.
//!
//! # Data Flow
//! ```text
//! socket bytes
//!     → accumulate until CRLFCRLF (capped at max_header_bytes)
//!     → request line: METHOD TARGET VERSION
//!     → header lines: name ":" value
//!     → body: Content-Length bytes, clamped to max_body_bytes
//! ```
//!
//! A clean disconnect before the header terminator yields `Ok(None)`: the
//! caller closes the socket without responding. Bytes declared beyond the body
//! clamp are read and discarded so the peer sees an orderly close.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::request::Request;

/// Default cap on the header section, terminator included.
pub const MAX_HEADER_BYTES: usize = 16 * 1024;
/// Default cap on the delivered body.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
/// Default idle timeout applied to every socket read.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const HEADER_CHUNK: usize = 4096;
const BODY_CHUNK: usize = 64 * 1024;

/// Errors raised while reading a request.
///
/// Protocol variants map to a 400 response; `Timeout` and `Io` abandon the
/// connection without one.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("header section too large")]
    HeaderTooLarge,

    #[error("invalid request line")]
    InvalidRequestLine,

    #[error("unsupported HTTP version")]
    UnsupportedVersion,

    #[error("invalid header")]
    InvalidHeader,

    #[error("idle timeout after {0:?}")]
    Timeout(Duration),

    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    /// True for malformed input that deserves a 400 response.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, ParseError::Timeout(_) | ParseError::Io(_))
    }
}

/// Resource caps applied to one inbound request.
#[derive(Debug, Clone)]
pub struct RequestLimits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
    pub idle_timeout: Duration,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_header_bytes: MAX_HEADER_BYTES,
            max_body_bytes: MAX_BODY_BYTES,
            idle_timeout: IDLE_TIMEOUT,
        }
    }
}

/// Read exactly one request from `reader`.
pub async fn read_request<R>(
    reader: &mut R,
    client: Option<SocketAddr>,
    limits: &RequestLimits,
) -> Result<Option<Request>, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(HEADER_CHUNK);
    let mut chunk = [0u8; HEADER_CHUNK];

    let header_end = loop {
        let searched_from = buffer.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
        let read = read_with_timeout(reader, &mut chunk, limits.idle_timeout).await?;
        if read == 0 {
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk[..read]);

        if let Some(pos) = find_terminator(&buffer, searched_from) {
            if pos + HEADER_TERMINATOR.len() > limits.max_header_bytes {
                return Err(ParseError::HeaderTooLarge);
            }
            break pos;
        }
        if buffer.len() > limits.max_header_bytes {
            return Err(ParseError::HeaderTooLarge);
        }
    };

    let head = latin1(&buffer[..header_end]);
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default().trim();
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::InvalidRequestLine);
    };
    if !matches!(*version, "HTTP/1.1" | "HTTP/1.0") {
        return Err(ParseError::UnsupportedVersion);
    }

    let mut builder = Request::builder().method(method).target(*target);
    let mut declared_length: u64 = 0;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            declared_length = parse_content_length(value);
        }
        builder = builder.header(name, value);
    }

    let body_length = usize::try_from(declared_length)
        .unwrap_or(usize::MAX)
        .min(limits.max_body_bytes);

    let mut body = buffer.split_off(header_end + HEADER_TERMINATOR.len());
    let mut consumed = body.len() as u64;
    body.truncate(body_length);

    let mut body_chunk = vec![0u8; BODY_CHUNK];
    while body.len() < body_length {
        let wanted = (body_length - body.len()).min(BODY_CHUNK);
        let read = read_with_timeout(reader, &mut body_chunk[..wanted], limits.idle_timeout).await?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&body_chunk[..read]);
        consumed += read as u64;
    }

    if consumed < declared_length {
        drain(reader, declared_length - consumed, &mut body_chunk, limits.idle_timeout).await;
    }

    if let Some(client) = client {
        builder = builder.client(client);
    }
    Ok(Some(builder.body(body).build()))
}

/// Content-Length as a non-negative integer; anything unparseable counts as 0.
fn parse_content_length(value: &str) -> u64 {
    value
        .parse::<i64>()
        .ok()
        .and_then(|length| u64::try_from(length).ok())
        .unwrap_or(0)
}

/// Discard up to `remaining` bytes. Errors end the drain quietly.
async fn drain<R>(reader: &mut R, mut remaining: u64, scratch: &mut [u8], idle: Duration)
where
    R: AsyncRead + Unpin,
{
    while remaining > 0 {
        let wanted = usize::try_from(remaining).unwrap_or(usize::MAX).min(scratch.len());
        match read_with_timeout(reader, &mut scratch[..wanted], idle).await {
            Ok(0) | Err(_) => break,
            Ok(read) => remaining -= read as u64,
        }
    }
    if remaining > 0 {
        tracing::debug!(remaining, "Stopped draining oversized request body");
    }
}

async fn read_with_timeout<R>(reader: &mut R, buf: &mut [u8], idle: Duration) -> Result<usize, ParseError>
where
    R: AsyncRead + Unpin,
{
    match tokio::time::timeout(idle, reader.read(buf)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ParseError::Timeout(idle)),
    }
}

fn find_terminator(buffer: &[u8], from: usize) -> Option<usize> {
    buffer[from..]
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|pos| pos + from)
}

/// ISO-8859-1 decode: every byte maps to the code point of the same value.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn parse(raw: &[u8], limits: RequestLimits) -> Result<Option<Request>, ParseError> {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        client.write_all(raw).await.unwrap();
        drop(client);
        read_request(&mut server, None, &limits).await
    }

    #[tokio::test]
    async fn parses_request_line_headers_and_body() {
        let raw = b"post /orders?id=7 HTTP/1.1\r\nHost: example\r\nX-Trace:  abc \r\nContent-Length: 5\r\n\r\nhello";
        let request = parse(raw, RequestLimits::default()).await.unwrap().unwrap();

        assert_eq!(request.method(), "POST");
        assert_eq!(request.target(), "/orders?id=7");
        assert_eq!(request.path(), "/orders");
        assert_eq!(request.query(), "id=7");
        assert_eq!(request.header("x-trace"), Some("abc"));
        assert_eq!(request.header("host"), Some("example"));
        assert_eq!(request.body().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn missing_content_length_means_empty_body() {
        let raw = b"GET / HTTP/1.0\r\n\r\nignored";
        let request = parse(raw, RequestLimits::default()).await.unwrap().unwrap();
        assert!(request.body().is_empty());
    }

    #[tokio::test]
    async fn unparseable_content_length_means_empty_body() {
        for value in ["abc", "-4", ""] {
            let raw = format!("PUT /x HTTP/1.1\r\nContent-Length: {value}\r\n\r\nbody");
            let request = parse(raw.as_bytes(), RequestLimits::default()).await.unwrap().unwrap();
            assert!(request.body().is_empty(), "content-length {value:?}");
        }
    }

    #[tokio::test]
    async fn body_is_truncated_to_the_cap() {
        let limits = RequestLimits {
            max_body_bytes: 8,
            ..RequestLimits::default()
        };
        let raw = b"POST /upload HTTP/1.1\r\nContent-Length: 20\r\n\r\n0123456789abcdefghij";
        let request = parse(raw, limits).await.unwrap().unwrap();

        assert_eq!(request.body().as_ref(), b"01234567");
        assert_eq!(request.header("content-length"), Some("20"));
    }

    #[tokio::test]
    async fn short_body_delivers_what_arrived() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        let request = parse(raw, RequestLimits::default()).await.unwrap().unwrap();
        assert_eq!(request.body().as_ref(), b"abc");
    }

    #[tokio::test]
    async fn clean_disconnect_before_terminator_is_silent() {
        assert!(parse(b"GET / HTTP/1.1\r\nHost: x\r\n", RequestLimits::default())
            .await
            .unwrap()
            .is_none());
        assert!(parse(b"", RequestLimits::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_header_section_is_rejected() {
        let limits = RequestLimits {
            max_header_bytes: 64,
            ..RequestLimits::default()
        };
        let raw = format!("GET / HTTP/1.1\r\nX-Filler: {}\r\n\r\n", "a".repeat(100));
        let err = parse(raw.as_bytes(), limits).await.unwrap_err();
        assert!(matches!(err, ParseError::HeaderTooLarge));
        assert!(err.is_protocol_error());
    }

    #[tokio::test]
    async fn terminator_never_arriving_is_rejected_at_the_cap() {
        let raw = vec![b'a'; MAX_HEADER_BYTES + 10];
        let err = parse(&raw, RequestLimits::default()).await.unwrap_err();
        assert!(matches!(err, ParseError::HeaderTooLarge));
    }

    #[tokio::test]
    async fn request_line_needs_three_tokens() {
        for line in ["GET /\r\n\r\n", "GET / HTTP/1.1 extra\r\n\r\n"] {
            let err = parse(line.as_bytes(), RequestLimits::default()).await.unwrap_err();
            assert!(matches!(err, ParseError::InvalidRequestLine), "{line:?}");
        }
    }

    #[tokio::test]
    async fn only_http_1x_is_accepted() {
        let err = parse(b"GET / HTTP/2.0\r\n\r\n", RequestLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion));
    }

    #[tokio::test]
    async fn header_without_colon_is_rejected() {
        let err = parse(b"GET / HTTP/1.1\r\nbroken header\r\n\r\n", RequestLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader));
    }

    #[tokio::test]
    async fn header_value_keeps_later_colons() {
        let raw = b"GET / HTTP/1.1\r\nReferer: http://a:1/b\r\n\r\n";
        let request = parse(raw, RequestLimits::default()).await.unwrap().unwrap();
        assert_eq!(request.header("referer"), Some("http://a:1/b"));
    }

    #[tokio::test]
    async fn stalled_client_times_out() {
        let (_client, mut server) = tokio::io::duplex(1024);
        let limits = RequestLimits {
            idle_timeout: Duration::from_millis(50),
            ..RequestLimits::default()
        };
        let err = read_request(&mut server, None, &limits).await.unwrap_err();
        assert!(matches!(err, ParseError::Timeout(_)));
        assert!(!err.is_protocol_error());
    }
}
