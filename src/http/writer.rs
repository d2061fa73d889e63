//! Response serialization.
//!
//! Every response leaves with a `Content-Length`, `Connection: close` and a
//! permissive CORS origin unless the handler chose otherwise. HEAD responses
//! keep the would-be `Content-Length` but never send the body.

use std::io;

use hyper::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const FALLBACK_REASON: &str = "OK";

/// Apply the headers every response must carry on the wire.
pub fn apply_wire_defaults(response: &mut Response) {
    response.ensure_content_length();
    response.set_default_header("Connection", "close");
    response.set_default_header("Access-Control-Allow-Origin", "*");
}

/// Canonical reason phrase for `status`, or a generic fallback.
pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or(FALLBACK_REASON)
}

/// Serialize the status line, headers and (unless `head_only`) body.
pub fn encode(response: &Response, head_only: bool) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status(), reason_phrase(response.status()));
    for (name, value) in response.headers() {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    let mut out: Vec<u8> = head.chars().map(latin1_byte).collect();
    if !head_only {
        out.extend_from_slice(response.body());
    }
    out
}

/// Write `response` to `writer`.
pub async fn write_response<W>(writer: &mut W, response: &mut Response, head_only: bool) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    apply_wire_defaults(response);
    writer.write_all(&encode(response, head_only)).await?;
    writer.flush().await
}

/// Header text is latin-1 on the wire; anything wider is replaced.
fn latin1_byte(c: char) -> u8 {
    u8::try_from(u32::from(c)).unwrap_or(b'?')
}
