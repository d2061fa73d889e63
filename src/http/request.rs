//! Inbound request value type.
//!
//! # Invariants
//! - `method` is an uppercase token
//! - `path` always starts with `/`
//! - header names are lower-cased; the last duplicate wins
//!
//! A request is immutable once built. [`Request::with_method`] is the one
//! escape hatch, used to dispatch HEAD through a GET pipeline.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;

/// A parsed HTTP/1.x request.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    target: String,
    path: String,
    query: String,
    headers: HashMap<String, String>,
    body: Bytes,
    client: Option<SocketAddr>,
}

impl Request {
    /// Start building a request.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Uppercase method token.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The raw request target as it appeared on the request line.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string without the leading `?`; empty when absent.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Look up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn client(&self) -> Option<SocketAddr> {
        self.client
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    /// Path plus `?query` when a query is present.
    pub fn path_and_query(&self) -> String {
        join_path_and_query(&self.path, &self.query)
    }

    /// Return a copy of this request dispatched under another method.
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }
}

/// Builder used by the parser and by handlers that synthesize requests.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<String>,
    target: Option<String>,
    headers: HashMap<String, String>,
    body: Bytes,
    client: Option<SocketAddr>,
}

impl RequestBuilder {
    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_ascii_uppercase());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Insert a header. Names are lower-cased and later values replace earlier ones.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn client(mut self, client: SocketAddr) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Request {
        let target = self.target.unwrap_or_else(|| "/".to_string());
        let (path, query) = split_target(&target);
        Request {
            method: self.method.unwrap_or_else(|| "GET".to_string()),
            target,
            path,
            query,
            headers: self.headers,
            body: self.body,
            client: self.client,
        }
    }
}

/// Split a request target into `(path, query)`.
///
/// Absolute-form targets lose their scheme and authority, fragments are
/// dropped, and the path is normalized to start with `/`.
pub fn split_target(target: &str) -> (String, String) {
    let without_fragment = target.split('#').next().unwrap_or_default();
    let (before_query, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    let path = match before_query.find("://") {
        Some(idx) if is_scheme(&before_query[..idx]) => {
            let rest = &before_query[idx + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or_default()
        }
        _ => before_query,
    };

    let path = if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    (path, query.to_string())
}

pub(crate) fn join_path_and_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
