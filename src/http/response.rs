//! Outbound response value type.
//!
//! Headers keep insertion order and the caller's casing; lookups and
//! replacement are case-insensitive. Repeated names are allowed so that
//! relayed upstream headers such as `Set-Cookie` survive intact.

use bytes::Bytes;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";

/// An HTTP response produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    /// An empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A JSON error of the shape `{"error": "<message>"}`.
    pub fn json_error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        let mut response = Self::with_body(status, body);
        response.set_header(CONTENT_TYPE, "application/json");
        response.ensure_content_length();
        response
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Replace every value of `name` with a single `value`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.remove_header(name);
        self.headers.push((name.to_string(), value.into()));
    }

    /// Add a value without touching existing ones.
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_string(), value.into()));
    }

    /// Set `name` only when the handler hasn't already.
    pub fn set_default_header(&mut self, name: &str, value: impl Into<String>) {
        if !self.has_header(name) {
            self.headers.push((name.to_string(), value.into()));
        }
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    }

    /// Builder-style [`Response::set_header`].
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Guarantee a `Content-Length` header, computed from the body if unset.
    pub fn ensure_content_length(&mut self) {
        if !self.has_header(CONTENT_LENGTH) {
            let length = self.body.len().to_string();
            self.headers.push((CONTENT_LENGTH.to_string(), length));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_shape() {
        let response = Response::json_error(503, "no backend available");
        assert_eq!(response.status(), 503);
        assert_eq!(response.header("content-type"), Some("application/json"));

        let parsed: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(parsed, serde_json::json!({ "error": "no backend available" }));
        assert_eq!(
            response.header("content-length"),
            Some(response.body().len().to_string().as_str())
        );
    }

    #[test]
    fn explicit_content_length_is_kept() {
        let mut response = Response::with_body(200, "abc").with_header("content-length", "10");
        response.ensure_content_length();
        assert_eq!(response.header(CONTENT_LENGTH), Some("10"));
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut response = Response::new(200);
        response.append_header("Set-Cookie", "a=1");
        response.append_header("set-cookie", "b=2");
        assert_eq!(response.headers().len(), 2);

        response.set_header("SET-COOKIE", "c=3");
        assert_eq!(response.headers(), &[("SET-COOKIE".to_string(), "c=3".to_string())]);
    }

    #[test]
    fn default_header_does_not_override() {
        let mut response = Response::new(204).with_header("connection", "keep-alive");
        response.set_default_header("Connection", "close");
        response.set_default_header("Access-Control-Allow-Origin", "*");

        assert_eq!(response.header("Connection"), Some("keep-alive"));
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }
}
