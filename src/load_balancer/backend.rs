//! Backend addressing.
//!
//! A backend is one `host:port` location. Pools share a host and differ only
//! by port, so the pool stores ports and builds addresses on demand.

/// `host:port`, bracketing IPv6 literals.
pub fn authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Absolute `http://` URI for a request against one backend.
pub fn backend_uri(host: &str, port: u16, path_and_query: &str) -> String {
    let path = if path_and_query.starts_with('/') {
        path_and_query.to_string()
    } else {
        format!("/{path_and_query}")
    };
    format!("http://{}{}", authority(host, port), path)
}
