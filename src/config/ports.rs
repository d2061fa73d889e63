//! Port spec parsing.
//!
//! A spec is a comma-separated list of ports and inclusive ranges:
//! `"8080,8082-8084"`. Duplicates are dropped, keeping the first occurrence.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortSpecError {
    #[error("invalid port number: {0:?}")]
    InvalidPort(String),

    #[error("invalid port range: {0:?}")]
    InvalidRange(String),

    #[error("port spec {0:?} names no ports")]
    Empty(String),
}

/// Backend candidates. Every port must be in `1..=65535`.
pub fn parse_port_candidates(raw: &str) -> Result<Vec<u16>, PortSpecError> {
    parse(raw, false)
}

/// Listener candidates. `auto` stands for port 0 (OS-assigned); with
/// `auto_fallback`, 0 is appended when the spec does not already name it.
pub fn parse_listen_ports(raw: &str, auto_fallback: bool) -> Result<Vec<u16>, PortSpecError> {
    let mut ports = parse(raw, true)?;
    if auto_fallback && !ports.contains(&0) {
        ports.push(0);
    }
    Ok(ports)
}

fn parse(raw: &str, allow_auto: bool) -> Result<Vec<u16>, PortSpecError> {
    let mut ports = Vec::new();
    let mut push = |port: u16| {
        if !ports.contains(&port) {
            ports.push(port);
        }
    };

    for chunk in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if allow_auto && chunk.eq_ignore_ascii_case("auto") {
            push(0);
            continue;
        }

        if let Some((start, end)) = chunk.split_once('-') {
            let start = coerce_port(start)?;
            let end = coerce_port(end)?;
            if start > end {
                return Err(PortSpecError::InvalidRange(chunk.to_string()));
            }
            (start..=end).for_each(&mut push);
            continue;
        }

        push(coerce_port(chunk)?);
    }

    if ports.is_empty() {
        return Err(PortSpecError::Empty(raw.to_string()));
    }
    Ok(ports)
}

fn coerce_port(raw: &str) -> Result<u16, PortSpecError> {
    let raw = raw.trim();
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(PortSpecError::InvalidPort(raw.to_string())),
    }
}
