//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate port specs, timeouts and prefixes
//! - Detect conflicting tenants
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::ports::{parse_listen_ports, parse_port_candidates};
use crate::config::schema::{positive_seconds, PoolConfig, RouterConfig};
use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::DEFAULT_ROUTE;

const SECONDS_MESSAGE: &str = "must be a positive number of seconds within range";

/// One semantic problem, located by its dotted config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::new("listener.host", "must not be empty"));
    }
    if let Err(e) = parse_listen_ports(&config.listener.ports, config.listener.auto_fallback) {
        errors.push(ValidationError::new("listener.ports", e.to_string()));
    }

    validate_pool("backend", &config.backend, &mut errors);

    if positive_seconds(config.discovery.interval_secs).is_none() {
        errors.push(ValidationError::new(
            "discovery.interval_secs",
            SECONDS_MESSAGE,
        ));
    }

    let mut names = HashSet::from([DEFAULT_ROUTE.to_string()]);
    let mut prefixes = HashSet::new();
    for (i, tenant) in config.tenants.iter().enumerate() {
        let field = format!("tenants[{i}]");

        if tenant.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{field}.name"), "must not be empty"));
        } else if !names.insert(tenant.name.clone()) {
            errors.push(ValidationError::new(
                format!("{field}.name"),
                format!("{:?} is already in use", tenant.name),
            ));
        }

        match PathPrefixMatcher::new(&tenant.prefix) {
            Some(matcher) => {
                if !prefixes.insert(matcher.prefix().to_string()) {
                    errors.push(ValidationError::new(
                        format!("{field}.prefix"),
                        format!("{:?} is routed by an earlier tenant", matcher.prefix()),
                    ));
                }
            }
            None => errors.push(ValidationError::new(
                format!("{field}.prefix"),
                "must name a non-root path",
            )),
        }

        validate_pool(&field, &tenant.resolve(&config.backend), &mut errors);
    }

    if config.limits.max_header_bytes == 0 {
        errors.push(ValidationError::new("limits.max_header_bytes", "must be greater than zero"));
    }
    if config.limits.idle_timeout_secs == 0 {
        errors.push(ValidationError::new("limits.idle_timeout_secs", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_pool(section: &str, pool: &PoolConfig, errors: &mut Vec<ValidationError>) {
    if pool.host.trim().is_empty() {
        errors.push(ValidationError::new(format!("{section}.host"), "must not be empty"));
    }
    if let Err(e) = parse_port_candidates(&pool.ports) {
        errors.push(ValidationError::new(format!("{section}.ports"), e.to_string()));
    }
    if !pool.health_path.starts_with('/') {
        errors.push(ValidationError::new(
            format!("{section}.health_path"),
            "must start with '/'",
        ));
    }
    if positive_seconds(pool.timeout_secs).is_none() {
        errors.push(ValidationError::new(
            format!("{section}.timeout_secs"),
            SECONDS_MESSAGE,
        ));
    }
}
