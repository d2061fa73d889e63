//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::parser::{self, RequestLimits};

const DEFAULT_POOL_TIMEOUT_SECS: f64 = 10.0;
const DEFAULT_INTERVAL_SECS: f64 = 2.0;

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Inbound listener.
    pub listener: ListenerConfig,

    /// Default backend pool; receives every request no tenant claims.
    pub backend: PoolConfig,

    /// Health refresh settings shared by every pool.
    pub discovery: DiscoveryConfig,

    /// Prefix-routed pools, evaluated in file order.
    pub tenants: Vec<TenantConfig>,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g. "0.0.0.0").
    pub host: String,

    /// Port spec: "8080", "8080,8081", "8000-8010", "auto".
    pub ports: String,

    /// Append port 0 (OS-assigned) as a last resort when the spec lacks "auto".
    pub auto_fallback: bool,

    /// Seconds to wait for in-flight connections on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            ports: "8080".to_string(),
            auto_fallback: true,
            shutdown_grace_secs: 10,
        }
    }
}

/// One backend pool: a host and its candidate ports.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    pub host: String,

    /// Port spec: "8000-8100", "9000,9002".
    pub ports: String,

    /// Path probed by the HTTP health check.
    pub health_path: String,

    /// Probe and forward timeout in seconds.
    pub timeout_secs: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            ports: "8000-8100".to_string(),
            health_path: "/health".to_string(),
            timeout_secs: DEFAULT_POOL_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    /// `timeout_secs` as a duration; values validation rejects map to the default.
    pub fn timeout(&self) -> Duration {
        seconds_or(self.timeout_secs, DEFAULT_POOL_TIMEOUT_SECS)
    }
}

/// How backends are probed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// GET the health path; any status below 500 is healthy.
    #[default]
    Http,
    /// TCP connect only.
    Tcp,
}

/// Health refresh configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Seconds between refreshes. Values below one second are raised to one.
    pub interval_secs: f64,

    pub probe: ProbeKind,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            probe: ProbeKind::Http,
        }
    }
}

impl DiscoveryConfig {
    /// `interval_secs` as a duration; values validation rejects map to the default.
    pub fn interval(&self) -> Duration {
        seconds_or(self.interval_secs, DEFAULT_INTERVAL_SECS)
    }
}

/// Parse a seconds value into a non-zero [`Duration`].
///
/// `None` for NaN, infinite, negative, zero or out-of-range values.
pub fn positive_seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero())
}

fn seconds_or(secs: f64, default_secs: f64) -> Duration {
    positive_seconds(secs).unwrap_or(Duration::from_secs_f64(default_secs))
}

/// A prefix-routed pool.
///
/// Unset fields inherit from `[backend]`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TenantConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match and strip (e.g. "/csharp").
    pub prefix: String,

    /// Port spec for this tenant's pool.
    pub ports: String,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub health_path: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

impl TenantConfig {
    /// The tenant's pool settings with `[backend]` filling the gaps.
    pub fn resolve(&self, defaults: &PoolConfig) -> PoolConfig {
        PoolConfig {
            host: self.host.clone().unwrap_or_else(|| defaults.host.clone()),
            ports: self.ports.clone(),
            health_path: self
                .health_path
                .clone()
                .unwrap_or_else(|| defaults.health_path.clone()),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
    pub idle_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: parser::MAX_HEADER_BYTES,
            max_body_bytes: parser::MAX_BODY_BYTES,
            idle_timeout_secs: parser::IDLE_TIMEOUT.as_secs(),
        }
    }
}

impl From<&LimitsConfig> for RequestLimits {
    fn from(config: &LimitsConfig) -> Self {
        RequestLimits {
            max_header_bytes: config.max_header_bytes,
            max_body_bytes: config.max_body_bytes,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

/// Log output style.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: RouterConfig = toml::from_str("").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.listener.ports, "8080");
        assert_eq!(config.backend.ports, "8000-8100");
        assert_eq!(config.discovery.interval(), Duration::from_secs(2));
        assert!(config.tenants.is_empty());
    }

    #[test]
    fn duration_accessors_never_panic() {
        let mut pool = PoolConfig {
            timeout_secs: 1e20,
            ..PoolConfig::default()
        };
        assert_eq!(pool.timeout(), Duration::from_secs(10));
        pool.timeout_secs = 0.25;
        assert_eq!(pool.timeout(), Duration::from_millis(250));

        let discovery = DiscoveryConfig {
            interval_secs: f64::NAN,
            ..DiscoveryConfig::default()
        };
        assert_eq!(discovery.interval(), Duration::from_secs(2));
        assert_eq!(positive_seconds(-1.0), None);
        assert_eq!(positive_seconds(0.0), None);
    }

    #[test]
    fn tenant_inherits_backend_settings() {
        let config: RouterConfig = toml::from_str(
            r#"
            [backend]
            host = "10.0.0.5"
            timeout_secs = 3.5

            [[tenants]]
            name = "csharp"
            prefix = "/csharp"
            ports = "7000-7002"
            health_path = "/healthz"
            "#,
        )
        .unwrap();

        let tenant = config.tenants[0].resolve(&config.backend);
        assert_eq!(tenant.host, "10.0.0.5");
        assert_eq!(tenant.ports, "7000-7002");
        assert_eq!(tenant.health_path, "/healthz");
        assert_eq!(tenant.timeout(), Duration::from_millis(3500));
    }

    #[test]
    fn enums_parse_lowercase() {
        let config: RouterConfig = toml::from_str(
            r#"
            [discovery]
            probe = "tcp"

            [observability]
            log_format = "pretty"
            "#,
        )
        .unwrap();
        assert_eq!(config.discovery.probe, ProbeKind::Tcp);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }
}
