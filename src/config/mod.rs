//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, ports.rs for port specs)
//!     → RouterConfig (validated, immutable)
//!     → consumed once by lifecycle::startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod ports;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use ports::{parse_listen_ports, parse_port_candidates, PortSpecError};
pub use schema::{
    DiscoveryConfig, ListenerConfig, LimitsConfig, LogFormat, ObservabilityConfig, PoolConfig,
    ProbeKind, RouterConfig, TenantConfig,
};
pub use validation::{validate_config, ValidationError};
