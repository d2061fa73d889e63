//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick the log level from `RUST_LOG`, falling back to configuration
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Compact format for production, pretty format for development

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

pub use tracing_subscriber::util::TryInitError;

/// Install the global subscriber.
///
/// `default_level` is any `EnvFilter` directive ("info",
/// "pool_router=debug,info") and only applies when `RUST_LOG` is unset.
pub fn init_logging(default_level: &str, format: LogFormat) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    }
}
