//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the global subscriber. Returns an error if one is already set.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
    }
}

/// A bare level applies to this crate and tower_http; anything else is
/// taken as a full directive string.
fn default_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("hydrate_router={level},tower_http={level}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_expands() {
        assert_eq!(
            default_directives("debug"),
            "hydrate_router=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_directive_passthrough() {
        assert_eq!(default_directives("warn,hydrate_router=trace"), "warn,hydrate_router=trace");
    }
}
