//! Logging setup for Switchboard
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and a
//! `fmt` layer. `RUST_LOG` takes precedence over the configured filter.

use switchboard_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber from configuration
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), &config.filter);

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Pick the filter directive, falling back to `info` when neither parses
fn build_filter(env_override: Option<&str>, configured: &str) -> EnvFilter {
    env_override
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins() {
        let filter = build_filter(Some("switchboard_llm=trace"), "warn");
        assert_eq!(filter.to_string(), "switchboard_llm=trace");
    }

    #[test]
    fn configured_filter_without_override() {
        assert_eq!(build_filter(None, "debug").to_string(), "debug");
        assert_eq!(build_filter(Some("  "), "warn").to_string(), "warn");
    }

    #[test]
    fn invalid_directives_fall_back_to_info() {
        assert_eq!(build_filter(None, "switchboard=loud").to_string(), "info");
    }
}
