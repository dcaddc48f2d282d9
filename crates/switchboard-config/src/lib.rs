#![allow(clippy::must_use_candidate)]

pub mod cors;
mod env;
pub mod health;
pub mod llm;
mod loader;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use cors::*;
pub use health::*;
pub use llm::*;
pub use server::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level Switchboard configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Gateway settings (provider, model, sampling, fallback)
    #[serde(default)]
    pub llm: LlmSettings,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
