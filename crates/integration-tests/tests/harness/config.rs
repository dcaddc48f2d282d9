//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use secrecy::SecretString;
use switchboard_config::{Config, LlmSettings, ProviderOverride, ServerConfig};
use switchboard_core::Provider;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    ..ServerConfig::default()
                },
                llm: LlmSettings::default(),
                ..Config::default()
            },
        }
    }

    /// Route the primary provider to a mock backend
    pub fn with_provider(mut self, provider: Provider, base_url: &str) -> Self {
        self.config.llm.provider = provider;
        self.config.llm.api_url = Some(base_url.parse().expect("valid URL"));
        self
    }

    /// Set the primary API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.config.llm.api_key = Some(SecretString::from(key));
        self
    }

    /// Enable the fallback hop to a provider served by a mock backend
    pub fn with_fallback(mut self, provider: Provider, base_url: &str) -> Self {
        self.config.llm.fallback_enabled = true;
        self.config.llm.fallback_provider = Some(provider);
        self.config.llm.providers.insert(
            provider,
            ProviderOverride {
                api_url: Some(base_url.parse().expect("valid URL")),
                api_key: Some(SecretString::from("fallback-key")),
                model: None,
            },
        );
        self
    }

    /// Set the request deadline, bypassing range validation
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.config.llm.timeout_ms = ms;
        self
    }

    /// Use single-shot responses instead of token streaming
    pub fn without_streaming(mut self) -> Self {
        self.config.llm.stream_enabled = false;
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.config.llm.system_prompt = Some(prompt.to_owned());
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
