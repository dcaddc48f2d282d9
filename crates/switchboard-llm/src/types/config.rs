use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use switchboard_config::LlmSettings;
use switchboard_core::{Provider, is_masked_key};
use url::Url;

use crate::registry::DEFAULT_MODEL_ALIAS;

/// Deadline used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable per-call configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub provider: Provider,
    /// Base URL override, the registry default applies when absent
    pub api_url: Option<Url>,
    pub api_key: Option<SecretString>,
    pub model: String,
    /// Sampling temperature, already scaled to 0.0-1.0
    pub temperature: f64,
    pub max_tokens: u32,
    /// Deadline for one attempt
    pub timeout: Duration,
    pub stream_enabled: bool,
    pub fallback_enabled: bool,
    pub fallback_provider: Option<Provider>,
    /// Credentials used when the call falls back to `fallback_provider`
    pub fallback_credentials: ProviderCredentials,
}

/// URL, key and model for one provider
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub api_url: Option<Url>,
    pub api_key: Option<SecretString>,
    pub model: Option<String>,
}

impl GatewayConfig {
    /// Configuration with registry defaults for everything but the provider
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            api_url: None,
            api_key: None,
            model: DEFAULT_MODEL_ALIAS.to_owned(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout: DEFAULT_TIMEOUT,
            stream_enabled: true,
            fallback_enabled: false,
            fallback_provider: None,
            fallback_credentials: ProviderCredentials::default(),
        }
    }

    /// Build the per-call configuration from stored settings
    ///
    /// The 0-100 temperature is scaled down, and the primary provider falls
    /// back to its `[llm.providers]` entry for any URL or key not set at the
    /// top level.
    pub fn from_settings(settings: &LlmSettings) -> Self {
        let primary = settings.overrides_for(settings.provider);

        let fallback_credentials = settings
            .fallback_provider
            .and_then(|provider| settings.overrides_for(provider))
            .map(|o| ProviderCredentials {
                api_url: o.api_url.clone(),
                api_key: o.api_key().cloned(),
                model: o.model.clone(),
            })
            .unwrap_or_default();

        Self {
            provider: settings.provider,
            api_url: settings
                .api_url
                .clone()
                .or_else(|| primary.and_then(|o| o.api_url.clone())),
            api_key: settings
                .api_key()
                .or_else(|| primary.and_then(|o| o.api_key()))
                .cloned(),
            model: settings.model.clone(),
            temperature: f64::from(settings.temperature) / 100.0,
            max_tokens: settings.max_tokens,
            timeout: Duration::from_millis(settings.timeout_ms),
            stream_enabled: settings.stream_enabled,
            fallback_enabled: settings.fallback_enabled,
            fallback_provider: settings.fallback_provider,
            fallback_credentials,
        }
    }

    /// Usable API key, ignoring empty and masked values
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref().filter(|key| {
            let exposed = key.expose_secret();
            !exposed.is_empty() && !is_masked_key(exposed)
        })
    }

    /// Deadline in whole milliseconds, saturating
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Configuration of the single fallback hop, if one may be taken
    ///
    /// Returns `None` when fallback is disabled, no fallback provider is set,
    /// or it equals the primary provider. The returned configuration has
    /// fallback disabled, so it can never hop again.
    pub fn fallback_config(&self) -> Option<Self> {
        if !self.fallback_enabled {
            return None;
        }

        let target = self.fallback_provider?;
        if target == self.provider {
            tracing::warn!(provider = %self.provider, "fallback provider equals primary provider, skipping fallback");
            return None;
        }

        let credentials = &self.fallback_credentials;

        Some(Self {
            provider: target,
            api_url: credentials.api_url.clone(),
            api_key: credentials.api_key.clone(),
            model: credentials
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_ALIAS.to_owned()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
            stream_enabled: self.stream_enabled,
            fallback_enabled: false,
            fallback_provider: None,
            fallback_credentials: ProviderCredentials::default(),
        })
    }
}
