//! Static provider table
//!
//! Every [`Provider`] has exactly one descriptor. Lookups are pure and the
//! table never changes at runtime.

use std::str::FromStr;

use serde::Serialize;
use switchboard_core::Provider;
use url::Url;

use crate::error::GatewayError;

/// Model name that selects the provider's default model
pub const DEFAULT_MODEL_ALIAS: &str = "default";

/// Request and streaming shape spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dialect {
    /// `/chat/completions` with SSE `data:` deltas terminated by `[DONE]`
    #[serde(rename = "openai-compatible")]
    OpenAiCompatible,
    /// `/api/chat` with newline-delimited JSON frames
    #[serde(rename = "ollama-native")]
    OllamaNative,
    /// `/messages` with typed SSE envelopes
    #[serde(rename = "anthropic-native")]
    AnthropicNative,
}

/// Defaults and requirements of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub provider: Provider,
    pub default_model: &'static str,
    pub default_base_url: Option<&'static str>,
    pub requires_api_key: bool,
    pub requires_url: bool,
    pub dialect: Dialect,
}

static FORGE: ProviderDescriptor = ProviderDescriptor {
    provider: Provider::Forge,
    default_model: "gpt-4o-mini",
    default_base_url: Some("http://127.0.0.1:4000/v1"),
    requires_api_key: false,
    requires_url: false,
    dialect: Dialect::OpenAiCompatible,
};

static OLLAMA: ProviderDescriptor = ProviderDescriptor {
    provider: Provider::Ollama,
    default_model: "llama3.2:1b",
    default_base_url: Some("http://127.0.0.1:11434"),
    requires_api_key: false,
    requires_url: false,
    dialect: Dialect::OllamaNative,
};

static OPENAI: ProviderDescriptor = ProviderDescriptor {
    provider: Provider::Openai,
    default_model: "gpt-4o-mini",
    default_base_url: Some("https://api.openai.com/v1"),
    requires_api_key: true,
    requires_url: false,
    dialect: Dialect::OpenAiCompatible,
};

static ANTHROPIC: ProviderDescriptor = ProviderDescriptor {
    provider: Provider::Anthropic,
    default_model: "claude-3-5-haiku-latest",
    default_base_url: Some("https://api.anthropic.com/v1"),
    requires_api_key: true,
    requires_url: false,
    dialect: Dialect::AnthropicNative,
};

static N2: ProviderDescriptor = ProviderDescriptor {
    provider: Provider::N2,
    default_model: "meta-llama/Llama-3.1-8B-Instruct",
    default_base_url: None,
    requires_api_key: false,
    requires_url: true,
    dialect: Dialect::OpenAiCompatible,
};

/// Look up the descriptor of a provider
pub const fn resolve(provider: Provider) -> &'static ProviderDescriptor {
    match provider {
        Provider::Forge => &FORGE,
        Provider::Ollama => &OLLAMA,
        Provider::Openai => &OPENAI,
        Provider::Anthropic => &ANTHROPIC,
        Provider::N2 => &N2,
    }
}

/// Look up a descriptor by a caller-supplied provider name
pub fn resolve_name(name: &str) -> Result<&'static ProviderDescriptor, GatewayError> {
    Provider::from_str(name.trim())
        .map(resolve)
        .map_err(|_| GatewayError::UnknownProvider(name.to_owned()))
}

/// All descriptors in registry order
pub fn descriptors() -> impl Iterator<Item = &'static ProviderDescriptor> {
    Provider::ALL.into_iter().map(resolve)
}

impl ProviderDescriptor {
    /// Model to send upstream, substituting the default for `"default"` or blank names
    pub fn model_or_default<'a>(&'a self, requested: &'a str) -> &'a str {
        let requested = requested.trim();
        if requested.is_empty() || requested == DEFAULT_MODEL_ALIAS {
            self.default_model
        } else {
            requested
        }
    }

    /// Base URL to call, preferring the configured override
    pub fn base_url(&self, configured: Option<&Url>) -> Result<Url, GatewayError> {
        if let Some(url) = configured {
            return Ok(url.clone());
        }

        let Some(default) = self.default_base_url else {
            return Err(GatewayError::MissingUrl {
                provider: self.provider,
            });
        };

        Url::parse(default).map_err(|e| GatewayError::Config(format!("default url for {}: {e}", self.provider)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_resolves_to_its_own_descriptor() {
        for provider in Provider::ALL {
            assert_eq!(resolve(provider).provider, provider);
            assert_eq!(resolve(provider), resolve(provider));
        }
        assert_eq!(descriptors().count(), Provider::ALL.len());
    }

    #[test]
    fn dialects_and_requirements() {
        assert_eq!(resolve(Provider::Ollama).dialect, Dialect::OllamaNative);
        assert_eq!(resolve(Provider::Anthropic).dialect, Dialect::AnthropicNative);
        for provider in [Provider::Forge, Provider::Openai, Provider::N2] {
            assert_eq!(resolve(provider).dialect, Dialect::OpenAiCompatible);
        }

        assert!(resolve(Provider::Openai).requires_api_key);
        assert!(resolve(Provider::Anthropic).requires_api_key);
        assert!(!resolve(Provider::Forge).requires_api_key);
        assert!(resolve(Provider::N2).requires_url);
    }

    #[test]
    fn unknown_name_is_config_error() {
        let err = resolve_name("gemini").unwrap_err();
        assert!(matches!(err, GatewayError::UnknownProvider(ref name) if name == "gemini"));
        assert!(!err.triggers_fallback());

        assert_eq!(resolve_name("Anthropic").unwrap().provider, Provider::Anthropic);
    }

    #[test]
    fn default_model_substitution() {
        let ollama = resolve(Provider::Ollama);
        assert_eq!(ollama.model_or_default("default"), "llama3.2:1b");
        assert_eq!(ollama.model_or_default("  "), "llama3.2:1b");
        assert_eq!(ollama.model_or_default("qwen2.5:7b"), "qwen2.5:7b");
    }

    #[test]
    fn base_url_resolution() {
        let forge = resolve(Provider::Forge);
        assert_eq!(forge.base_url(None).unwrap().as_str(), "http://127.0.0.1:4000/v1");

        let custom = Url::parse("http://gateway.internal/v1").unwrap();
        assert_eq!(forge.base_url(Some(&custom)).unwrap(), custom);

        let err = resolve(Provider::N2).base_url(None).unwrap_err();
        assert!(matches!(err, GatewayError::MissingUrl { provider: Provider::N2 }));
    }

    #[test]
    fn serializes_for_settings_screens() {
        let json = serde_json::to_value(resolve(Provider::N2)).unwrap();
        assert_eq!(json["provider"], "n2");
        assert_eq!(json["dialect"], "openai-compatible");
        assert!(json["default_base_url"].is_null());
    }
}
