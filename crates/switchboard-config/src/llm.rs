use std::ops::RangeInclusive;
use std::str::FromStr;

use http::StatusCode;
use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use switchboard_core::{HttpError, MASKED_API_KEY, Provider, is_masked_key};
use thiserror::Error;
use url::Url;

/// Accepted temperature values, later divided by 100
pub const TEMPERATURE_RANGE: RangeInclusive<u64> = 0..=100;
/// Accepted completion token limits
pub const MAX_TOKENS_RANGE: RangeInclusive<u64> = 100..=32_000;
/// Accepted request deadlines in milliseconds
pub const TIMEOUT_MS_RANGE: RangeInclusive<u64> = 5_000..=120_000;

/// Gateway settings as stored by the dashboard
///
/// Numeric fields keep the units the settings screen works in; the gateway
/// converts them into a per-call configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmSettings {
    /// Primary provider
    #[serde(default = "default_provider")]
    pub provider: Provider,
    /// Base URL override for the primary provider
    #[serde(default)]
    pub api_url: Option<Url>,
    /// API key for the primary provider
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Model name, `"default"` selects the provider's default model
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature on a 0-100 scale
    #[serde(default = "default_temperature")]
    pub temperature: u32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Whether responses are streamed token by token
    #[serde(default = "default_true")]
    pub stream_enabled: bool,
    /// Whether a failed call is retried once against `fallback_provider`
    #[serde(default)]
    pub fallback_enabled: bool,
    /// Secondary provider for the fallback hop
    #[serde(default)]
    pub fallback_provider: Option<Provider>,
    /// System prompt prepended to every conversation
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Per-provider credentials and overrides, used by the fallback hop
    #[serde(default)]
    pub providers: IndexMap<Provider, ProviderOverride>,
}

/// Credentials and overrides for one provider
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderOverride {
    /// Base URL override
    #[serde(default)]
    pub api_url: Option<Url>,
    /// API key
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Model override
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderOverride {
    /// Usable API key, ignoring empty and masked values
    pub fn api_key(&self) -> Option<&SecretString> {
        usable_key(self.api_key.as_ref())
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_url: None,
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
            stream_enabled: true,
            fallback_enabled: false,
            fallback_provider: None,
            system_prompt: None,
            providers: IndexMap::new(),
        }
    }
}

impl LlmSettings {
    /// Usable API key for the primary provider, ignoring empty and masked values
    pub fn api_key(&self) -> Option<&SecretString> {
        usable_key(self.api_key.as_ref())
    }

    /// Stored overrides for a provider
    pub fn overrides_for(&self, provider: Provider) -> Option<&ProviderOverride> {
        self.providers.get(&provider)
    }

    /// Check numeric ranges and the fallback invariant
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("temperature", u64::from(self.temperature), &TEMPERATURE_RANGE)?;
        check_range("max_tokens", u64::from(self.max_tokens), &MAX_TOKENS_RANGE)?;
        check_range("timeout_ms", self.timeout_ms, &TIMEOUT_MS_RANGE)?;

        if self.fallback_enabled && self.fallback_provider == Some(self.provider) {
            return Err(SettingsError::SameFallbackProvider(self.provider));
        }

        Ok(())
    }

    /// Apply a partial update from the settings screen
    ///
    /// The update is applied to a copy and only committed when the result
    /// validates. An `api_key` equal to [`MASKED_API_KEY`] keeps the stored
    /// key; an empty one clears it. Switching provider drops the stored URL
    /// and key unless new ones are sent, so the new provider falls back to
    /// its `[llm.providers]` entry.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown providers, unparseable URLs, or values
    /// outside the accepted ranges
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<(), SettingsError> {
        let mut next = self.clone();

        if let Some(name) = update.provider {
            next.provider = parse_provider(&name)?;
        }
        // A stored URL and key belong to the provider they were entered for
        let provider_changed = next.provider != self.provider;

        match update.api_url {
            Some(url) => next.api_url = parse_optional_url(&url)?,
            None if provider_changed => next.api_url = None,
            None => {}
        }
        match update.api_key {
            Some(key) if is_masked_key(&key) => {
                if provider_changed {
                    tracing::debug!("provider changed, dropping stored api key of the previous provider");
                    next.api_key = None;
                } else {
                    tracing::debug!("settings update carries masked api key, keeping stored key");
                }
            }
            Some(key) if key.is_empty() => next.api_key = None,
            Some(key) => next.api_key = Some(SecretString::from(key)),
            None if provider_changed => next.api_key = None,
            None => {}
        }
        if let Some(model) = update.model {
            next.model = if model.trim().is_empty() {
                default_model()
            } else {
                model
            };
        }
        if let Some(temperature) = update.temperature {
            next.temperature = temperature;
        }
        if let Some(max_tokens) = update.max_tokens {
            next.max_tokens = max_tokens;
        }
        if let Some(timeout_ms) = update.timeout_ms {
            next.timeout_ms = timeout_ms;
        }
        if let Some(enabled) = update.stream_enabled {
            next.stream_enabled = enabled;
        }
        if let Some(enabled) = update.fallback_enabled {
            next.fallback_enabled = enabled;
        }
        if let Some(name) = update.fallback_provider {
            next.fallback_provider = if name.is_empty() {
                None
            } else {
                Some(parse_provider(&name)?)
            };
        }
        if let Some(prompt) = update.system_prompt {
            next.system_prompt = if prompt.trim().is_empty() { None } else { Some(prompt) };
        }

        next.validate()?;
        *self = next;

        Ok(())
    }

    /// Client-facing view with stored keys replaced by [`MASKED_API_KEY`]
    pub fn masked(&self) -> SettingsView {
        SettingsView {
            provider: self.provider,
            api_url: self.api_url.as_ref().map(ToString::to_string),
            api_key: self.api_key().map(|_| MASKED_API_KEY.to_owned()),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_ms: self.timeout_ms,
            stream_enabled: self.stream_enabled,
            fallback_enabled: self.fallback_enabled,
            fallback_provider: self.fallback_provider,
            system_prompt: self.system_prompt.clone(),
        }
    }
}

/// Partial settings update as sent by the settings screen
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsUpdate {
    pub provider: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<u32>,
    pub max_tokens: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub stream_enabled: Option<bool>,
    pub fallback_enabled: Option<bool>,
    pub fallback_provider: Option<String>,
    pub system_prompt: Option<String>,
}

/// Settings as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub provider: Provider,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: u32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub stream_enabled: bool,
    pub fallback_enabled: bool,
    pub fallback_provider: Option<Provider>,
    pub system_prompt: Option<String>,
}

/// Rejected settings values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Numeric value outside its accepted range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    /// Provider name not in the registry
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// API URL could not be parsed
    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    /// Fallback enabled towards the primary provider itself
    #[error("fallback provider must differ from the primary provider ({0})")]
    SameFallbackProvider(Provider),
}

impl HttpError for SettingsError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_type(&self) -> &str {
        "invalid_settings"
    }
}

fn check_range(field: &'static str, value: u64, range: &RangeInclusive<u64>) -> Result<(), SettingsError> {
    if range.contains(&value) {
        return Ok(());
    }

    Err(SettingsError::OutOfRange {
        field,
        value,
        min: *range.start(),
        max: *range.end(),
    })
}

fn parse_provider(name: &str) -> Result<Provider, SettingsError> {
    Provider::from_str(name.trim()).map_err(|_| SettingsError::UnknownProvider(name.to_owned()))
}

fn parse_optional_url(raw: &str) -> Result<Option<Url>, SettingsError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Url::parse(raw)
        .map(Some)
        .map_err(|e| SettingsError::InvalidUrl(format!("{raw}: {e}")))
}

fn usable_key(key: Option<&SecretString>) -> Option<&SecretString> {
    key.filter(|k| {
        let exposed = k.expose_secret();
        !exposed.is_empty() && !is_masked_key(exposed)
    })
}

const fn default_provider() -> Provider {
    Provider::Ollama
}

fn default_model() -> String {
    "default".to_owned()
}

const fn default_temperature() -> u32 {
    70
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn settings_with_key(key: &str) -> LlmSettings {
        LlmSettings {
            provider: Provider::Openai,
            api_key: Some(SecretString::from(key)),
            ..LlmSettings::default()
        }
    }

    #[test]
    fn defaults_are_valid() {
        let settings = LlmSettings::default();
        assert_eq!(settings.provider, Provider::Ollama);
        assert_eq!(settings.model, "default");
        assert_eq!(settings.timeout_ms, 30_000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn parses_toml_section() {
        let settings: LlmSettings = toml::from_str(indoc! {r#"
            provider = "anthropic"
            api_key = "sk-ant"
            model = "claude-3-5-haiku-latest"
            temperature = 30
            max_tokens = 1024
            fallback_enabled = true
            fallback_provider = "ollama"

            [providers.ollama]
            api_url = "http://10.0.0.5:11434"
        "#})
        .unwrap();

        assert_eq!(settings.provider, Provider::Anthropic);
        assert_eq!(settings.api_key().unwrap().expose_secret(), "sk-ant");
        assert_eq!(settings.fallback_provider, Some(Provider::Ollama));
        let ollama = settings.overrides_for(Provider::Ollama).unwrap();
        assert_eq!(ollama.api_url.as_ref().unwrap().as_str(), "http://10.0.0.5:11434/");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_provider_in_toml() {
        let result = toml::from_str::<LlmSettings>(r#"provider = "gemini""#);
        assert!(result.is_err());
    }

    #[test]
    fn range_violations_are_reported() {
        let settings = LlmSettings {
            max_tokens: 50,
            ..LlmSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::OutOfRange {
                field: "max_tokens",
                value: 50,
                min: 100,
                max: 32_000,
            })
        );

        let settings = LlmSettings {
            timeout_ms: 1_000,
            ..LlmSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::OutOfRange { field: "timeout_ms", .. })
        ));
    }

    #[test]
    fn same_fallback_provider_is_rejected() {
        let settings = LlmSettings {
            fallback_enabled: true,
            fallback_provider: Some(Provider::Ollama),
            ..LlmSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::SameFallbackProvider(Provider::Ollama))
        );
    }

    #[test]
    fn masked_key_keeps_stored_key() {
        let mut settings = settings_with_key("sk-original");
        settings
            .apply(SettingsUpdate {
                api_key: Some(MASKED_API_KEY.to_owned()),
                temperature: Some(20),
                ..SettingsUpdate::default()
            })
            .unwrap();

        assert_eq!(settings.api_key().unwrap().expose_secret(), "sk-original");
        assert_eq!(settings.temperature, 20);
    }

    #[test]
    fn provider_switch_drops_previous_credentials() {
        let mut settings = settings_with_key("sk-openai");
        settings.api_url = Some("https://proxy.internal/v1".parse().unwrap());

        settings
            .apply(SettingsUpdate {
                provider: Some("anthropic".to_owned()),
                api_key: Some(MASKED_API_KEY.to_owned()),
                ..SettingsUpdate::default()
            })
            .unwrap();

        assert_eq!(settings.provider, Provider::Anthropic);
        assert!(settings.api_key().is_none());
        assert!(settings.api_url.is_none());

        settings
            .apply(SettingsUpdate {
                provider: Some("openai".to_owned()),
                api_url: Some("https://api.openai.com/v1".to_owned()),
                api_key: Some("sk-fresh".to_owned()),
                ..SettingsUpdate::default()
            })
            .unwrap();
        assert_eq!(settings.api_key().unwrap().expose_secret(), "sk-fresh");
        assert!(settings.api_url.is_some());
    }

    #[test]
    fn resending_same_provider_keeps_credentials() {
        let mut settings = settings_with_key("sk-openai");
        settings
            .apply(SettingsUpdate {
                provider: Some("openai".to_owned()),
                api_key: Some(MASKED_API_KEY.to_owned()),
                ..SettingsUpdate::default()
            })
            .unwrap();
        assert_eq!(settings.api_key().unwrap().expose_secret(), "sk-openai");
    }

    #[test]
    fn empty_key_clears_and_new_key_replaces() {
        let mut settings = settings_with_key("sk-original");
        settings
            .apply(SettingsUpdate {
                api_key: Some("sk-new".to_owned()),
                ..SettingsUpdate::default()
            })
            .unwrap();
        assert_eq!(settings.api_key().unwrap().expose_secret(), "sk-new");

        settings
            .apply(SettingsUpdate {
                api_key: Some(String::new()),
                ..SettingsUpdate::default()
            })
            .unwrap();
        assert!(settings.api_key().is_none());
    }

    #[test]
    fn stored_masked_key_is_never_usable() {
        let settings = settings_with_key(MASKED_API_KEY);
        assert!(settings.api_key().is_none());
    }

    #[test]
    fn invalid_update_leaves_settings_untouched() {
        let mut settings = LlmSettings::default();
        let err = settings
            .apply(SettingsUpdate {
                model: Some("llama3".to_owned()),
                temperature: Some(150),
                ..SettingsUpdate::default()
            })
            .unwrap_err();

        assert!(matches!(err, SettingsError::OutOfRange { field: "temperature", .. }));
        assert_eq!(settings.model, "default");
        assert_eq!(settings.temperature, 70);
    }

    #[test]
    fn update_parses_provider_names() {
        let mut settings = LlmSettings::default();
        let err = settings
            .apply(SettingsUpdate {
                provider: Some("mistral".to_owned()),
                ..SettingsUpdate::default()
            })
            .unwrap_err();
        assert_eq!(err, SettingsError::UnknownProvider("mistral".to_owned()));

        settings
            .apply(SettingsUpdate {
                provider: Some("Forge".to_owned()),
                fallback_enabled: Some(true),
                fallback_provider: Some("ollama".to_owned()),
                ..SettingsUpdate::default()
            })
            .unwrap();
        assert_eq!(settings.provider, Provider::Forge);
        assert_eq!(settings.fallback_provider, Some(Provider::Ollama));
    }

    #[test]
    fn update_deserializes_camel_case() {
        let update: SettingsUpdate = serde_json::from_value(serde_json::json!({
            "apiKey": "********",
            "maxTokens": 4000,
            "timeoutMs": 60000,
            "fallbackProvider": "forge"
        }))
        .unwrap();

        assert_eq!(update.api_key.as_deref(), Some(MASKED_API_KEY));
        assert_eq!(update.max_tokens, Some(4000));
        assert_eq!(update.timeout_ms, Some(60_000));
        assert_eq!(update.fallback_provider.as_deref(), Some("forge"));
    }

    #[test]
    fn masked_view_hides_keys() {
        let view = settings_with_key("sk-secret").masked();
        assert_eq!(view.api_key.as_deref(), Some(MASKED_API_KEY));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["apiKey"], MASKED_API_KEY);
        assert_eq!(json["provider"], "openai");
        assert!(!json.to_string().contains("sk-secret"));

        let view = LlmSettings::default().masked();
        assert!(view.api_key.is_none());
    }
}
