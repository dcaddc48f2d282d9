use serde::{Deserialize, Serialize};

/// Placeholder returned to clients in place of stored API keys
///
/// Settings updates carrying this value mean "keep the stored key"; it is
/// never a usable credential.
pub const MASKED_API_KEY: &str = "********";

/// Whether a key is the masked placeholder rather than a real credential
pub fn is_masked_key(key: &str) -> bool {
    key == MASKED_API_KEY
}

/// Supported LLM backends
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Provider {
    /// Managed OpenAI-compatible gateway deployed next to the dashboard
    Forge,
    /// Local Ollama model runner
    Ollama,
    /// Hosted `OpenAI` API
    Openai,
    /// Hosted Anthropic Messages API
    Anthropic,
    /// Self-hosted OpenAI-compatible inference cluster
    N2,
}

impl Provider {
    /// Every provider, in display order
    pub const ALL: [Self; 5] = [Self::Forge, Self::Ollama, Self::Openai, Self::Anthropic, Self::N2];

    /// Lowercase identifier used in configuration and on the wire
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
