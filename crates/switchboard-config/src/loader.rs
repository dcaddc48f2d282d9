use std::path::Path;

use anyhow::Context;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Environment placeholders are expanded before parsing, and the parsed
    /// result is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw).context("config variable expansion failed")?;
        let config: Self = toml::from_str(&expanded).context("failed to parse config")?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway settings are out of range or the
    /// health endpoint path is malformed
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.validate().context("invalid [llm] settings")?;

        if self.server.health.enabled && !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        let wildcard_credentials = self
            .server
            .cors
            .as_ref()
            .is_some_and(|cors| cors.credentials && (cors.origins.is_any() || cors.headers.is_any()));
        if wildcard_credentials {
            anyhow::bail!("server.cors.credentials cannot be combined with wildcard origins or headers");
        }

        for (provider, overrides) in &self.llm.providers {
            if overrides.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
                anyhow::bail!("llm.providers.{provider}.model must not be empty when set");
            }
        }

        Ok(())
    }
}
