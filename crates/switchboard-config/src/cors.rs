use std::time::Duration;

use serde::Deserialize;

/// CORS configuration for the dashboard frontend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins, `"*"` for any
    #[serde(default)]
    pub origins: AllowList,
    /// Allowed request headers, `"*"` for any
    #[serde(default)]
    pub headers: AllowList,
    /// Allow credentials
    #[serde(default)]
    pub credentials: bool,
    /// Max age for preflight cache in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

/// A single value or a list of values, where `"*"` means any
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AllowList {
    /// Single value, usually the wildcard
    One(String),
    /// Explicit list
    Many(Vec<String>),
}

impl Default for AllowList {
    fn default() -> Self {
        Self::One("*".to_owned())
    }
}

impl AllowList {
    /// Whether the list matches any value
    pub fn is_any(&self) -> bool {
        match self {
            Self::One(value) => value == "*",
            Self::Many(values) => values.iter().any(|v| v == "*"),
        }
    }

    /// Explicit values, empty when the list is a wildcard
    pub fn values(&self) -> Vec<&str> {
        if self.is_any() {
            return Vec::new();
        }
        match self {
            Self::One(value) => vec![value.as_str()],
            Self::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl CorsConfig {
    /// Get max age as Duration
    pub fn max_age_duration(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}
