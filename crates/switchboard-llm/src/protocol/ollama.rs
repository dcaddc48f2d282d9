//! Ollama native `/api/chat` wire types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Chat request
#[derive(Debug, Clone, Serialize)]
pub struct OllamaRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub options: OllamaOptions,
    pub stream: bool,
}

/// Sampling options, Ollama has no top-level `max_tokens`
#[derive(Debug, Clone, Serialize)]
pub struct OllamaOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

/// Chat message
#[derive(Debug, Clone, Serialize)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

// -- Response types --

/// Complete response, and also the shape of every NDJSON stream line
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: Option<OllamaResponseMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    /// Set instead of `message` when the model fails mid-stream
    #[serde(default)]
    pub error: Option<String>,
}

/// Message of a response line, any field may be absent or null
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}
