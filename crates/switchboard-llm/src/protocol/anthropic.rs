//! Anthropic Messages API wire types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Messages API request
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    /// Required by Anthropic
    pub max_tokens: u32,
    /// System prompt (top-level, not in messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    pub temperature: f64,
    pub stream: bool,
}

/// Conversation turn, role is `user` or `assistant`
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

// -- Response types --

/// Messages API response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: AnthropicUsage,
}

/// Content block, only text blocks carry `text`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Token counts, each optional depending on the event
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: Option<u32>,
    #[serde(default)]
    pub output_tokens: Option<u32>,
}

// -- Streaming types --

/// Typed SSE envelope, dispatched on `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    /// First event, carries the prompt token count
    MessageStart {
        #[serde(default)]
        message: AnthropicStreamMessage,
    },
    /// Incremental content
    ContentBlockDelta {
        #[serde(default)]
        delta: AnthropicDelta,
    },
    /// Carries the cumulative output token count
    MessageDelta {
        #[serde(default)]
        usage: AnthropicUsage,
    },
    /// Normal end of the message
    MessageStop,
    /// Upstream failure reported in-band
    Error {
        #[serde(default)]
        error: AnthropicErrorBody,
    },
    /// `ping`, `content_block_start`, `content_block_stop` and future types
    #[serde(other)]
    Other,
}

/// Message envelope of `message_start`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicStreamMessage {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: AnthropicUsage,
}

/// Delta of `content_block_delta`, only `text_delta` carries text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicDelta {
    #[serde(rename = "type", default)]
    pub delta_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Error body of an `error` event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
}
