//! Ollama request building and response conversion

use std::time::Duration;

use switchboard_core::ChatMessage;

use super::DEFAULT_FINISH_REASON;
use crate::protocol::ollama::{OllamaMessage, OllamaOptions, OllamaRequest, OllamaResponse};
use crate::types::{GatewayConfig, UnifiedResponse, Usage};

pub(super) fn request(config: &GatewayConfig, model: String, messages: &[ChatMessage], stream: bool) -> OllamaRequest {
    OllamaRequest {
        model,
        messages: messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_owned(),
                content: m.content.clone(),
            })
            .collect(),
        options: OllamaOptions {
            temperature: config.temperature,
            num_predict: config.max_tokens,
        },
        stream,
    }
}

/// Usage from Ollama's evaluation counters
pub(crate) fn usage(response: &OllamaResponse) -> Usage {
    Usage::new(
        response.prompt_eval_count.unwrap_or(0),
        response.eval_count.unwrap_or(0),
    )
}

/// Ollama responses carry no id, one is derived from the receive time
pub(super) fn into_unified(response: OllamaResponse, now: Duration) -> UnifiedResponse {
    let usage = usage(&response);
    let content = response.message.and_then(|m| m.content).unwrap_or_default();

    UnifiedResponse::single(
        format!("ollama-{}", now.as_millis()),
        now.as_secs(),
        response.model,
        content,
        DEFAULT_FINISH_REASON.to_owned(),
        usage,
    )
}
