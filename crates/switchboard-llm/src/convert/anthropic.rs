//! Anthropic request building and response conversion

use std::time::Duration;

use switchboard_core::{ChatMessage, Role};

use super::DEFAULT_FINISH_REASON;
use crate::protocol::anthropic::{AnthropicMessage, AnthropicRequest, AnthropicResponse};
use crate::types::{GatewayConfig, UnifiedResponse, Usage};

/// Build a Messages API request
///
/// The first system message becomes the top-level `system` field. Any further
/// system messages are dropped, the API only accepts one system prompt.
pub(super) fn request(
    config: &GatewayConfig,
    model: String,
    messages: &[ChatMessage],
    stream: bool,
) -> AnthropicRequest {
    let mut system = None;
    let mut turns = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            Role::System if system.is_none() => system = Some(message.content.clone()),
            Role::System => {
                tracing::debug!("dropping additional system message for anthropic request");
            }
            Role::User | Role::Assistant => turns.push(AnthropicMessage {
                role: message.role.as_str().to_owned(),
                content: message.content.clone(),
            }),
        }
    }

    AnthropicRequest {
        model,
        max_tokens: config.max_tokens,
        system,
        messages: turns,
        temperature: config.temperature,
        stream,
    }
}

pub(super) fn into_unified(response: AnthropicResponse, now: Duration) -> UnifiedResponse {
    let content = response
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .unwrap_or_default();

    let usage = Usage::new(
        response.usage.input_tokens.unwrap_or(0),
        response.usage.output_tokens.unwrap_or(0),
    );

    UnifiedResponse::single(
        response.id,
        now.as_secs(),
        response.model,
        content,
        response
            .stop_reason
            .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_owned()),
        usage,
    )
}
