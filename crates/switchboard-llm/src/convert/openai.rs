//! OpenAI-compatible request building and response conversion

use std::time::Duration;

use switchboard_core::{ChatMessage, Provider};

use super::DEFAULT_FINISH_REASON;
use crate::protocol::openai::{OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamOptions, OpenAiUsage};
use crate::types::{Choice, ChoiceMessage, GatewayConfig, UnifiedResponse, Usage};

pub(super) fn request(config: &GatewayConfig, model: String, messages: &[ChatMessage], stream: bool) -> OpenAiRequest {
    // Compatible servers (forge, vLLM) may reject the unknown parameter
    let stream_options =
        (stream && config.provider == Provider::Openai).then_some(OpenAiStreamOptions { include_usage: true });

    OpenAiRequest {
        model,
        messages: messages.iter().map(Into::into).collect(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        stream,
        stream_options,
    }
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_owned(),
            content: Some(message.content.clone()),
        }
    }
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        let prompt = usage.prompt_tokens.unwrap_or(0);
        let completion = usage.completion_tokens.unwrap_or(0);

        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: usage
                .total_tokens
                .unwrap_or_else(|| prompt.saturating_add(completion)),
        }
    }
}

pub(super) fn into_unified(response: OpenAiResponse, now: Duration) -> UnifiedResponse {
    let mut choices: Vec<Choice> = response
        .choices
        .into_iter()
        .map(|choice| Choice {
            index: choice.index,
            message: ChoiceMessage {
                role: if choice.message.role.is_empty() {
                    "assistant".to_owned()
                } else {
                    choice.message.role
                },
                content: choice.message.content.unwrap_or_default(),
            },
            finish_reason: choice
                .finish_reason
                .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_owned()),
        })
        .collect();

    if choices.is_empty() {
        choices.push(Choice {
            index: 0,
            message: ChoiceMessage::assistant(String::new()),
            finish_reason: DEFAULT_FINISH_REASON.to_owned(),
        });
    }

    UnifiedResponse {
        id: response.id,
        created: if response.created == 0 {
            now.as_secs()
        } else {
            response.created
        },
        model: response.model,
        choices,
        usage: response.usage.map(Usage::from).unwrap_or_default(),
    }
}
