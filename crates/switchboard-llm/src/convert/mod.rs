//! Conversion between the unified shapes and each dialect's wire format
//!
//! Requests go out through [`translate_request`], completed responses come
//! back through [`translate_response`]. Streaming frames are handled by
//! [`crate::decode`].

pub mod anthropic;
pub mod ollama;
pub mod openai;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use switchboard_core::{ChatMessage, Provider};

use crate::error::GatewayError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse};
use crate::protocol::ollama::{OllamaRequest, OllamaResponse};
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse};
use crate::registry::{self, Dialect};
use crate::types::{GatewayConfig, UnifiedResponse};

/// Finish reason used when the provider does not report one
pub(crate) const DEFAULT_FINISH_REASON: &str = "stop";

/// Provider-specific request body
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    OpenAi(OpenAiRequest),
    Ollama(OllamaRequest),
    Anthropic(AnthropicRequest),
}

/// Build the request body for the configured provider
///
/// # Errors
///
/// Returns [`GatewayError::Auth`] when the provider requires an API key and
/// none is configured
pub fn translate_request(
    config: &GatewayConfig,
    messages: &[ChatMessage],
    stream: bool,
) -> Result<RequestBody, GatewayError> {
    let descriptor = registry::resolve(config.provider);

    if descriptor.requires_api_key && config.api_key().is_none() {
        return Err(GatewayError::Auth {
            provider: config.provider,
        });
    }

    let model = descriptor.model_or_default(&config.model).to_owned();

    let body = match descriptor.dialect {
        Dialect::OpenAiCompatible => RequestBody::OpenAi(openai::request(config, model, messages, stream)),
        Dialect::OllamaNative => RequestBody::Ollama(ollama::request(config, model, messages, stream)),
        Dialect::AnthropicNative => RequestBody::Anthropic(anthropic::request(config, model, messages, stream)),
    };

    Ok(body)
}

/// Convert a completed response body into the unified shape
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] when the body is not valid JSON for the
/// provider's dialect, or [`GatewayError::Upstream`] when the body reports an
/// error
pub fn translate_response(provider: Provider, body: &[u8]) -> Result<UnifiedResponse, GatewayError> {
    let decode_error = |e: serde_json::Error| GatewayError::Decode {
        provider,
        message: e.to_string(),
    };

    match registry::resolve(provider).dialect {
        Dialect::OpenAiCompatible => {
            let response: OpenAiResponse = serde_json::from_slice(body).map_err(decode_error)?;
            Ok(openai::into_unified(response, now()))
        }
        Dialect::OllamaNative => {
            let response: OllamaResponse = serde_json::from_slice(body).map_err(decode_error)?;
            if let Some(message) = response.error {
                return Err(GatewayError::Upstream { provider, message });
            }
            Ok(ollama::into_unified(response, now()))
        }
        Dialect::AnthropicNative => {
            let response: AnthropicResponse = serde_json::from_slice(body).map_err(decode_error)?;
            Ok(anthropic::into_unified(response, now()))
        }
    }
}

fn now() -> std::time::Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}
