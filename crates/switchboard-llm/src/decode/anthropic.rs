use super::Decoded;
use crate::protocol::anthropic::AnthropicStreamEvent;
use crate::types::Usage;

/// Anthropic typed-envelope decoder state
///
/// Output token counts are cumulative, so the latest value wins.
#[derive(Debug, Default)]
pub(super) struct AnthropicSseState {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

impl AnthropicSseState {
    /// Decode the data of one SSE event, returning whether it was recognised
    pub(super) fn decode_data(&mut self, data: &str, out: &mut Vec<Decoded>) -> bool {
        let data = data.trim();
        if data.is_empty() {
            return false;
        }

        let event: AnthropicStreamEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable Anthropic SSE event");
                return false;
            }
        };

        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.record(message.usage.input_tokens, message.usage.output_tokens);
            }
            AnthropicStreamEvent::ContentBlockDelta { delta } => {
                if let Some(text) = delta.text
                    && !text.is_empty()
                {
                    out.push(Decoded::Content(text));
                }
            }
            AnthropicStreamEvent::MessageDelta { usage } => {
                self.record(usage.input_tokens, usage.output_tokens);
            }
            AnthropicStreamEvent::MessageStop => {
                out.push(Decoded::Done(Some(Usage::new(
                    self.input_tokens.unwrap_or(0),
                    self.output_tokens.unwrap_or(0),
                ))));
            }
            AnthropicStreamEvent::Error { error } => {
                out.push(Decoded::Failed(format!("{}: {}", error.error_type, error.message)));
            }
            AnthropicStreamEvent::Other => {}
        }

        true
    }

    fn record(&mut self, input: Option<u32>, output: Option<u32>) {
        if input.is_some() {
            self.input_tokens = input;
        }
        if output.is_some() {
            self.output_tokens = output;
        }
    }

    pub(super) fn usage(&self) -> Option<Usage> {
        if self.input_tokens.is_none() && self.output_tokens.is_none() {
            return None;
        }
        Some(Usage::new(
            self.input_tokens.unwrap_or(0),
            self.output_tokens.unwrap_or(0),
        ))
    }
}
