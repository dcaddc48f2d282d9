use super::Decoded;
use crate::protocol::openai::OpenAiStreamChunk;
use crate::types::Usage;

/// Payload that ends an OpenAI-style stream
const DONE_SENTINEL: &str = "[DONE]";

/// OpenAI-style SSE decoder state
#[derive(Debug, Default)]
pub(super) struct OpenAiSseState {
    usage: Option<Usage>,
}

impl OpenAiSseState {
    /// Decode the data of one SSE event, returning whether it was recognised
    pub(super) fn decode_data(&mut self, data: &str, out: &mut Vec<Decoded>) -> bool {
        let data = data.trim();
        if data.is_empty() {
            return false;
        }

        if data == DONE_SENTINEL {
            out.push(Decoded::Done(self.usage.take()));
            return true;
        }

        let chunk: OpenAiStreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable SSE chunk");
                return false;
            }
        };

        if let Some(error) = chunk.error {
            let message = if error.message.is_empty() {
                "upstream stream error".to_owned()
            } else {
                error.message
            };
            out.push(Decoded::Failed(message));
            return true;
        }

        if let Some(usage) = chunk.usage {
            self.usage = Some(usage.into());
        }

        if let Some(text) = chunk.choices.into_iter().next().and_then(|c| c.delta.content)
            && !text.is_empty()
        {
            out.push(Decoded::Content(text));
        }

        true
    }

    pub(super) const fn usage(&self) -> Option<Usage> {
        self.usage
    }
}
