//! Incremental decoders for the three streaming wire formats
//!
//! [`frames`] splits a response body into frames: SSE event data for the
//! OpenAI and Anthropic dialects, lines for Ollama NDJSON. A dialect-specific
//! state machine then turns each frame into zero or more [`Decoded`] items.
//! Malformed frames are skipped, never fatal.

mod anthropic;
mod ndjson;
mod sse;

use std::fmt::Display;

use eventsource_stream::Eventsource;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt, future};

pub use self::ndjson::LineBuffer;
use crate::registry::Dialect;
use crate::types::Usage;

/// Item recognised in an upstream stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Non-empty text fragment
    Content(String),
    /// Upstream signalled normal completion
    Done(Option<Usage>),
    /// Upstream reported a failure in-band
    Failed(String),
}

impl Decoded {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Split a response body into the frames of `dialect`
///
/// SSE events are parsed per the event-stream format, so multi-line `data:`
/// fields are joined and CR, LF and CRLF line endings are all accepted.
/// Events without data are dropped. Errors carry a description of the
/// transport or framing failure.
pub fn frames<S, B, E>(dialect: Dialect, body: S) -> BoxStream<'static, Result<String, String>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    match dialect {
        Dialect::OllamaNative => ndjson::lines(body).map(|line| line.map_err(|e| e.to_string())).boxed(),
        Dialect::OpenAiCompatible | Dialect::AnthropicNative => body
            .eventsource()
            .filter_map(|event| {
                future::ready(match event {
                    Ok(event) if event.data.is_empty() => None,
                    Ok(event) => Some(Ok(event.data)),
                    Err(e) => Some(Err(e.to_string())),
                })
            })
            .boxed(),
    }
}

#[derive(Debug)]
enum DialectState {
    Ndjson,
    OpenAiSse(sse::OpenAiSseState),
    AnthropicSse(anthropic::AnthropicSseState),
}

/// Decoder for one upstream response, selected once per call
///
/// Nothing is produced after the first terminal item.
#[derive(Debug)]
pub struct StreamDecoder {
    state: DialectState,
    recognised: bool,
    finished: bool,
}

impl StreamDecoder {
    pub fn new(dialect: Dialect) -> Self {
        let state = match dialect {
            Dialect::OllamaNative => DialectState::Ndjson,
            Dialect::OpenAiCompatible => DialectState::OpenAiSse(sse::OpenAiSseState::default()),
            Dialect::AnthropicNative => DialectState::AnthropicSse(anthropic::AnthropicSseState::default()),
        };

        Self {
            state,
            recognised: false,
            finished: false,
        }
    }

    /// Whether a terminal item has been produced
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode one frame produced by [`frames`]
    pub fn feed(&mut self, frame: &str) -> Vec<Decoded> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }

        let recognised = match &mut self.state {
            DialectState::Ndjson => ndjson::decode_line(frame, &mut out),
            DialectState::OpenAiSse(state) => state.decode_data(frame, &mut out),
            DialectState::AnthropicSse(state) => state.decode_data(frame, &mut out),
        };
        self.recognised |= recognised;

        if let Some(terminal) = out.iter().position(Decoded::is_terminal) {
            out.truncate(terminal + 1);
            self.finished = true;
        }

        out
    }

    /// Close the stream after the last frame
    ///
    /// A stream that ends without a terminal frame completes normally if
    /// anything was recognised in it. Returns `None` when a terminal item was
    /// already produced.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the stream ended without a
    /// single recognisable frame
    pub fn finish(&mut self) -> Result<Option<Decoded>, String> {
        if self.finished {
            return Ok(None);
        }

        if !self.recognised {
            return Err("stream ended without a recognisable frame".to_owned());
        }

        tracing::debug!("upstream stream ended without a terminal frame");
        self.finished = true;

        Ok(Some(Decoded::Done(self.partial_usage())))
    }

    fn partial_usage(&self) -> Option<Usage> {
        match &self.state {
            DialectState::Ndjson => None,
            DialectState::OpenAiSse(state) => state.usage(),
            DialectState::AnthropicSse(state) => state.usage(),
        }
    }
}
