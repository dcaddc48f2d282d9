use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt, stream};

use super::Decoded;
use crate::convert::ollama;
use crate::protocol::ollama::OllamaResponse;

/// Reassembles `\n`-terminated lines from byte chunks
///
/// Bytes are buffered until a newline arrives, so multi-byte characters split
/// across chunks decode intact. A trailing `\r` is stripped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    /// Bytes after the last newline seen, never containing a newline
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let Some(offset) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.pending.extend_from_slice(chunk);
            return Vec::new();
        };

        let mut complete = std::mem::take(&mut self.pending);
        complete.extend_from_slice(&chunk[..offset]);
        self.pending.extend_from_slice(&chunk[offset + 1..]);

        complete.split(|&b| b == b'\n').map(line_from_bytes).collect()
    }

    /// Take whatever is left after the last newline
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(line_from_bytes(&rest))
    }
}

fn line_from_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

struct Lines<S> {
    body: Pin<Box<S>>,
    buffer: LineBuffer,
    ready: VecDeque<String>,
    ended: bool,
}

/// Split a byte stream into lines, flushing an unterminated last line
pub(super) fn lines<S, B, E>(body: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    let state = Lines {
        body: Box::pin(body),
        buffer: LineBuffer::default(),
        ready: VecDeque::new(),
        ended: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.ended {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.buffer.push(chunk.as_ref())),
                Some(Err(e)) => {
                    state.ended = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.ended = true;
                    state.ready.extend(state.buffer.take_remainder());
                }
            }
        }
    })
}

/// Decode one Ollama NDJSON line, returning whether it was a valid frame
pub(super) fn decode_line(line: &str, out: &mut Vec<Decoded>) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    let frame: OllamaResponse = match serde_json::from_str(line) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed ndjson line");
            return false;
        }
    };

    if let Some(message) = frame.error {
        out.push(Decoded::Failed(message));
        return true;
    }

    if let Some(text) = frame.message.as_ref().and_then(|m| m.content.as_deref())
        && !text.is_empty()
    {
        out.push(Decoded::Content(text.to_owned()));
    }

    if frame.done {
        out.push(Decoded::Done(Some(ollama::usage(&frame))));
    }

    true
}
