use serde::ser::{Serialize, SerializeMap, Serializer};
use switchboard_core::Provider;

use super::Usage;

/// Event delivered to the caller of a streaming call
///
/// A successful sequence is one `Info`, any number of `Content`, then `Done`.
/// A failed one ends with a single `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Provider and model that serve the response
    Info { provider: Provider, model: Option<String> },
    /// Non-empty text fragment
    Content(String),
    /// Normal end of the response
    Done { usage: Option<Usage> },
    /// Terminal failure
    Error(String),
}

impl StreamEvent {
    /// Whether this event ends the sequence
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error(_))
    }
}

impl Serialize for StreamEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Info { provider, model } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("info", provider)?;
                if let Some(model) = model {
                    map.serialize_entry("model", model)?;
                }
                map.end()
            }
            Self::Content(text) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("content", text)?;
                map.end()
            }
            Self::Done { usage } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("done", &true)?;
                if let Some(usage) = usage {
                    map.serialize_entry("usage", usage)?;
                }
                map.end()
            }
            Self::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}
