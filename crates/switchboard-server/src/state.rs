use std::sync::Arc;

use dashmap::DashMap;
use switchboard_config::LlmSettings;
use switchboard_llm::Gateway;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::store::ConversationStore;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub(crate) gateway: Gateway,
    pub(crate) settings: Arc<RwLock<LlmSettings>>,
    pub(crate) store: Arc<dyn ConversationStore>,
    pub(crate) inflight: Arc<InFlight>,
}

impl AppState {
    pub fn new(settings: LlmSettings, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            gateway: Gateway::new(),
            settings: Arc::new(RwLock::new(settings)),
            store,
            inflight: Arc::new(InFlight::default()),
        }
    }
}

/// In-flight streams, at most one per conversation
#[derive(Debug, Default)]
pub struct InFlight {
    streams: DashMap<u64, (Uuid, CancellationToken)>,
}

impl InFlight {
    /// Register a stream, cancelling the one it replaces
    pub fn register(&self, conversation_id: u64, token: CancellationToken) -> Uuid {
        let stream_id = Uuid::new_v4();

        if let Some((_, previous)) = self.streams.insert(conversation_id, (stream_id, token)) {
            tracing::debug!(conversation_id, "cancelling previous stream of conversation");
            previous.cancel();
        }

        stream_id
    }

    /// Cancel the stream of a conversation, returning whether one was running
    pub fn cancel(&self, conversation_id: u64) -> bool {
        match self.streams.remove(&conversation_id) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget a finished stream unless it was already replaced
    pub fn release(&self, conversation_id: u64, stream_id: Uuid) {
        self.streams.remove_if(&conversation_id, |_, (id, _)| *id == stream_id);
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
