//! Conversation history collaborator
//!
//! The gateway never persists anything itself; the chat routes read history
//! from and write completed turns to a [`ConversationStore`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use switchboard_core::ChatMessage;

/// Storage for conversation turns
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Messages of a conversation in order, empty for unknown ids
    async fn history(&self, conversation_id: u64) -> anyhow::Result<Vec<ChatMessage>>;

    /// Append turns to a conversation, creating it if needed
    async fn append(&self, conversation_id: u64, messages: Vec<ChatMessage>) -> anyhow::Result<()>;

    /// Allocate an id for a new conversation
    async fn next_conversation_id(&self) -> anyhow::Result<u64>;
}

/// Process-local store, lost on restart
#[derive(Debug, Default)]
pub struct InMemoryStore {
    conversations: DashMap<u64, Vec<ChatMessage>>,
    last_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn history(&self, conversation_id: u64) -> anyhow::Result<Vec<ChatMessage>> {
        Ok(self
            .conversations
            .get(&conversation_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn append(&self, conversation_id: u64, messages: Vec<ChatMessage>) -> anyhow::Result<()> {
        self.conversations.entry(conversation_id).or_default().extend(messages);
        self.last_id.fetch_max(conversation_id, Ordering::Relaxed);
        Ok(())
    }

    async fn next_conversation_id(&self) -> anyhow::Result<u64> {
        let previous = self
            .last_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .map_err(|_| anyhow::anyhow!("conversation ids exhausted"))?;
        Ok(previous + 1)
    }
}
