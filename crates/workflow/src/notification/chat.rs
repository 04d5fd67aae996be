//! Chat channel trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, WorkflowError};

/// Delivers a text message to one chat.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Sends `text` (HTML parse mode) to `chat_id`.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// A message captured by [`InMemoryChatChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
}

#[derive(Debug, Default)]
struct InMemoryChatState {
    sent: Vec<SentMessage>,
    rejected: HashSet<i64>,
}

/// In-memory chat channel for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatChannel {
    state: Arc<RwLock<InMemoryChatState>>,
}

impl InMemoryChatChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every message to `chat_id` fail.
    pub async fn reject(&self, chat_id: i64) {
        self.state.write().await.rejected.insert(chat_id);
    }

    /// Returns the delivered messages in send order.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.state.read().await.sent.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.state.read().await.sent.len()
    }
}

#[async_trait]
impl ChatChannel for InMemoryChatChannel {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.rejected.contains(&chat_id) {
            return Err(WorkflowError::ChatRejected {
                chat_id,
                reason: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        state.sent.push(SentMessage {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }
}
