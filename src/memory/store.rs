//! In-memory transcript storage

use super::TranscriptStore;
use crate::error::DraftingError;
use crate::models::Message;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory transcript store for development and tests
pub struct InMemoryTranscriptStore {
    transcripts: Arc<RwLock<HashMap<Uuid, Vec<Message>>>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self {
            transcripts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of sessions with at least one stored message
    pub async fn session_count(&self) -> usize {
        self.transcripts.read().await.len()
    }
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append_transcript_message(&self, session_id: Uuid, message: &Message) -> Result<()> {
        let mut transcripts = self.transcripts.write().await;
        transcripts
            .entry(session_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn load_transcript(&self, session_id: Uuid) -> Result<Vec<Message>> {
        let transcripts = self.transcripts.read().await;
        Ok(transcripts.get(&session_id).cloned().unwrap_or_default())
    }
}

/// Transcript store that rejects every write
pub struct FailingTranscriptStore;

#[async_trait::async_trait]
impl TranscriptStore for FailingTranscriptStore {
    async fn append_transcript_message(&self, _session_id: Uuid, _message: &Message) -> Result<()> {
        Err(DraftingError::TranscriptError("transcript store unavailable".to_string()))
    }

    async fn load_transcript(&self, _session_id: Uuid) -> Result<Vec<Message>> {
        Err(DraftingError::TranscriptError("transcript store unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_kept_per_session_in_order() {
        let store = InMemoryTranscriptStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.append_transcript_message(a, &Message::user("hi")).await.unwrap();
        store.append_transcript_message(b, &Message::user("other")).await.unwrap();
        store.append_transcript_message(a, &Message::plain("hello")).await.unwrap();

        let texts: Vec<String> = store
            .load_transcript(a)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["hi", "hello"]);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = InMemoryTranscriptStore::new();
        assert!(store.load_transcript(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_store_errors() {
        tokio_test::assert_err!(
            FailingTranscriptStore
                .append_transcript_message(Uuid::new_v4(), &Message::plain("x"))
                .await
        );
    }
}
