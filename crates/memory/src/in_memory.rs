//! In-memory backend — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::error::MemoryError;
use parley_core::memory::{MemoryBackend, MemoryWriteOutcome};
use parley_core::message::ConversationId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{note_line, roll_notes};

/// Notes kept in a map keyed by conversation.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryBackend {
    notes: Arc<RwLock<HashMap<ConversationId, String>>>,
    max_notes: usize,
}

impl InMemoryBackend {
    pub fn new(max_notes: usize) -> Self {
        Self {
            notes: Arc::new(RwLock::new(HashMap::new())),
            max_notes,
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    fn name(&self) -> &str { "in_memory" }

    async fn read(&self, conversation_id: &ConversationId) -> Result<String, MemoryError> {
        Ok(self
            .notes
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn write(
        &self,
        conversation_id: &ConversationId,
        note: &str,
    ) -> Result<MemoryWriteOutcome, MemoryError> {
        let mut notes = self.notes.write().await;
        let existing = notes.remove(conversation_id).unwrap_or_default();
        let updated = roll_notes(&existing, note_line(note, Utc::now()), self.max_notes);
        notes.insert(conversation_id.clone(), updated);
        Ok(MemoryWriteOutcome::saved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let mem = InMemoryBackend::default();
        assert_eq!(mem.read(&ConversationId::from("nowhere")).await.unwrap(), "");
    }

    #[tokio::test]
    async fn write_then_read() {
        let mem = InMemoryBackend::default();
        let conv = ConversationId::from("general");
        let outcome = mem.write(&conv, "<@42> lives in Jakarta").await.unwrap();
        assert!(outcome.success);

        let blob = mem.read(&conv).await.unwrap();
        assert!(blob.starts_with('['));
        assert!(blob.trim_end().ends_with("<@42> lives in Jakarta"));
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let mem = InMemoryBackend::default();
        mem.write(&ConversationId::from("a"), "note for a").await.unwrap();
        assert_eq!(mem.read(&ConversationId::from("b")).await.unwrap(), "");
    }

    #[tokio::test]
    async fn oldest_notes_roll_off() {
        let mem = InMemoryBackend::new(2);
        let conv = ConversationId::from("general");
        for note in ["one", "two", "three"] {
            mem.write(&conv, note).await.unwrap();
        }
        let blob = mem.read(&conv).await.unwrap();
        assert_eq!(blob.lines().count(), 2);
        assert!(!blob.contains("] one"));
        assert!(blob.contains("] three"));
    }
}
