//! No-op memory backend — disables long-term notes entirely.

use async_trait::async_trait;
use parley_core::error::MemoryError;
use parley_core::memory::{MemoryBackend, MemoryWriteOutcome};
use parley_core::message::ConversationId;

/// A no-op memory backend that stores nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryBackend for NoopMemory {
    fn name(&self) -> &str { "none" }

    async fn read(&self, _conversation_id: &ConversationId) -> Result<String, MemoryError> {
        Ok(String::new())
    }

    async fn write(
        &self,
        _conversation_id: &ConversationId,
        _note: &str,
    ) -> Result<MemoryWriteOutcome, MemoryError> {
        Ok(MemoryWriteOutcome::failed("Memory is disabled"))
    }
}
