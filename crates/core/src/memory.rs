//! Memory trait — long-term notes the agent keeps per conversation.
//!
//! The agent writes notes through a tool and every turn reads the whole
//! blob back into its system context. The content is opaque to the core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;
use crate::message::ConversationId;

/// The result of a memory write, returned to the model verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryWriteOutcome {
    pub success: bool,
    pub message: String,
}

impl MemoryWriteOutcome {
    pub fn saved() -> Self {
        Self {
            success: true,
            message: "Memory saved successfully".into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            message: reason.into(),
        }
    }
}

/// The core MemoryBackend trait.
///
/// Implementations: notes file, in-memory (for testing), none (no-op).
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// The backend name (e.g., "file", "none").
    fn name(&self) -> &str;

    /// Read every note kept for a conversation. Empty if there are none.
    async fn read(&self, conversation_id: &ConversationId) -> std::result::Result<String, MemoryError>;

    /// Append a note for a conversation.
    async fn write(
        &self,
        conversation_id: &ConversationId,
        note: &str,
    ) -> std::result::Result<MemoryWriteOutcome, MemoryError>;
}
