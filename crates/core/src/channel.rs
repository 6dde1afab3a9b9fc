//! Channel trait — the abstraction over chat platforms.
//!
//! A Channel connects parley to a messaging platform (Discord, CLI, ...).
//! It yields inbound messages and delivers answers and typing indicators.
//! Splitting long text for platform limits is the adapter's business.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;
use crate::message::ConversationId;

/// A message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The conversation (channel/thread/DM) this message belongs to
    pub conversation_id: ConversationId,

    /// Platform-specific message identifier, used for replies
    pub message_id: String,

    /// Sender identifier (platform-specific user ID)
    pub sender_id: String,

    /// Human-readable sender name
    pub sender_name: String,

    /// The text content
    pub content: String,

    /// IDs of users mentioned in this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,

    /// URLs of attached images
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    pub created_at: DateTime<Utc>,
}

impl ChannelMessage {
    /// Whether this message asks the agent with `agent_id` to respond.
    pub fn addresses(&self, agent_id: &str) -> bool {
        self.mentions.iter().any(|m| m == agent_id)
    }
}

/// The core Channel trait.
///
/// Implementations handle platform-specific connection logic, formatting
/// and rate limiting.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "discord", "cli").
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Send a message to a conversation.
    async fn send(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> std::result::Result<(), ChannelError>;

    /// Reply to a specific inbound message.
    async fn reply(
        &self,
        original: &ChannelMessage,
        content: &str,
    ) -> std::result::Result<(), ChannelError>;

    /// Send a typing indicator (if the platform supports it).
    async fn send_typing(&self, _conversation_id: &ConversationId) -> std::result::Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// The agent's own user ID on this platform.
    fn agent_id(&self) -> &str;

    /// The agent's display name on this platform.
    fn agent_name(&self) -> &str;

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(mentions: Vec<String>) -> ChannelMessage {
        ChannelMessage {
            conversation_id: ConversationId::from("general"),
            message_id: "m1".into(),
            sender_id: "12345".into(),
            sender_name: "Alice".into(),
            content: "Hello bot!".into(),
            mentions,
            images: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn mention_addresses_agent() {
        let msg = message(vec!["999".into(), "bot".into()]);
        assert!(msg.addresses("bot"));
        assert!(!msg.addresses("someone-else"));
    }

    #[test]
    fn no_mentions_addresses_nobody() {
        assert!(!message(vec![]).addresses("bot"));
    }
}
