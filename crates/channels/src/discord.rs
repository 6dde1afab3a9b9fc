//! Discord channel adapter (stub).
//!
//! Implements the Channel trait for the Discord Bot API.
//! Currently a stub with in-process message injection: outbound messages are
//! recorded instead of posted so the full turn pipeline can be driven in tests.

use async_trait::async_trait;
use parley_core::channel::{Channel, ChannelMessage};
use parley_core::error::ChannelError;
use parley_core::message::ConversationId;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

/// Discord caps messages at 2000 characters; stay well below.
const MAX_MESSAGE_CHARS: usize = 1000;

/// How far back from the cap a line or word break may sit.
const SPLIT_SLACK: usize = 100;

/// Discord channel configuration.
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token from Discord Developer Portal.
    pub bot_token: String,
    /// The bot's own user ID (mention target).
    pub agent_id: String,
    pub agent_name: String,
    /// Channel IDs to listen in. Empty = all channels.
    pub allowed_conversations: Vec<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .field("agent_name", &self.agent_name)
            .field("allowed_conversations", &self.allowed_conversations)
            .finish()
    }
}

/// A message the adapter would have posted.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub conversation_id: ConversationId,
    /// The inbound message this answers, if it was a reply
    pub reply_to: Option<String>,
    pub content: String,
}

/// Discord channel adapter.
pub struct DiscordChannel {
    config: DiscordConfig,
    inject_tx: Mutex<Option<mpsc::Sender<Result<ChannelMessage, ChannelError>>>>,
    outbound: Mutex<Vec<OutboundMessage>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            inject_tx: Mutex::new(None),
            outbound: Mutex::new(Vec::new()),
        }
    }

    fn listens_in(&self, conversation_id: &ConversationId) -> bool {
        self.config.allowed_conversations.is_empty()
            || self
                .config
                .allowed_conversations
                .iter()
                .any(|c| c == conversation_id.as_str())
    }

    /// Inject a message as if it came from Discord (for testing).
    ///
    /// Messages from conversations outside the allow list are dropped.
    pub async fn inject_message(&self, msg: ChannelMessage) -> Result<(), ChannelError> {
        if !self.listens_in(&msg.conversation_id) {
            debug!(conversation_id = %msg.conversation_id, "Ignoring message outside allowed conversations");
            return Ok(());
        }
        let guard = self.inject_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(Ok(msg))
                .await
                .map_err(|_| ChannelError::ConnectionLost("Message channel closed".into()))
        } else {
            Err(ChannelError::ConnectionLost("Channel not started".into()))
        }
    }

    /// Everything posted so far, in order.
    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.outbound.lock().await.clone()
    }

    async fn post(&self, conversation_id: &ConversationId, reply_to: Option<&str>, content: &str) {
        let chunks = split_message(&suppress_link_previews(content));
        let mut outbound = self.outbound.lock().await;
        for (i, chunk) in chunks.into_iter().enumerate() {
            info!(
                conversation_id = %conversation_id,
                reply_to = ?reply_to,
                content_len = chunk.len(),
                "Discord send (stub)"
            );
            outbound.push(OutboundMessage {
                conversation_id: conversation_id.clone(),
                // Only the first chunk is threaded as a reply
                reply_to: if i == 0 { reply_to.map(str::to_string) } else { None },
                content: chunk,
            });
        }
    }
}

/// Split text into chunks no longer than the message cap, preferring line
/// breaks, then spaces, then a hard cut.
fn split_message(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = content.trim();

    while remaining.chars().count() > MAX_MESSAGE_CHARS {
        let cap = remaining
            .char_indices()
            .nth(MAX_MESSAGE_CHARS)
            .map_or(remaining.len(), |(i, _)| i);
        let window = &remaining[..cap];
        let near = |i: &usize| cap - *i <= SPLIT_SLACK;

        let split = window
            .rfind('\n')
            .filter(near)
            .or_else(|| window.rfind(' ').filter(near))
            .unwrap_or(cap);

        chunks.push(remaining[..split].to_string());
        remaining = remaining[split..].trim();
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

/// Wrap bare URLs in `<...>` so Discord does not unfurl them.
fn suppress_link_previews(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("http") {
        let candidate = &rest[start..];
        if !(candidate.starts_with("http://") || candidate.starts_with("https://")) {
            out.push_str(&rest[..start + 4]);
            rest = &rest[start + 4..];
            continue;
        }
        let end = candidate
            .find(|c: char| c.is_whitespace() || c == '>' || c == ')')
            .unwrap_or(candidate.len());
        let prev = rest[..start].chars().last();
        out.push_str(&rest[..start]);
        if prev == Some('<') {
            out.push_str(&candidate[..end]);
        } else {
            out.push('<');
            out.push_str(&candidate[..end]);
            out.push('>');
        }
        rest = &candidate[end..];
    }
    out.push_str(rest);
    out
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        info!("Discord channel starting (stub mode)");
        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> Result<(), ChannelError> {
        self.post(conversation_id, None, content).await;
        Ok(())
    }

    async fn reply(&self, original: &ChannelMessage, content: &str) -> Result<(), ChannelError> {
        self.post(&original.conversation_id, Some(&original.message_id), content)
            .await;
        Ok(())
    }

    async fn send_typing(&self, conversation_id: &ConversationId) -> Result<(), ChannelError> {
        debug!(conversation_id = %conversation_id, "Discord typing (stub)");
        Ok(())
    }

    fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    fn agent_name(&self) -> &str {
        &self.config.agent_name
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Discord channel stopping");
        *self.inject_tx.lock().await = None;
        Ok(())
    }
}
