//! CLI channel — interactive terminal-based chat.
//!
//! This is the simplest channel: reads from stdin, writes to stdout.
//! Every line is a message in the `cli` conversation addressed to the agent.
//! Used for `parley agent` interactive mode.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::channel::{Channel, ChannelMessage};
use parley_core::error::ChannelError;
use parley_core::message::ConversationId;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

/// The agent's user id inside a CLI session.
pub const CLI_AGENT_ID: &str = "parley";

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    agent_name: String,
}

impl CliChannel {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
        }
    }

    /// The conversation every CLI line belongs to.
    pub fn conversation_id() -> ConversationId {
        ConversationId::from("cli")
    }

    /// Wrap a line of user input as an inbound message.
    pub fn message_from_line(line: &str) -> ChannelMessage {
        ChannelMessage {
            conversation_id: Self::conversation_id(),
            message_id: Uuid::new_v4().to_string(),
            sender_id: "local_user".into(),
            sender_name: "User".into(),
            content: line.to_string(),
            mentions: vec![CLI_AGENT_ID.into()],
            images: vec![],
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        if tx.send(Ok(Self::message_from_line(line))).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(
        &self,
        _conversation_id: &ConversationId,
        content: &str,
    ) -> Result<(), ChannelError> {
        println!("{content}");
        Ok(())
    }

    async fn reply(&self, _original: &ChannelMessage, content: &str) -> Result<(), ChannelError> {
        println!("{}: {content}", self.agent_name);
        Ok(())
    }

    fn agent_id(&self) -> &str {
        CLI_AGENT_ID
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }
}
