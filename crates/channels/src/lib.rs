//! Chat channel implementations for parley.
//!
//! Each channel connects to a chat platform and relays messages to/from
//! the agent. Channels are trait-based and platform-agnostic.
//!
//! Available channels:
//! - **CLI** — Interactive terminal chat (stdin/stdout)
//! - **Discord** — Discord Bot API (stub with in-process injection)

pub mod cli;
pub mod discord;

use std::sync::Arc;
use parley_config::AppConfig;
use parley_core::channel::Channel;
use parley_core::error::ChannelError;

pub use cli::CliChannel;
pub use discord::{DiscordChannel, DiscordConfig, OutboundMessage};

/// Build the channel named in the configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Channel>, ChannelError> {
    match config.channel.kind.as_str() {
        "cli" => Ok(Arc::new(CliChannel::new(&config.agent.name))),
        "discord" => {
            let bot_token = config
                .channel
                .discord_token
                .clone()
                .ok_or_else(|| ChannelError::NotConfigured("channel.discord_token is not set".into()))?;
            Ok(Arc::new(DiscordChannel::new(DiscordConfig {
                bot_token,
                agent_id: "0".into(),
                agent_name: config.agent.name.clone(),
                allowed_conversations: config.channel.allowed_conversations.clone(),
            })))
        }
        other => Err(ChannelError::NotConfigured(format!("unknown channel kind '{other}'"))),
    }
}
