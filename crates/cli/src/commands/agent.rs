//! `parley agent` — Interactive or single-message chat in the terminal.

use std::io::Write;
use std::sync::Arc;

use parley_agent::Dispatcher;
use parley_channels::CliChannel;
use parley_core::channel::Channel;

use super::{build_turn_handler, load_config};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let channel = Arc::new(CliChannel::new(&config.agent.name));
    let handler = build_turn_handler(&config, channel.clone())?;

    if let Some(msg) = message {
        handler
            .handle_incoming(CliChannel::message_from_line(&msg))
            .await;
        return Ok(());
    }

    println!();
    println!("  parley — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.provider.name);
    println!("  Model:     {}", config.provider.model);
    println!("  Memory:    {}", config.memory.backend);
    println!("  Agent:     {}", config.agent.name);
    println!("  Budget:    {} tokens", config.context.max_tokens);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();
    std::io::stdout().flush()?;

    let inbound = channel
        .start()
        .await
        .map_err(|e| format!("Channel error: {e}"))?;
    let dispatcher = Dispatcher::new(handler);
    dispatcher.run(inbound).await;
    dispatcher.shutdown().await;

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}
