//! `parley serve` — Run the agent against the configured chat channel.

use parley_agent::Dispatcher;
use parley_core::channel::Channel;
use tracing::{info, warn};

use super::{build_turn_handler, load_config};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let channel = parley_channels::build_from_config(&config)?;
    let handler = build_turn_handler(&config, channel.clone())?;

    let inbound = channel.start().await?;
    info!(
        channel = channel.name(),
        agent = %config.agent.name,
        "parley is listening"
    );

    let dispatcher = Dispatcher::new(handler);
    tokio::select! {
        _ = dispatcher.run(inbound) => {
            info!("Channel closed, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
        }
    }

    dispatcher.shutdown().await;
    if let Err(e) = channel.stop().await {
        warn!(error = %e, "Channel did not stop cleanly");
    }

    Ok(())
}
