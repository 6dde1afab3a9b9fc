//! Subcommand implementations and the wiring they share.

pub mod agent;
pub mod onboard;
pub mod serve;
pub mod status;

use std::sync::Arc;

use parley_agent::{AgentLoop, ContextBudget, ContextStore, TurnHandler};
use parley_config::AppConfig;
use parley_core::channel::Channel;
use parley_core::event::EventBus;
use parley_core::memory::MemoryBackend;
use parley_core::provider::Provider;

/// Load the configuration, mapping failures to a printable error.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Assemble provider, memory, tools, context store and agent loop into a
/// turn handler that delivers through `channel`.
pub fn build_turn_handler(
    config: &AppConfig,
    channel: Arc<dyn Channel>,
) -> Result<Arc<TurnHandler>, Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    PARLEY_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = parley_providers::build_from_config(config)?;
    let memory = parley_memory::build_from_config(&config.memory);
    let tools = Arc::new(parley_tools::default_registry(memory.clone(), &config.tools));
    let event_bus = Arc::new(EventBus::default());
    let store = Arc::new(
        ContextStore::new(ContextBudget::from_config(&config.context))
            .with_event_bus(event_bus.clone()),
    );

    tracing::info!(
        provider = provider.name(),
        model = %config.provider.model,
        memory = memory.name(),
        tools = tools.len(),
        "Agent runtime assembled"
    );

    let agent = Arc::new(AgentLoop::from_config(
        config,
        provider,
        tools,
        memory,
        store,
        event_bus.clone(),
    ));
    Ok(Arc::new(TurnHandler::from_config(config, agent, channel, event_bus)))
}
