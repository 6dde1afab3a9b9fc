//! `parley status` — Show the effective configuration.

use parley_config::AppConfig;

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    println!("parley Status");
    println!("=============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {} ({})", config.provider.name, config.provider.api_url);
    println!("  Model:        {}", config.provider.model);
    println!("  Temperature:  {}", config.provider.temperature);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Agent:        {}", config.agent.name);
    println!(
        "  Budget:       {} tokens ({} during tool chains)",
        config.context.max_tokens, config.context.tool_chain_max_tokens
    );
    println!(
        "  Memory:       {} ({})",
        config.memory.backend,
        config.memory.resolved_dir().display()
    );
    println!("  Channel:      {}", config.channel.kind);
    println!(
        "  Tool keys:    weather {}, binderbyte {}",
        key_state(&config.tools.weather_api_key),
        key_state(&config.tools.binderbyte_api_key)
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `parley onboard` first");
    }

    Ok(())
}

fn key_state(key: &Option<String>) -> &'static str {
    if key.as_deref().is_some_and(|k| !k.is_empty()) {
        "set"
    } else {
        "missing"
    }
}
