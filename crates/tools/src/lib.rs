//! Built-in tool implementations for parley.
//!
//! Tools give the agent a way to act between messages: keep notes about
//! the people it talks to, read a user's daily khodam, and reach out to
//! the web for forecasts, searches, pages, parcels and Beat Saver maps.
//! Web-facing tools report upstream failures as `{"error": ...}` results
//! rather than failing the turn.

pub mod add_memory;
pub mod beat_saver;
pub mod cek_resi;
pub mod get_khodam;
pub mod http;
pub mod open_web_page;
pub mod search_web;
pub mod weather_forecast;

use std::sync::Arc;
use parley_config::ToolsConfig;
use parley_core::memory::MemoryBackend;
use parley_core::tool::ToolRegistry;

pub use add_memory::AddMemoryTool;
pub use beat_saver::BeatSaverMapsTool;
pub use cek_resi::CekResiTool;
pub use get_khodam::GetKhodamTool;
pub use open_web_page::OpenWebPageTool;
pub use search_web::SearchWebTool;
pub use weather_forecast::WeatherForecastTool;

/// Create a default tool registry with all built-in tools.
///
/// `add_memory` writes through `memory`, the same backend the system
/// context reads from. The web tools share one HTTP client.
pub fn default_registry(memory: Arc<dyn MemoryBackend>, config: &ToolsConfig) -> ToolRegistry {
    let client = http::client(config.http_timeout_secs);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(AddMemoryTool::new(memory)));
    registry.register(Box::new(GetKhodamTool));
    registry.register(Box::new(WeatherForecastTool::new(
        client.clone(),
        config.weather_api_key.clone(),
    )));
    registry.register(Box::new(SearchWebTool::new(client.clone())));
    registry.register(Box::new(OpenWebPageTool::new(client.clone())));
    registry.register(Box::new(CekResiTool::new(
        client.clone(),
        config.binderbyte_api_key.clone(),
    )));
    registry.register(Box::new(BeatSaverMapsTool::new(client)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_memory::NoopMemory;

    #[test]
    fn default_registry_has_builtins() {
        let registry = default_registry(Arc::new(NoopMemory), &ToolsConfig::default());
        assert_eq!(
            registry.names(),
            vec![
                "add_memory",
                "cek_resi",
                "get_beat_saver_maps",
                "get_khodam",
                "get_weather_forecast",
                "open_web_page",
                "search_web",
            ]
        );
    }

    #[tokio::test]
    async fn unconfigured_keys_surface_as_error_results() {
        let registry = default_registry(Arc::new(NoopMemory), &ToolsConfig::default());
        let weather = registry.get("get_weather_forecast").unwrap();
        let result = weather
            .execute(serde_json::json!({"location": "Jakarta"}))
            .await
            .unwrap();
        assert_eq!(result["error"], "Weather API key is not setup.");
    }
}
