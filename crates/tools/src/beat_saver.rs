//! Beat Saver map search.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::Tool;
use tracing::debug;

use crate::http::{error_result, get_json, required_str};

const DEFAULT_BASE_URL: &str = "https://api.beatsaver.com";

pub struct BeatSaverMapsTool {
    client: reqwest::Client,
    base_url: String,
}

impl BeatSaverMapsTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// `Latest` when asked for, `Relevance` otherwise.
fn sort_order(arguments: &serde_json::Value) -> &'static str {
    match arguments["sort_order"].as_str() {
        Some(order) if order.eq_ignore_ascii_case("latest") => "Latest",
        _ => "Relevance",
    }
}

#[async_trait]
impl Tool for BeatSaverMapsTool {
    fn name(&self) -> &str {
        "get_beat_saver_maps"
    }

    fn description(&self) -> &str {
        "Search Beat Saver for custom maps by song, artist or mapper."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search text"
                },
                "sort_order": {
                    "type": "string",
                    "enum": ["Relevance", "Latest"],
                    "default": "Relevance"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = required_str(&arguments, "query")?;

        let request = self
            .client
            .get(format!("{}/search/text/0", self.base_url))
            .query(&[("q", query), ("sortOrder", sort_order(&arguments))]);

        match get_json(request).await {
            Ok(maps) => Ok(maps),
            Err(e) => {
                debug!(query, error = %e, "Beat Saver search failed");
                Ok(error_result(
                    "Failed to fetch Beat Saver data. Please ask the user to search themselves.",
                ))
            }
        }
    }

    fn describe(&self, arguments: &serde_json::Value) -> String {
        format!(
            "Searching Beat Saver for {}",
            arguments["query"].as_str().unwrap_or_default()
        )
    }
}
