//! Package tracking tool (cek resi) backed by the BinderByte API.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::Tool;
use tracing::debug;

use crate::http::{error_result, get_json, required_str};

const DEFAULT_BASE_URL: &str = "https://api.binderbyte.com";

/// Courier codes BinderByte can track.
pub const COURIERS: [&str; 14] = [
    "jne",
    "pos",
    "jnt",
    "sicepat",
    "tiki",
    "anteraja",
    "wahana",
    "ninja",
    "lion",
    "jet",
    "rex",
    "spx",
    "lex",
    "kurir_tokopedia",
];

pub struct CekResiTool {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl CekResiTool {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for CekResiTool {
    fn name(&self) -> &str {
        "cek_resi"
    }

    fn description(&self) -> &str {
        "Track a package by courier and airway bill (resi) number."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "courier": {
                    "type": "string",
                    "enum": COURIERS,
                    "description": "Courier code"
                },
                "awb": {
                    "type": "string",
                    "description": "Airway bill / tracking number"
                }
            },
            "required": ["courier", "awb"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let courier = required_str(&arguments, "courier")?.to_ascii_lowercase();
        if !COURIERS.contains(&courier.as_str()) {
            return Err(ToolError::InvalidArguments(format!("Unknown courier '{courier}'")));
        }
        let awb = required_str(&arguments, "awb")?;

        let Some(api_key) = &self.api_key else {
            return Ok(error_result("BinderByte API key is not setup."));
        };

        let request = self
            .client
            .get(format!("{}/v1/track", self.base_url))
            .query(&[("api_key", api_key.as_str()), ("courier", courier.as_str()), ("awb", awb)]);

        match get_json(request).await {
            Ok(tracking) => Ok(tracking),
            Err(e) => {
                debug!(courier = %courier, awb, error = %e, "Package tracking failed");
                Ok(error_result(
                    "Failed to fetch package information. The tracking number might be invalid or the courier service is incorrect.",
                ))
            }
        }
    }

    fn describe(&self, arguments: &serde_json::Value) -> String {
        format!(
            "Tracking package {} via {}",
            arguments["awb"].as_str().unwrap_or_default(),
            arguments["courier"].as_str().unwrap_or_default().to_ascii_uppercase()
        )
    }
}
