//! Shared plumbing for tools that call out over HTTP.
//!
//! Network and upstream failures are not tool errors: they come back as
//! an `{"error": ...}` object so the model can tell the user what went
//! wrong and keep talking.

use std::time::Duration;

use parley_core::error::ToolError;
use tracing::warn;

/// Browser-like agent; some sites refuse bare HTTP clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:126.0) Gecko/20100101 Firefox/126.0";

/// Build the client shared by every HTTP tool.
pub fn client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build tool HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// The result shape for a failure the model should relay.
pub fn error_result(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

/// A required, non-blank string argument.
pub fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// Send `request` and decode the JSON body, treating non-2xx as failure.
pub async fn get_json(
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, reqwest::Error> {
    request.send().await?.error_for_status()?.json().await
}
