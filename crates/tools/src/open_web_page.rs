//! Open-web-page tool — fetches a page and hands its raw body to the model.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::Tool;
use tracing::debug;
use url::Url;

use crate::http::{error_result, required_str};

/// Bodies longer than this many characters are cut off.
pub const MAX_PAGE_CHARS: usize = 100_000;

const TWITTER_HOSTS: [&str; 4] = ["twitter.com", "www.twitter.com", "x.com", "www.x.com"];

pub struct OpenWebPageTool {
    client: reqwest::Client,
}

impl OpenWebPageTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &Url) -> Result<String, reqwest::Error> {
        self.client
            .get(url.as_str())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl Tool for OpenWebPageTool {
    fn name(&self) -> &str {
        "open_web_page"
    }

    fn description(&self) -> &str {
        "Open a web page and return its content. Tweets are fetched through a mirror that renders them as plain HTML."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The http(s) URL to open"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let target = normalize_url(required_str(&arguments, "url")?)?;

        match self.fetch(&target).await {
            Ok(body) => {
                let (content, truncated) = truncate_chars(&body, MAX_PAGE_CHARS);
                Ok(serde_json::json!({
                    "url": target.as_str(),
                    "content": content,
                    "truncated": truncated,
                }))
            }
            Err(e) => {
                debug!(url = %target, error = %e, "Opening web page failed");
                Ok(error_result("Unable to open web page"))
            }
        }
    }

    fn describe(&self, arguments: &serde_json::Value) -> String {
        format!("<{}>", arguments["url"].as_str().unwrap_or_default())
    }
}

/// Parse the requested URL, defaulting to https and routing Twitter/X
/// links through fxtwitter.
pub fn normalize_url(raw: &str) -> Result<Url, ToolError> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| ToolError::InvalidArguments(format!("Invalid URL '{raw}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ToolError::InvalidArguments(format!(
            "Only http(s) URLs can be opened, got '{}'",
            url.scheme()
        )));
    }

    let is_twitter = url
        .host_str()
        .is_some_and(|host| TWITTER_HOSTS.contains(&host.to_ascii_lowercase().as_str()));
    if is_twitter {
        url.set_host(Some("fxtwitter.com"))
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let _ = url.set_scheme("https");
    }

    Ok(url)
}

/// Keep at most `max` characters, never splitting one.
fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}
