//! Web search tool — scrapes the DuckDuckGo HTML results page.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::Tool;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::debug;

use crate::http::required_str;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct SearchWebTool {
    client: reqwest::Client,
    endpoint: String,
}

impl SearchWebTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch(&self, query: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web. Returns titles, links and snippets of the top results; open a link with open_web_page for details."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = required_str(&arguments, "query")?;

        match self.fetch(query).await {
            Ok(page) => Ok(serde_json::json!({ "results": parse_results(&page) })),
            Err(e) => {
                debug!(query, error = %e, "Web search failed");
                Ok(serde_json::json!({
                    "results": [],
                    "error": "Failed to perform search",
                }))
            }
        }
    }

    fn describe(&self, arguments: &serde_json::Value) -> String {
        format!("Web search for `{}`", arguments["query"].as_str().unwrap_or_default())
    }
}

/// Pull results out of a DuckDuckGo HTML page, skipping entries without a link.
pub fn parse_results(page: &str) -> Vec<SearchResult> {
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse(".result__title a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(page);
    document
        .select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&title_sel).next()?;
            let href = link.value().attr("href")?;
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|s| collapse_whitespace(&s.text().collect::<String>()))
                .unwrap_or_default();
            Some(SearchResult {
                title: collapse_whitespace(&link.text().collect::<String>()),
                url: actual_url(href),
                snippet,
            })
        })
        .collect()
}

/// Result links go through a redirector; the target sits in `uddg`.
pub fn actual_url(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    url::Url::parse(&absolute)
        .ok()
        .and_then(|parsed| {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client;

    const PAGE: &str = r#"
        <html><body>
          <div class="result results_links">
            <h2 class="result__title">
              <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">
                Rust Programming   Language
              </a>
            </h2>
            <a class="result__snippet">A language empowering everyone.</a>
          </div>
          <div class="result">
            <h2 class="result__title"><a href="https://docs.rs/">Docs.rs</a></h2>
          </div>
          <div class="result"><span>sponsored, no link</span></div>
        </body></html>
    "#;

    #[test]
    fn parses_titles_links_and_snippets() {
        let results = parse_results(PAGE);
        assert_eq!(
            results,
            vec![
                SearchResult {
                    title: "Rust Programming Language".into(),
                    url: "https://www.rust-lang.org/".into(),
                    snippet: "A language empowering everyone.".into(),
                },
                SearchResult {
                    title: "Docs.rs".into(),
                    url: "https://docs.rs/".into(),
                    snippet: String::new(),
                },
            ]
        );
    }

    #[test]
    fn empty_page_has_no_results() {
        assert!(parse_results("<html></html>").is_empty());
    }

    #[test]
    fn redirect_links_are_unwrapped() {
        assert_eq!(
            actual_url("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1"),
            "https://example.com/a?b=1"
        );
        assert_eq!(actual_url("https://example.com/"), "https://example.com/");
        assert_eq!(actual_url("not a url"), "not a url");
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let tool = SearchWebTool::new(client(2));
        let err = tool.execute(serde_json::json!({"query": ""})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn failed_search_keeps_the_result_shape() {
        let tool = SearchWebTool::new(client(2)).with_endpoint("http://127.0.0.1:1/html/");
        let result = tool.execute(serde_json::json!({"query": "rust"})).await.unwrap();
        assert_eq!(result["error"], "Failed to perform search");
        assert_eq!(result["results"], serde_json::json!([]));
    }

    #[test]
    fn describe_quotes_the_query() {
        let tool = SearchWebTool::new(client(2));
        assert_eq!(
            tool.describe(&serde_json::json!({"query": "tokio select"})),
            "Web search for `tokio select`"
        );
    }
}
