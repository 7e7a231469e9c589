// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Web search tool backed by the DuckDuckGo HTML frontend

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::{RelayError, Result};
use crate::tools::definition::{ToolDescriptor, ToolHandler};

pub const TOOL_NAME: &str = "web_search";

/// Upper bound on hits a caller may ask for
const MAX_RESULTS_LIMIT: usize = 10;

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="result__a"[^>]*>(.*?)</a>"#).expect("valid title regex")
});

static SNIPPET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|span|div|td)>"#)
        .expect("valid snippet regex")
});

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// One scraped search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
}

/// Handler for the `web_search` tool
pub struct WebSearch {
    client: Client,
    endpoint: String,
    default_max_results: usize,
    timeout: Duration,
}

impl WebSearch {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ollama-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            default_max_results: config.max_results.clamp(1, MAX_RESULTS_LIMIT),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Run a search and return the scraped hits
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        tracing::debug!(target: "relay.tools", query, max_results, "performing web search");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(RelayError::ToolExecution(format!(
                "Search returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let html = response.text().await.map_err(|e| self.request_error(e))?;
        let hits = parse_results(&html, max_results);
        tracing::debug!(target: "relay.tools", count = hits.len(), "search completed");
        Ok(hits)
    }

    fn request_error(&self, error: reqwest::Error) -> RelayError {
        if error.is_timeout() {
            RelayError::ToolExecution(format!(
                "Search timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else {
            RelayError::ToolExecution(format!("Search request failed: {}", error))
        }
    }
}

#[async_trait]
impl ToolHandler for WebSearch {
    async fn call(&self, parameters: &Map<String, Value>) -> Result<String> {
        let query = parameters
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| RelayError::InvalidInput("query must not be empty".to_string()))?;

        let max_results = parameters
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|n| (n as usize).clamp(1, MAX_RESULTS_LIMIT))
            .unwrap_or(self.default_max_results);

        let hits = self.search(query, max_results).await?;
        Ok(format_hits(&hits))
    }
}

/// Build the `web_search` descriptor from settings
pub fn descriptor(config: &SearchConfig) -> Result<ToolDescriptor> {
    let max_results_description = format!(
        "Maximum number of results to return (default {})",
        config.max_results.clamp(1, MAX_RESULTS_LIMIT)
    );

    Ok(ToolDescriptor::new(
        TOOL_NAME,
        "Search the web for current information, news, facts, or anything the model may not know.",
        WebSearch::new(config)?,
    )
    .string("query", "The search query", true)
    .integer(
        "max_results",
        &max_results_description,
        false,
    ))
}

/// Scrape titles and snippets from a DuckDuckGo HTML result page
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let snippets: Vec<String> = SNIPPET_PATTERN
        .captures_iter(html)
        .map(|c| clean_text(&c[1]))
        .collect();

    TITLE_PATTERN
        .captures_iter(html)
        .map(|c| clean_text(&c[1]))
        .enumerate()
        .filter(|(_, title)| !title.is_empty())
        .map(|(i, title)| SearchHit {
            title,
            snippet: snippets.get(i).cloned().unwrap_or_default(),
        })
        .take(max_results)
        .collect()
}

/// Numbered list of hits, or a fixed message when there are none
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}\n   {}", i + 1, hit.title, hit.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip tags, decode common entities and collapse whitespace
fn clean_text(fragment: &str) -> String {
    let text = TAG_PATTERN.replace_all(fragment, "");
    let text = text
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    WHITESPACE_PATTERN.replace_all(text.trim(), " ").into_owned()
}
