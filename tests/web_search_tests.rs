// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ollama_relay::config::SearchConfig;
use ollama_relay::tools::builtin::web_search::WebSearch;
use ollama_relay::tools::{ToolInvocation, ToolRegistry};

fn page(count: usize) -> String {
    (1..=count)
        .map(|i| {
            format!(
                r#"<div class="result"><a class="result__a" href="https://r{i}.example">Result {i}</a>
                   <a class="result__snippet" href="https://r{i}.example">Snippet number {i}.</a></div>"#
            )
        })
        .collect()
}

fn config(server: &MockServer) -> SearchConfig {
    SearchConfig {
        endpoint: format!("{}/html/", server.uri()),
        ..SearchConfig::default()
    }
}

fn registry(server: &MockServer) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(ollama_relay::tools::builtin::web_search::descriptor(&config(server)).unwrap())
        .unwrap();
    registry
}

fn invocation(parameters: serde_json::Value) -> ToolInvocation {
    ToolInvocation::new(
        "web_search",
        parameters.as_object().cloned().unwrap_or_default(),
    )
}

#[tokio::test]
async fn test_search_posts_query_and_scrapes_hits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(body_string_contains("q=rust+language"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(2)))
        .expect(1)
        .mount(&server)
        .await;

    let search = WebSearch::new(&config(&server)).unwrap();
    let hits = search.search("rust language", 5).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].title, "Result 1");
    assert_eq!(hits[1].snippet, "Snippet number 2.");
}

#[tokio::test]
async fn test_execute_uses_default_max_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(6)))
        .mount(&server)
        .await;

    let result = registry(&server)
        .execute(&invocation(json!({"query": "anything"})))
        .await;

    assert!(result.is_success());
    let text = result.output_text();
    assert!(text.starts_with("1. Result 1\n   Snippet number 1."));
    assert!(text.contains("3. Result 3"));
    assert!(!text.contains("4. Result 4"));
}

#[tokio::test]
async fn test_execute_honours_max_results_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(6)))
        .mount(&server)
        .await;

    let result = registry(&server)
        .execute(&invocation(json!({"query": "anything", "max_results": 5})))
        .await;

    assert_eq!(result.output_text().lines().count(), 10);
}

#[tokio::test]
async fn test_execute_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let result = registry(&server)
        .execute(&invocation(json!({"query": "nothing"})))
        .await;
    assert_eq!(result.output_text(), "No results found.");
}

#[tokio::test]
async fn test_execute_http_failure_is_tool_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = registry(&server)
        .execute(&invocation(json!({"query": "anything"})))
        .await;

    assert!(result.is_error());
    assert!(result.output_text().contains("Search returned HTTP 500"));
}

#[tokio::test]
async fn test_execute_rejects_bad_parameters_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(1)))
        .expect(0)
        .mount(&server)
        .await;
    let registry = registry(&server);

    let missing = registry.execute(&invocation(json!({}))).await;
    assert!(missing.is_error());
    assert!(missing.output_text().starts_with("Invalid parameters for web_search"));

    let wrong_kind = registry
        .execute(&invocation(json!({"query": "x", "max_results": "five"})))
        .await;
    assert!(wrong_kind.is_error());

    let undeclared = registry
        .execute(&invocation(json!({"query": "x", "region": "us"})))
        .await;
    assert!(undeclared.is_error());
}
