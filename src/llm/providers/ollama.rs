// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Ollama transport
//!
//! Talks to a single Ollama server over `/api/generate`, either blocking
//! (`stream: false`, one JSON object) or streaming (newline-delimited JSON).
//! Ordinary failures are folded into [`GenerationResult`] / terminal
//! [`StreamFragment`]s instead of being returned as errors.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::config::{OllamaConfig, ResilienceConfig};
use crate::error::{ApiError, Result};
use crate::llm::message::{GenerationRequest, GenerationResult, ModelInfo, StreamFragment};
use crate::llm::provider::{FragmentStream, ModelBackend};
use crate::llm::retry::{with_retry, RetryConfig};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pooled HTTP client bound to one Ollama endpoint
#[derive(Debug, Clone)]
pub struct OllamaTransport {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl OllamaTransport {
    /// Build the transport and its connection pool
    pub fn new(config: &OllamaConfig, resilience: &ResilienceConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
            retry: RetryConfig::from(resilience),
        })
    }

    /// Point the transport at another server, keeping the pool
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is running and reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(target: "relay.transport", error = %e, "health check failed");
                false
            }
        }
    }

    /// List installed models. Any failure yields an empty list.
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        match self.fetch_tags().await {
            Ok(models) => models,
            Err(error) => {
                tracing::warn!(target: "relay.transport", %error, "could not list models");
                Vec::new()
            }
        }
    }

    /// Whether `name` is installed. A bare name also matches its `:latest` tag.
    pub async fn model_exists(&self, name: &str) -> bool {
        let latest = format!("{}:latest", name);
        self.list_models()
            .await
            .iter()
            .any(|m| m.name == name || m.name == latest)
    }

    /// Release the connection pool
    pub fn close(self) {
        tracing::debug!(target: "relay.transport", base_url = %self.base_url, "closing transport");
        drop(self);
    }

    async fn fetch_tags(&self) -> std::result::Result<Vec<ModelInfo>, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.classify(e, HEALTH_CHECK_TIMEOUT))?;

        if !response.status().is_success() {
            return Err(ApiError::ServerError {
                status: response.status().as_u16(),
                message: "Failed to list models".to_string(),
            });
        }

        let body: WireTagsResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        Ok(body
            .models
            .into_iter()
            .map(|m| ModelInfo {
                name: m.name,
                size: m.size,
                modified: m.modified_at,
            })
            .collect())
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// One blocking attempt, without retry
    async fn send_once(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<GenerationResult, ApiError> {
        let response = self
            .client
            .post(self.generate_url())
            .timeout(request.timeout())
            .json(&WireRequest::new(request, false))
            .send()
            .await
            .map_err(|e| self.classify(e, request.timeout()))?;

        if !response.status().is_success() {
            return Err(status_error(response, request.model()).await);
        }

        let body: WireResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                timeout_error(request.timeout())
            } else {
                ApiError::InvalidResponse(e.to_string())
            }
        })?;

        if let Some(message) = body.error {
            return Err(ApiError::InvalidResponse(message));
        }

        Ok(GenerationResult::success(body.response, body.done))
    }

    /// Map a reqwest failure to a transport error class
    fn classify(&self, error: reqwest::Error, timeout: Duration) -> ApiError {
        if error.is_timeout() {
            timeout_error(timeout)
        } else if error.is_connect() {
            ApiError::Network(format!(
                "Cannot connect to Ollama at {}. Is it running?",
                self.base_url
            ))
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl ModelBackend for OllamaTransport {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &GenerationRequest) -> GenerationResult {
        let started = Instant::now();
        tracing::debug!(
            target: "relay.transport",
            model = request.model(),
            prompt_chars = request.prompt().len(),
            "blocking generate"
        );

        match with_retry(|| self.send_once(request), &self.retry, "generate").await {
            Ok(result) => {
                tracing::debug!(
                    target: "relay.transport",
                    model = request.model(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    chars = result.text().len(),
                    "generate finished"
                );
                result
            }
            Err(error) => {
                tracing::warn!(target: "relay.transport", model = request.model(), %error, "generate failed");
                GenerationResult::from(error)
            }
        }
    }

    async fn stream(&self, request: &GenerationRequest) -> FragmentStream {
        tracing::debug!(target: "relay.transport", model = request.model(), "streaming generate");

        // The timeout bounds the response head only; body reads run until
        // the server finishes or the consumer stops pulling.
        let send = self
            .client
            .post(self.generate_url())
            .json(&WireRequest::new(request, true))
            .send();

        let response = match tokio::time::timeout(request.timeout(), send).await {
            Err(_) => return FragmentStream::failed(timeout_error(request.timeout()).to_string()),
            Ok(Err(e)) => {
                return FragmentStream::failed(self.classify(e, request.timeout()).to_string())
            }
            Ok(Ok(response)) => response,
        };

        if !response.status().is_success() {
            let error = status_error(response, request.model()).await;
            tracing::warn!(target: "relay.transport", %error, "stream rejected");
            return FragmentStream::failed(error.to_string());
        }

        FragmentStream::new(ndjson_fragments(response.bytes_stream()))
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn timeout_error(timeout: Duration) -> ApiError {
    ApiError::Timeout {
        secs: timeout.as_secs(),
    }
}

/// Classify a non-2xx response
async fn status_error(response: Response, model: &str) -> ApiError {
    let status = response.status().as_u16();
    if status == 404 {
        return ApiError::ModelNotFound(model.to_string());
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<WireError>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    };
    ApiError::ServerError { status, message }
}

/// Turn a chunked NDJSON body into fragments.
///
/// Lines may be split across chunks, so bytes are buffered until a newline.
/// Malformed lines are skipped. A body that ends without `done: true`, or a
/// chunk read error, produces one terminal error fragment.
fn ndjson_fragments<S, B, E>(chunks: S) -> impl Stream<Item = StreamFragment> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        futures::pin_mut!(chunks);

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(target: "relay.transport", error = %e, "stream interrupted");
                    yield StreamFragment::failed(ApiError::StreamError(e.to_string()).to_string());
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(fragment) = parse_line(&line) {
                    let terminal = fragment.is_terminal();
                    yield fragment;
                    if terminal {
                        return;
                    }
                }
            }
        }

        // Last line may lack a trailing newline
        if let Some(fragment) = parse_line(&buffer) {
            let terminal = fragment.is_terminal();
            yield fragment;
            if terminal {
                return;
            }
        }

        yield StreamFragment::failed(
            ApiError::StreamError("stream ended before completion".to_string()).to_string(),
        );
    }
}

/// Parse one NDJSON record. Blank, malformed and empty non-final lines yield `None`.
fn parse_line(line: &[u8]) -> Option<StreamFragment> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }

    let record: WireStreamLine = match serde_json::from_slice(trimmed) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(target: "relay.transport", error = %e, "skipping malformed stream line");
            return None;
        }
    };

    if let Some(message) = record.error {
        return Some(StreamFragment::failed(
            ApiError::StreamError(message).to_string(),
        ));
    }
    if record.done {
        return Some(StreamFragment::last(record.response));
    }
    if record.response.is_empty() {
        return None;
    }
    Some(StreamFragment::delta(record.response))
}

// Ollama API types

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: WireOptions,
}

impl<'a> WireRequest<'a> {
    fn new(request: &'a GenerationRequest, stream: bool) -> Self {
        let options = request.options();
        Self {
            model: request.model(),
            prompt: request.prompt(),
            stream,
            system: request.system(),
            options: WireOptions {
                temperature: options.temperature,
                top_p: options.top_p,
                num_predict: options.num_predict,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireOptions {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStreamLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
}

#[derive(Debug, Deserialize)]
struct WireTagsResponse {
    #[serde(default)]
    models: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    modified_at: Option<String>,
}
