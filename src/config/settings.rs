// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for the relay
//!
//! Handles loading and saving settings from ~/.relay/settings.json. Every
//! field has a default, so a missing file or a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::condense::CondenseStrategy;

mod io;
mod validation;

/// Main settings structure, stored in ~/.relay/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Inference endpoint and generation settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Web search and result condensation settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Retry settings for blocking model calls
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Terminal shell settings
    #[serde(default)]
    pub ui: UiConfig,
}

/// Inference endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server (without /api/generate)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for both orchestration stages
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout for the initial (tool-detection) call
    #[serde(default = "default_timeout_first_request_secs")]
    pub timeout_first_request_secs: u64,

    /// Timeout for the final call that carries tool results
    #[serde(default = "default_timeout_tool_request_secs")]
    pub timeout_tool_request_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus-sampling threshold
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum output tokens (None = model default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,

    /// Answer verbosity, sent as the system instruction
    #[serde(default)]
    pub response_style: ResponseStyle,

    /// Idle connections kept per host in the pool
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    /// Seconds an idle pooled connection is kept alive
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_first_request_secs: default_timeout_first_request_secs(),
            timeout_tool_request_secs: default_timeout_tool_request_secs(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            num_predict: None,
            response_style: ResponseStyle::default(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
        }
    }
}

impl OllamaConfig {
    pub fn first_request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_first_request_secs)
    }

    pub fn tool_request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_tool_request_secs)
    }
}

/// How verbose the model should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    /// One to three sentences
    Concise,
    /// Clear answer with brief context
    #[default]
    Balanced,
    /// Thorough explanation
    Detailed,
}

impl ResponseStyle {
    /// System instruction sent with every main-model request
    pub fn system_instruction(&self) -> &'static str {
        match self {
            ResponseStyle::Concise => {
                "Answer briefly and directly in one to three sentences. \
                 Do not add background, caveats, or follow-up suggestions unless asked."
            }
            ResponseStyle::Balanced => {
                "Give a clear, accurate answer. Add a little context when it helps, \
                 but stay focused on the question."
            }
            ResponseStyle::Detailed => {
                "Give a thorough, well-structured answer that explains the reasoning \
                 and relevant background."
            }
        }
    }
}

impl std::str::FromStr for ResponseStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "concise" => Ok(ResponseStyle::Concise),
            "balanced" => Ok(ResponseStyle::Balanced),
            "detailed" => Ok(ResponseStyle::Detailed),
            other => Err(format!("unknown response style: {}", other)),
        }
    }
}

/// Web search and condensation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Strategy used to shrink tool results before the final call
    #[serde(default)]
    pub processing_method: CondenseStrategy,

    /// Default number of search hits
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Character budget for a condensed tool result
    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,

    /// Small model used by the model-assisted strategy
    #[serde(default = "default_compact_model")]
    pub compact_model: String,

    /// Timeout for the model-assisted summarization call
    #[serde(default = "default_compact_model_timeout_secs")]
    pub compact_model_timeout_secs: u64,

    /// Timeout for a single search request
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,

    /// Search endpoint (DuckDuckGo HTML frontend)
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            processing_method: CondenseStrategy::default(),
            max_results: default_max_results(),
            max_description_length: default_max_description_length(),
            compact_model: default_compact_model(),
            compact_model_timeout_secs: default_compact_model_timeout_secs(),
            timeout_secs: default_search_timeout_secs(),
            endpoint: default_search_endpoint(),
        }
    }
}

/// Retry configuration for transient server-side failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Retries after the first attempt; a call makes at most
    /// `1 + max_retries` requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (cap for backoff)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter percentage (0.0 to 1.0) for randomizing delays
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

/// Terminal shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Print stage timing after each answer
    #[serde(default = "default_true")]
    pub show_timing: bool,

    /// Stream the final answer by default
    #[serde(default = "default_true")]
    pub use_streaming: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timing: true,
            use_streaming: true,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "phi3:mini".to_string()
}

fn default_timeout_first_request_secs() -> u64 {
    120
}

fn default_timeout_tool_request_secs() -> u64 {
    150
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_pool_max_idle_per_host() -> usize {
    10
}

fn default_pool_idle_timeout_secs() -> u64 {
    90
}

fn default_max_results() -> usize {
    3
}

fn default_max_description_length() -> usize {
    600
}

fn default_compact_model() -> String {
    "tinyllama".to_string()
}

fn default_compact_model_timeout_secs() -> u64 {
    30
}

fn default_search_timeout_secs() -> u64 {
    15
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    300
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_jitter() -> f64 {
    0.0
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Get the relay home directory (~/.relay or $RELAY_HOME).
    pub fn relay_home() -> PathBuf {
        if let Ok(home) = std::env::var("RELAY_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".relay")
    }
}
