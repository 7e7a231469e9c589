// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Request and result types exchanged with a model backend

use std::time::Duration;

use crate::config::OllamaConfig;
use crate::error::ApiError;

/// Sampling options forwarded to the endpoint's `options` object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus-sampling threshold
    pub top_p: f32,
    /// Maximum output tokens (None = model default)
    pub num_predict: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            num_predict: None,
        }
    }
}

impl From<&OllamaConfig> for GenerationOptions {
    fn from(config: &OllamaConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            num_predict: config.num_predict,
        }
    }
}

/// A single model call. Built once, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    model: String,
    prompt: String,
    system: Option<String>,
    options: GenerationOptions,
    timeout: Duration,
}

impl GenerationRequest {
    /// Create a request with default options and a 120 s timeout
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: GenerationOptions::default(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Outcome of a blocking model call.
///
/// A result carrying an error is never successful; the constructors are the
/// only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    text: String,
    error: Option<String>,
    completed: bool,
    status: Option<u16>,
}

impl GenerationResult {
    /// Successful generation
    pub fn success(text: impl Into<String>, completed: bool) -> Self {
        Self {
            text: text.into(),
            error: None,
            completed,
            status: Some(200),
        }
    }

    /// Failed generation with a human-readable reason
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            error: Some(error.into()),
            completed: false,
            status: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the endpoint reported the generation as finished
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// HTTP status, when one was received
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl From<ApiError> for GenerationResult {
    fn from(error: ApiError) -> Self {
        let status = error.status();
        Self {
            status,
            ..Self::failure(error.to_string())
        }
    }
}

/// One incremental unit of a streamed generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFragment {
    text: String,
    terminal: bool,
    error: Option<String>,
}

impl StreamFragment {
    /// A non-final text delta
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: false,
            error: None,
        }
    }

    /// The final fragment of a successful stream
    pub fn last(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: true,
            error: None,
        }
    }

    /// A terminal fragment reporting a failure
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            terminal: true,
            error: Some(error.into()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A model installed on the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub modified: Option<String>,
}
