// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model-assisted summarization with a small, fast model

use std::sync::Arc;
use std::time::Duration;

use crate::llm::message::{GenerationOptions, GenerationRequest};
use crate::llm::provider::ModelBackend;

/// Issues the side call used by the model-assisted strategy
#[derive(Clone)]
pub struct Summarizer {
    backend: Arc<dyn ModelBackend>,
    model: String,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn ModelBackend>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Summarize `raw` for `query`. `None` on any failure or empty output.
    pub async fn summarize(&self, raw: &str, query: &str) -> Option<String> {
        let request = GenerationRequest::new(&self.model, build_prompt(raw, query))
            .with_options(GenerationOptions {
                temperature: 0.3,
                ..GenerationOptions::default()
            })
            .with_timeout(self.timeout);

        // The transport enforces the timeout too; this also bounds other backends.
        let result = match tokio::time::timeout(self.timeout, self.backend.complete(&request)).await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    target: "relay.condense",
                    model = %self.model,
                    timeout_secs = self.timeout.as_secs(),
                    "summarization timed out"
                );
                return None;
            }
        };

        if let Some(error) = result.error() {
            tracing::warn!(target: "relay.condense", model = %self.model, error, "summarization failed");
            return None;
        }

        let text = result.text().trim();
        if text.is_empty() {
            tracing::warn!(target: "relay.condense", model = %self.model, "summarization returned nothing");
            return None;
        }
        Some(text.to_string())
    }
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn build_prompt(raw: &str, query: &str) -> String {
    format!(
        "Summarize the following in 1-2 sentences in the context of the query '{}':\n\n{}",
        query, raw
    )
}
