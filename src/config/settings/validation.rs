// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{RelayError, Result};

use super::Settings;

impl Settings {
    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        let ollama = &self.ollama;

        if ollama.model.trim().is_empty() {
            return Err(RelayError::Config("ollama.model must not be empty".into()));
        }
        if !(ollama.base_url.starts_with("http://") || ollama.base_url.starts_with("https://")) {
            return Err(RelayError::Config(format!(
                "ollama.base_url must be an http(s) URL, got '{}'",
                ollama.base_url
            )));
        }
        if !(0.0..=2.0).contains(&ollama.temperature) {
            return Err(RelayError::Config(format!(
                "ollama.temperature must be within 0.0..=2.0, got {}",
                ollama.temperature
            )));
        }
        if !(0.0..=1.0).contains(&ollama.top_p) {
            return Err(RelayError::Config(format!(
                "ollama.top_p must be within 0.0..=1.0, got {}",
                ollama.top_p
            )));
        }
        if ollama.timeout_first_request_secs == 0 || ollama.timeout_tool_request_secs == 0 {
            return Err(RelayError::Config("request timeouts must be non-zero".into()));
        }
        if self.search.max_description_length == 0 {
            return Err(RelayError::Config(
                "search.max_description_length must be non-zero".into(),
            ));
        }
        if self.search.compact_model_timeout_secs == 0 || self.search.timeout_secs == 0 {
            return Err(RelayError::Config("search timeouts must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.resilience.jitter) {
            return Err(RelayError::Config(format!(
                "resilience.jitter must be within 0.0..=1.0, got {}",
                self.resilience.jitter
            )));
        }

        Ok(())
    }
}
