// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool result condensation
//!
//! Raw tool output (search hits, mostly) is shrunk to a character budget
//! before it goes back into a prompt. The strategy is a closed set picked
//! from settings; every strategy returns plain text within the budget and
//! none of them can fail.

pub mod extractive;
pub mod summarize;
pub mod truncate;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::llm::provider::ModelBackend;

pub use extractive::extract;
pub use summarize::Summarizer;
pub use truncate::truncate;

/// How tool results are condensed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CondenseStrategy {
    /// Cut at the budget on a word boundary
    Truncate,
    /// Keep the sentences most relevant to the query
    #[default]
    Extractive,
    /// Ask a small model for a one- or two-sentence summary
    ModelAssisted,
}

impl CondenseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CondenseStrategy::Truncate => "truncate",
            CondenseStrategy::Extractive => "extractive",
            CondenseStrategy::ModelAssisted => "model_assisted",
        }
    }
}

impl std::str::FromStr for CondenseStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "truncate" => Ok(CondenseStrategy::Truncate),
            "extractive" => Ok(CondenseStrategy::Extractive),
            "model_assisted" => Ok(CondenseStrategy::ModelAssisted),
            other => Err(format!("unknown processing method: {}", other)),
        }
    }
}

/// Applies the configured strategy with a fixed character budget
#[derive(Debug, Clone)]
pub struct Condenser {
    strategy: CondenseStrategy,
    budget: usize,
    summarizer: Option<Summarizer>,
}

impl Condenser {
    pub fn new(strategy: CondenseStrategy, budget: usize) -> Self {
        Self {
            strategy,
            budget,
            summarizer: None,
        }
    }

    /// Condenser from search settings. `backend` serves the model-assisted
    /// strategy; without it that strategy behaves like the extractive one.
    pub fn from_settings(config: &SearchConfig, backend: Option<Arc<dyn ModelBackend>>) -> Self {
        let condenser = Self::new(config.processing_method, config.max_description_length);
        match backend {
            Some(backend) => condenser.with_summarizer(Summarizer::new(
                backend,
                config.compact_model.clone(),
                Duration::from_secs(config.compact_model_timeout_secs),
            )),
            None => condenser,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn strategy(&self) -> CondenseStrategy {
        self.strategy
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Shrink `raw` to the budget, using `query` as relevance context
    pub async fn condense(&self, raw: &str, query: &str) -> String {
        let raw_chars = raw.chars().count();
        let condensed = match self.strategy {
            CondenseStrategy::Truncate => truncate(raw, self.budget),
            CondenseStrategy::Extractive => extract(raw, query, self.budget),
            CondenseStrategy::ModelAssisted => self.model_assisted(raw, query).await,
        };

        tracing::debug!(
            target: "relay.condense",
            strategy = self.strategy.as_str(),
            raw_chars,
            condensed_chars = condensed.chars().count(),
            budget = self.budget,
            "condensed tool result"
        );
        condensed
    }

    async fn model_assisted(&self, raw: &str, query: &str) -> String {
        if raw.chars().count() <= self.budget {
            return raw.to_string();
        }

        let summary = match &self.summarizer {
            Some(summarizer) => summarizer.summarize(raw, query).await,
            None => None,
        };

        match summary {
            Some(summary) => truncate(&summary, self.budget),
            None => {
                tracing::debug!(target: "relay.condense", "falling back to extractive");
                extract(raw, query, self.budget)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock_provider::MockBackend;

    const RAW: &str = "1. Rust 1.80 released\n   The release stabilizes LazyLock and adds exclusive ranges in patterns. \
        2. Weather\n   Heavy rain is expected across the coast this weekend with strong winds. \
        3. Markets\n   Stocks rallied on Friday as inflation data came in below expectations.";

    #[test]
    fn test_strategy_serde_names() {
        assert_eq!(
            serde_json::to_string(&CondenseStrategy::ModelAssisted).unwrap(),
            "\"model_assisted\""
        );
        assert_eq!(
            "model-assisted".parse::<CondenseStrategy>().unwrap(),
            CondenseStrategy::ModelAssisted
        );
        assert!("summarize".parse::<CondenseStrategy>().is_err());
    }

    #[tokio::test]
    async fn test_every_strategy_respects_budget() {
        let backend: Arc<dyn ModelBackend> =
            Arc::new(MockBackend::new().with_completion("Rain and wind hit the coast. ".repeat(10)));
        let summarizer = Summarizer::new(backend, "tinyllama", Duration::from_secs(5));

        for strategy in [
            CondenseStrategy::Truncate,
            CondenseStrategy::Extractive,
            CondenseStrategy::ModelAssisted,
        ] {
            let condenser = Condenser::new(strategy, 80).with_summarizer(summarizer.clone());
            let out = condenser.condense(RAW, "weekend weather").await;
            assert!(
                out.chars().count() <= 80,
                "{:?} produced {} chars",
                strategy,
                out.chars().count()
            );
            assert!(!out.is_empty());
        }
    }

    #[tokio::test]
    async fn test_short_result_unchanged() {
        for strategy in [CondenseStrategy::Truncate, CondenseStrategy::Extractive] {
            let condenser = Condenser::new(strategy, 600);
            assert_eq!(condenser.condense(RAW, "anything").await, RAW);
        }
    }

    #[tokio::test]
    async fn test_model_assisted_uses_summary() {
        let backend = MockBackend::new().with_completion("Heavy rain this weekend.");
        let condenser = Condenser::new(CondenseStrategy::ModelAssisted, 100).with_summarizer(
            Summarizer::new(Arc::new(backend.clone()), "tinyllama", Duration::from_secs(5)),
        );

        let out = condenser.condense(RAW, "weekend weather").await;
        assert_eq!(out, "Heavy rain this weekend.");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_assisted_falls_back_to_extractive() {
        let backend = MockBackend::new().with_failure("Model 'tinyllama' not found");
        let condenser = Condenser::new(CondenseStrategy::ModelAssisted, 100).with_summarizer(
            Summarizer::new(Arc::new(backend), "tinyllama", Duration::from_secs(5)),
        );

        let out = condenser.condense(RAW, "weekend weather").await;
        assert_eq!(out, extract(RAW, "weekend weather", 100));
    }

    #[tokio::test]
    async fn test_model_assisted_without_backend() {
        let condenser = Condenser::new(CondenseStrategy::ModelAssisted, 100);
        let out = condenser.condense(RAW, "weekend weather").await;
        assert!(out.contains("rain"));
    }

    #[tokio::test]
    async fn test_model_assisted_skips_call_when_short() {
        let backend = MockBackend::new();
        let condenser = Condenser::new(CondenseStrategy::ModelAssisted, 1000).with_summarizer(
            Summarizer::new(Arc::new(backend.clone()), "tinyllama", Duration::from_secs(5)),
        );
        assert_eq!(condenser.condense(RAW, "q").await, RAW);
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_from_settings() {
        let mut config = SearchConfig::default();
        config.processing_method = CondenseStrategy::Truncate;
        config.max_description_length = 250;
        let condenser = Condenser::from_settings(&config, None);
        assert_eq!(condenser.strategy(), CondenseStrategy::Truncate);
        assert_eq!(condenser.budget(), 250);
    }
}
