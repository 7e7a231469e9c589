// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model backend trait and the pull-based fragment stream
//!
//! Backends never return `Err` for ordinary failures: a blocking call yields
//! a failed [`GenerationResult`], a streaming call yields a terminal error
//! fragment.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::llm::message::{GenerationRequest, GenerationResult, StreamFragment};

/// Main trait for model backends
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Backend name for logs (e.g. "ollama")
    fn name(&self) -> &str;

    /// Blocking completion; waits for the whole response
    async fn complete(&self, request: &GenerationRequest) -> GenerationResult;

    /// Incremental completion
    async fn stream(&self, request: &GenerationRequest) -> FragmentStream;
}

/// Forward-only, non-restartable sequence of [`StreamFragment`]s.
///
/// Once a terminal fragment has been returned, or the source ends, the
/// stream is exhausted and every further pull yields `None`.
pub struct FragmentStream {
    inner: Pin<Box<dyn Stream<Item = StreamFragment> + Send>>,
    exhausted: bool,
}

impl FragmentStream {
    /// Wrap any fragment source
    pub fn new(inner: impl Stream<Item = StreamFragment> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(inner),
            exhausted: false,
        }
    }

    /// A stream over already-known fragments
    pub fn from_fragments(fragments: Vec<StreamFragment>) -> Self {
        Self::new(futures::stream::iter(fragments))
    }

    /// A stream that fails before producing any text
    pub fn failed(error: impl Into<String>) -> Self {
        Self::from_fragments(vec![StreamFragment::failed(error)])
    }

    /// Pull the next fragment
    pub async fn next(&mut self) -> Option<StreamFragment> {
        if self.exhausted {
            return None;
        }
        match self.inner.next().await {
            Some(fragment) => {
                if fragment.is_terminal() {
                    self.exhausted = true;
                }
                Some(fragment)
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Drain the stream, concatenating text. Returns the first error seen.
    pub async fn collect_text(mut self) -> GenerationResult {
        let mut text = String::new();
        let mut completed = false;
        while let Some(fragment) = self.next().await {
            if let Some(error) = fragment.error() {
                return GenerationResult::failure(error);
            }
            text.push_str(fragment.text());
            completed = fragment.is_terminal();
        }
        GenerationResult::success(text, completed)
    }
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream")
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
