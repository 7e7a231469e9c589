// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock model backend for testing
//!
//! Provides a scripted implementation of [`ModelBackend`] that can be used
//! in unit tests without a running Ollama server.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::llm::message::{GenerationRequest, GenerationResult, StreamFragment};
use crate::llm::provider::{FragmentStream, ModelBackend};

const DEFAULT_TEXT: &str = "Mock response";

/// A scripted backend. Replies are consumed in order; once a queue is empty
/// the default reply is used.
#[derive(Clone, Default)]
pub struct MockBackend {
    completions: Arc<Mutex<VecDeque<GenerationResult>>>,
    streams: Arc<Mutex<VecDeque<Vec<StreamFragment>>>>,
    recorded_requests: Arc<Mutex<Vec<GenerationRequest>>>,
    call_count: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("mock backend lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful blocking reply
    pub fn with_completion(self, text: impl Into<String>) -> Self {
        lock(&self.completions).push_back(GenerationResult::success(text, true));
        self
    }

    /// Queue several successful blocking replies
    pub fn with_completions<I, S>(self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut queue = lock(&self.completions);
            for text in texts {
                queue.push_back(GenerationResult::success(text, true));
            }
        }
        self
    }

    /// Queue a failed blocking reply
    pub fn with_failure(self, error: impl Into<String>) -> Self {
        lock(&self.completions).push_back(GenerationResult::failure(error));
        self
    }

    /// Queue the fragments of one streamed reply
    pub fn with_stream(self, fragments: Vec<StreamFragment>) -> Self {
        lock(&self.streams).push_back(fragments);
        self
    }

    /// Delay every call, so stage timings are measurable
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `complete` plus `stream` calls
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        lock(&self.recorded_requests).clone()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        lock(&self.recorded_requests).last().cloned()
    }

    async fn record(&self, request: &GenerationRequest) {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.recorded_requests).push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn next_completion(&self) -> GenerationResult {
        lock(&self.completions)
            .pop_front()
            .unwrap_or_else(|| GenerationResult::success(DEFAULT_TEXT, true))
    }
}

/// Split text into 10-char deltas followed by an empty terminal fragment
fn chunked(text: &str) -> Vec<StreamFragment> {
    let chars: Vec<char> = text.chars().collect();
    let mut fragments: Vec<StreamFragment> = chars
        .chunks(10)
        .map(|chunk| StreamFragment::delta(chunk.iter().collect::<String>()))
        .collect();
    fragments.push(StreamFragment::last(""));
    fragments
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &GenerationRequest) -> GenerationResult {
        self.record(request).await;
        self.next_completion()
    }

    async fn stream(&self, request: &GenerationRequest) -> FragmentStream {
        self.record(request).await;
        let scripted = lock(&self.streams).pop_front();
        match scripted {
            Some(fragments) => FragmentStream::from_fragments(fragments),
            None => {
                // Fall back to streaming the next blocking reply
                let result = self.next_completion();
                match result.error() {
                    Some(error) => FragmentStream::failed(error),
                    None => FragmentStream::from_fragments(chunked(result.text())),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_default_reply() {
        let backend = MockBackend::new();
        let result = backend.complete(&GenerationRequest::new("m", "p")).await;
        assert_eq!(result.text(), "Mock response");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_replies_in_order() {
        let backend = MockBackend::new()
            .with_completions(["first", "second"])
            .with_failure("down");
        let request = GenerationRequest::new("m", "p");

        assert_eq!(backend.complete(&request).await.text(), "first");
        assert_eq!(backend.complete(&request).await.text(), "second");
        assert_eq!(backend.complete(&request).await.error(), Some("down"));
        assert_eq!(backend.complete(&request).await.text(), "Mock response");
    }

    #[tokio::test]
    async fn test_mock_backend_records_requests() {
        let backend = MockBackend::new();
        backend
            .complete(&GenerationRequest::new("phi3", "What is 2+2?"))
            .await;
        let last = backend.last_request().unwrap();
        assert_eq!(last.model(), "phi3");
        assert_eq!(last.prompt(), "What is 2+2?");
    }

    #[tokio::test]
    async fn test_mock_backend_scripted_stream() {
        let backend = MockBackend::new().with_stream(vec![
            StreamFragment::delta("a"),
            StreamFragment::last("b"),
        ]);
        let result = backend
            .stream(&GenerationRequest::new("m", "p"))
            .await
            .collect_text()
            .await;
        assert_eq!(result.text(), "ab");
    }

    #[tokio::test]
    async fn test_mock_backend_streams_completion_in_chunks() {
        let backend = MockBackend::new().with_completion("The answer is forty-two.");
        let mut stream = backend.stream(&GenerationRequest::new("m", "p")).await;

        let first = stream.next().await.unwrap();
        assert_eq!(first.text(), "The answer");
        let rest = stream.collect_text().await;
        assert_eq!(rest.text(), " is forty-two.");
    }

    #[tokio::test]
    async fn test_mock_backend_failed_stream() {
        let backend = MockBackend::new().with_failure("refused");
        let result = backend
            .stream(&GenerationRequest::new("m", "p"))
            .await
            .collect_text()
            .await;
        assert_eq!(result.error(), Some("refused"));
    }
}
