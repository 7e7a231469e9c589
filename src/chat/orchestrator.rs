// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Interaction orchestrator
//!
//! One run is: a blocking tool-detection call, then optionally one tool
//! execution and a final call carrying the condensed tool output. The final
//! call is blocking for [`Orchestrator::run_once`] and streamed for
//! [`Orchestrator::run_streamed`]. The first call is never streamed since
//! the tool decision needs the full reply.
//!
//! Runs are strictly sequential; the orchestrator is borrowed mutably for
//! the duration of a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::condense::Condenser;
use crate::config::Settings;
use crate::error::Result;
use crate::llm::message::{GenerationOptions, GenerationRequest};
use crate::llm::provider::{FragmentStream, ModelBackend};
use crate::llm::providers::OllamaTransport;
use crate::tools::{parse_tool_directive, ToolInvocation, ToolRegistry};

use super::prompt::{follow_up_prompt, initial_prompt};
use super::timing::StageTiming;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    AwaitingInitialResponse,
    /// Stage-1 text is the answer
    DirectAnswer,
    AwaitingToolExecution,
    AwaitingFinalResponse,
    Done,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// A model call failed; carries the reason
    Failed(String),
    /// Stopped by the caller; the answer holds whatever was produced
    Cancelled,
}

/// Everything known about a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Answer text, or the user-facing error message on failure
    pub answer: String,
    pub outcome: RunOutcome,
    pub timing: StageTiming,
    /// Tool executed during the run, if any
    pub tool_used: Option<String>,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Failed(_))
    }
}

/// Shared interrupt flag. Cloned handles observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Bookkeeping for the run in progress
struct RunContext {
    id: Uuid,
    started: Instant,
    timing: StageTiming,
    tool_used: Option<String>,
    tool_failed: bool,
}

impl RunContext {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started: Instant::now(),
            timing: StageTiming::default(),
            tool_used: None,
            tool_failed: false,
        }
    }

    /// User-facing text for a failed final call
    fn final_failure_message(&self, reason: &str) -> String {
        match &self.tool_used {
            Some(tool) if !self.tool_failed => format!(
                "The {} tool ran successfully, but generating the final answer failed: {}",
                tool, reason
            ),
            _ => format!("Error: {}", reason),
        }
    }
}

/// Result of the stages shared by both entry points
enum Prepared {
    /// The run is decided without a final call
    Answer { text: String, outcome: RunOutcome },
    /// A final call is needed
    Final(GenerationRequest),
}

/// Sequences model calls, tool execution and condensation for one prompt
/// at a time.
pub struct Orchestrator {
    settings: Settings,
    backend: Arc<dyn ModelBackend>,
    registry: ToolRegistry,
    condenser: Condenser,
    cancel: CancelHandle,
    state: RunState,
    last_timing: Option<StageTiming>,
}

impl Orchestrator {
    pub fn new(
        settings: Settings,
        backend: Arc<dyn ModelBackend>,
        registry: ToolRegistry,
        condenser: Condenser,
    ) -> Self {
        Self {
            settings,
            backend,
            registry,
            condenser,
            cancel: CancelHandle::default(),
            state: RunState::Idle,
            last_timing: None,
        }
    }

    /// Wire the Ollama transport, the built-in tools and the configured
    /// condenser.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let transport: Arc<dyn ModelBackend> = Arc::new(OllamaTransport::new(
            &settings.ollama,
            &settings.resilience,
        )?);
        let registry = ToolRegistry::with_defaults(&settings)?;
        let condenser = Condenser::from_settings(&settings.search, Some(transport.clone()));
        Ok(Self::new(settings, transport, registry, condenser))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle for interrupting the current run from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Timing of the most recent finished run
    pub fn last_timing(&self) -> Option<StageTiming> {
        self.last_timing
    }

    /// Run a prompt to completion and return the whole answer
    pub async fn run_once(&mut self, prompt: &str, use_tools: bool) -> RunReport {
        let mut run = RunContext::new();
        tracing::info!(target: "relay.orchestrator", run_id = %run.id, use_tools, streamed = false, "run started");

        let (answer, outcome) = match self.prepare(prompt, use_tools, &mut run).await {
            Prepared::Answer { text, outcome } => (text, outcome),
            Prepared::Final(request) => {
                let started = Instant::now();
                let result = self.backend.complete(&request).await;
                run.timing.final_answer = Some(started.elapsed());

                match result.error() {
                    None => (result.text().trim().to_string(), RunOutcome::Completed),
                    Some(reason) => {
                        tracing::warn!(target: "relay.orchestrator", run_id = %run.id, reason, "final call failed");
                        (
                            run.final_failure_message(reason),
                            RunOutcome::Failed(reason.to_string()),
                        )
                    }
                }
            }
        };

        self.finish_run(run, answer, outcome)
    }

    /// Run a prompt and stream the answer.
    ///
    /// Stages before the final call run here; the returned stream yields the
    /// answer text. Without a tool, the stage-1 answer arrives as a single
    /// fragment.
    pub async fn run_streamed(&mut self, prompt: &str, use_tools: bool) -> AnswerStream<'_> {
        let mut run = RunContext::new();
        tracing::info!(target: "relay.orchestrator", run_id = %run.id, use_tools, streamed = true, "run started");

        let phase = match self.prepare(prompt, use_tools, &mut run).await {
            Prepared::Answer { text, outcome } => StreamPhase::Ready { text, outcome },
            Prepared::Final(request) => {
                let started = Instant::now();
                let stream = self.backend.stream(&request).await;
                StreamPhase::Streaming { stream, started }
            }
        };

        AnswerStream {
            orchestrator: self,
            run: Some(run),
            phase,
            emitted: String::new(),
            report: None,
        }
    }

    /// Stages up to the final call: detection, tool, condensation
    async fn prepare(&mut self, prompt: &str, use_tools: bool, run: &mut RunContext) -> Prepared {
        self.cancel.reset();
        self.state = RunState::AwaitingInitialResponse;

        let tools_block = if use_tools {
            Some(self.registry.describe_all())
        } else {
            None
        };
        let request = self.request(
            initial_prompt(prompt, tools_block.as_deref()),
            self.settings.ollama.first_request_timeout(),
        );

        let started = Instant::now();
        let result = self.backend.complete(&request).await;
        run.timing.initial = started.elapsed();

        if let Some(reason) = result.error() {
            tracing::warn!(target: "relay.orchestrator", run_id = %run.id, reason, "initial call failed");
            return Prepared::Answer {
                text: format!("Error: {}", reason),
                outcome: RunOutcome::Failed(reason.to_string()),
            };
        }
        if self.cancel.is_cancelled() {
            return cancelled();
        }

        let text = result.text().trim();
        let Some(invocation) = self.detect_tool(text, use_tools, run) else {
            self.state = RunState::DirectAnswer;
            return Prepared::Answer {
                text: text.to_string(),
                outcome: RunOutcome::Completed,
            };
        };

        self.state = RunState::AwaitingToolExecution;
        let started = Instant::now();
        let tool_result = self.registry.execute(&invocation).await;
        run.timing.tool = Some(started.elapsed());
        run.tool_used = Some(invocation.name.clone());
        run.tool_failed = tool_result.is_error();

        tracing::info!(
            target: "relay.orchestrator",
            run_id = %run.id,
            tool = %invocation.name,
            success = tool_result.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool stage finished"
        );

        if self.cancel.is_cancelled() {
            return cancelled();
        }

        let condensed = self
            .condenser
            .condense(tool_result.output_text(), prompt)
            .await;

        self.state = RunState::AwaitingFinalResponse;
        if self.cancel.is_cancelled() {
            return cancelled();
        }

        Prepared::Final(self.request(
            follow_up_prompt(prompt, &invocation.name, &condensed, run.tool_failed),
            self.settings.ollama.tool_request_timeout(),
        ))
    }

    /// Parse a directive and keep it only if it names a registered tool
    fn detect_tool(&self, text: &str, use_tools: bool, run: &RunContext) -> Option<ToolInvocation> {
        if !use_tools {
            return None;
        }
        let invocation = parse_tool_directive(text)?;
        if !self.registry.has_tool(&invocation.name) {
            tracing::warn!(
                target: "relay.orchestrator",
                run_id = %run.id,
                tool = %invocation.name,
                "model requested an unregistered tool, answering directly"
            );
            return None;
        }
        tracing::debug!(target: "relay.orchestrator", run_id = %run.id, tool = %invocation.name, "tool call detected");
        Some(invocation)
    }

    fn request(&self, prompt: String, timeout: Duration) -> GenerationRequest {
        let ollama = &self.settings.ollama;
        GenerationRequest::new(&ollama.model, prompt)
            .with_system(ollama.response_style.system_instruction())
            .with_options(GenerationOptions::from(ollama))
            .with_timeout(timeout)
    }

    fn finish_run(&mut self, mut run: RunContext, answer: String, outcome: RunOutcome) -> RunReport {
        run.timing.total = run.started.elapsed().max(run.timing.stage_sum());
        self.state = RunState::Done;
        self.last_timing = Some(run.timing);

        tracing::info!(
            target: "relay.orchestrator",
            run_id = %run.id,
            outcome = ?outcome,
            tool = run.tool_used.as_deref().unwrap_or("-"),
            total_ms = run.timing.total.as_millis() as u64,
            "run finished"
        );

        RunReport {
            run_id: run.id,
            answer,
            outcome,
            timing: run.timing,
            tool_used: run.tool_used,
        }
    }
}

fn cancelled() -> Prepared {
    Prepared::Answer {
        text: String::new(),
        outcome: RunOutcome::Cancelled,
    }
}

enum StreamPhase {
    /// Answer fully known; delivered as one fragment
    Ready { text: String, outcome: RunOutcome },
    Streaming {
        stream: FragmentStream,
        started: Instant,
    },
    Finished,
}

/// Pull-based answer stream for one run.
///
/// The cancel flag is checked before every pull. Once cancelled, the
/// stream ends and the run is reported as [`RunOutcome::Cancelled`] with
/// the text delivered so far. Dropping the stream before it ends concludes
/// the run the same way; call [`AnswerStream::finish`] to get the report.
pub struct AnswerStream<'a> {
    orchestrator: &'a mut Orchestrator,
    run: Option<RunContext>,
    phase: StreamPhase,
    emitted: String,
    report: Option<RunReport>,
}

impl AnswerStream<'_> {
    /// Next piece of answer text; `None` once the run is over
    pub async fn next(&mut self) -> Option<String> {
        loop {
            if matches!(self.phase, StreamPhase::Finished) {
                return None;
            }

            if self.orchestrator.cancel.is_cancelled() {
                self.stop_streaming();
                self.conclude(RunOutcome::Cancelled);
                return None;
            }

            match std::mem::replace(&mut self.phase, StreamPhase::Finished) {
                StreamPhase::Finished => return None,
                StreamPhase::Ready { text, outcome } => {
                    self.emitted.push_str(&text);
                    self.conclude(outcome);
                    return (!text.is_empty()).then_some(text);
                }
                StreamPhase::Streaming {
                    mut stream,
                    started,
                } => {
                    let Some(fragment) = stream.next().await else {
                        self.record_final(started);
                        self.conclude(RunOutcome::Completed);
                        return None;
                    };

                    if let Some(reason) = fragment.error() {
                        let reason = reason.to_string();
                        let message = self.failure_message(&reason);
                        tracing::warn!(target: "relay.orchestrator", reason = %reason, "final stream failed");
                        self.emitted.push_str(&message);
                        self.record_final(started);
                        self.conclude(RunOutcome::Failed(reason));
                        return Some(message);
                    }

                    let terminal = fragment.is_terminal();
                    let text = fragment.into_text();
                    self.emitted.push_str(&text);
                    if terminal {
                        self.record_final(started);
                        self.conclude(RunOutcome::Completed);
                    } else {
                        self.phase = StreamPhase::Streaming { stream, started };
                    }

                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
    }

    /// Drain anything left and return the run's report
    pub async fn finish(mut self) -> RunReport {
        while self.next().await.is_some() {}
        match self.report.take() {
            Some(report) => report,
            None => self.conclude_now(RunOutcome::Completed),
        }
    }

    /// Text delivered so far
    pub fn emitted(&self) -> &str {
        &self.emitted
    }

    /// Tool that ran before the final stage and how long it took.
    /// Only known until the run concludes; use the report afterwards.
    pub fn tool_used(&self) -> Option<(&str, Duration)> {
        let run = self.run.as_ref()?;
        Some((run.tool_used.as_deref()?, run.timing.tool?))
    }

    fn stop_streaming(&mut self) {
        if let StreamPhase::Streaming { started, .. } =
            std::mem::replace(&mut self.phase, StreamPhase::Finished)
        {
            self.record_final(started);
            if let Some(run) = &self.run {
                tracing::info!(target: "relay.orchestrator", run_id = %run.id, "stream cancelled by caller");
            }
        }
    }

    fn record_final(&mut self, started: Instant) {
        if let Some(run) = self.run.as_mut() {
            run.timing.final_answer = Some(started.elapsed());
        }
    }

    fn failure_message(&self, reason: &str) -> String {
        let message = match &self.run {
            Some(run) => run.final_failure_message(reason),
            None => format!("Error: {}", reason),
        };
        if self.emitted.is_empty() {
            message
        } else {
            format!("\n{}", message)
        }
    }

    /// Record the outcome once; later calls are ignored
    fn conclude(&mut self, outcome: RunOutcome) {
        if self.report.is_none() {
            let report = self.conclude_now(outcome);
            self.report = Some(report);
        }
    }

    fn conclude_now(&mut self, outcome: RunOutcome) -> RunReport {
        let run = self.run.take().unwrap_or_else(RunContext::new);
        self.orchestrator
            .finish_run(run, self.emitted.clone(), outcome)
    }
}

impl Drop for AnswerStream<'_> {
    fn drop(&mut self) {
        // Abandoned before the run concluded
        if self.run.is_some() {
            self.stop_streaming();
            self.conclude(RunOutcome::Cancelled);
        }
    }
}
