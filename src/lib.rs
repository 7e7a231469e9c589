// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Relay - tool-calling and streaming orchestration over a local Ollama endpoint.
//!
//! This crate exposes the runtime used by the `relay` CLI (`src/main.rs`).
//!
//! Architecture highlights:
//! - `chat`: the interaction orchestrator, run reports, stage timing
//! - `llm`: the `ModelBackend` abstraction, the Ollama transport, retries
//! - `tools`: tool registry, directive parsing, built-in web search
//! - `condense`: shrinking tool output before it re-enters a prompt
//! - `config`: persisted settings with environment overrides
//! - `cli`: the thin terminal shell

pub mod chat;
pub mod cli;
pub mod condense;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use error::{RelayError, Result};
