// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Interaction orchestration
//!
//! This module sequences model calls and tool execution for one prompt:
//! - [`Orchestrator`] runs the detection, tool and final stages
//! - [`AnswerStream`] delivers the final answer fragment by fragment
//! - [`StageTiming`] records how long each stage took
//! - `display` formats timing and tool notices for the terminal

pub mod display;
pub mod orchestrator;
pub mod prompt;
pub mod timing;

pub use orchestrator::{AnswerStream, CancelHandle, Orchestrator, RunOutcome, RunReport, RunState};
pub use timing::StageTiming;
