// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::time::Duration;

/// Per-stage durations of one orchestration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTiming {
    /// Tool-detection call
    pub initial: Duration,
    /// Tool execution, when a tool ran
    pub tool: Option<Duration>,
    /// Final answer call, when one was made
    pub final_answer: Option<Duration>,
    /// Wall-clock time of the whole run; never less than the stage sum
    pub total: Duration,
}

impl StageTiming {
    /// Sum of the recorded stages
    pub fn stage_sum(&self) -> Duration {
        self.initial + self.tool.unwrap_or_default() + self.final_answer.unwrap_or_default()
    }

    pub fn used_tool(&self) -> bool {
        self.tool.is_some()
    }
}
