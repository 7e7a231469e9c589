// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Prompt builders for the two model calls of a run

const TOOL_GUIDANCE: &str = "Only use a tool when the question needs current or external \
information you do not have. In that case reply with the JSON tool call and nothing else. \
Otherwise answer the user directly.";

const FINAL_INSTRUCTION: &str =
    "Now provide your final answer to the user based on the tool results:";

/// Prompt for the tool-detection call. Without a tools block the user's
/// prompt is sent as is.
pub fn initial_prompt(prompt: &str, tools_block: Option<&str>) -> String {
    match tools_block.filter(|block| !block.is_empty()) {
        Some(block) => format!(
            "{}\n\n{}\n\nUser: {}\n\nAssistant:",
            block, TOOL_GUIDANCE, prompt
        ),
        None => prompt.to_string(),
    }
}

/// Prompt for the final call, carrying the condensed tool output.
/// A failed tool is reported as such so the model can explain it.
pub fn follow_up_prompt(prompt: &str, tool_name: &str, tool_output: &str, tool_failed: bool) -> String {
    let result = if tool_failed {
        format!("Tool execution error: {}", tool_output)
    } else {
        tool_output.to_string()
    };

    format!(
        "User: {}\n\nTool Result ({}):\n{}\n\n{}",
        prompt, tool_name, result, FINAL_INSTRUCTION
    )
}
