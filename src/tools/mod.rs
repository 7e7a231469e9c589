// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool system for the relay
//!
//! Tools are plain async handlers registered under a unique name. The model
//! asks for one by embedding a JSON directive in its reply, e.g.
//! `{"tool": "web_search", "parameters": {"query": "..."}}`, which
//! [`parse_tool_directive`] extracts and [`ToolRegistry::execute`] runs.

pub mod builtin;
pub mod definition;
pub mod parser;
pub mod registry;

pub use definition::*;
pub use parser::parse_tool_directive;
pub use registry::ToolRegistry;

/// Result of executing a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// The tool that produced this result
    pub tool_name: String,
    /// The output of the tool
    pub output: ToolOutput,
}

/// Output from a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// Successful output
    Success(String),
    /// Error output
    Error(String),
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            output: ToolOutput::Success(output.into()),
        }
    }

    /// Create an error result
    pub fn error(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            output: ToolOutput::Error(error.into()),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self.output, ToolOutput::Error(_))
    }

    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    /// The error message, if the tool failed
    pub fn error_message(&self) -> Option<&str> {
        match &self.output {
            ToolOutput::Success(_) => None,
            ToolOutput::Error(e) => Some(e),
        }
    }

    /// Get the output text (the error message for failures)
    pub fn output_text(&self) -> &str {
        match &self.output {
            ToolOutput::Success(s) => s,
            ToolOutput::Error(e) => e,
        }
    }
}
