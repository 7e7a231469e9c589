// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool registry and executor

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use crate::config::Settings;
use crate::error::{RelayError, Result};

use super::builtin;
use super::definition::{ToolDescriptor, ToolInvocation};
use super::ToolResult;

const USAGE_INSTRUCTIONS: &str = "To use a tool, respond with a JSON object in this exact format:\n\
{\"tool\": \"tool_name\", \"parameters\": {\"param1\": \"value1\", \"param2\": \"value2\"}}\n\n\
After receiving tool results, provide your final answer to the user.";

/// Registry of available tools, kept in registration order
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tools configured from settings
    pub fn with_defaults(settings: &Settings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(builtin::web_search::descriptor(&settings.search)?)?;
        Ok(registry)
    }

    /// Register a tool. Names are unique; re-registering is an error.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        let name = descriptor.name().to_string();
        if name.trim().is_empty() {
            return Err(RelayError::InvalidInput(
                "tool name must not be empty".to_string(),
            ));
        }
        if self.index.contains_key(&name) {
            return Err(RelayError::DuplicateTool(name));
        }

        tracing::debug!(target: "relay.tools", tool = %name, "registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Get a tool by exact name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render all tools for the system prompt. Empty when nothing is registered.
    pub fn describe_all(&self) -> String {
        if self.tools.is_empty() {
            return String::new();
        }

        let mut text = String::from("You have access to the following tools:\n\n");
        for tool in &self.tools {
            text.push_str(&tool.describe());
            text.push('\n');
        }
        text.push_str(USAGE_INSTRUCTIONS);
        text
    }

    /// Run a tool. Never fails: unknown tools, invalid parameters, handler
    /// errors and handler panics all come back as an error [`ToolResult`].
    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        let name = invocation.name.as_str();

        let Some(tool) = self.get(name) else {
            tracing::warn!(target: "relay.tools", tool = name, "unknown tool requested");
            return ToolResult::error(name, format!("Unknown tool: {}", name));
        };

        if let Err(reason) = tool.validate(&invocation.parameters) {
            tracing::warn!(target: "relay.tools", tool = name, %reason, "rejected parameters");
            return ToolResult::error(name, format!("Invalid parameters for {}: {}", name, reason));
        }

        let started = Instant::now();
        let outcome = AssertUnwindSafe(tool.handler().call(&invocation.parameters))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                tracing::debug!(
                    target: "relay.tools",
                    tool = name,
                    elapsed_ms,
                    chars = output.len(),
                    "tool succeeded"
                );
                ToolResult::success(name, output)
            }
            Ok(Err(error)) => {
                tracing::warn!(target: "relay.tools", tool = name, elapsed_ms, %error, "tool failed");
                ToolResult::error(name, error.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(target: "relay.tools", tool = name, %message, "tool panicked");
                ToolResult::error(name, format!("Tool '{}' panicked: {}", name, message))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
