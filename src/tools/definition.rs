// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool definition types
//!
//! A [`ToolDescriptor`] couples a name and a parameter list with the handler
//! that does the work. Parameters are declared with a small builder:
//!
//! ```ignore
//! let tool = ToolDescriptor::from_fn("echo", "Repeat the input", |params| async move {
//!     Ok(params["text"].as_str().unwrap_or_default().to_string())
//! })
//! .string("text", "Text to repeat", true);
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::Result;

/// JSON type accepted for a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Integer,
    Boolean,
    /// Any JSON value
    Any,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Integer => "integer",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Any => "any",
        }
    }

    /// Strict type check; no coercion between kinds
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterKind::String => value.is_string(),
            ParameterKind::Integer => value.is_i64() || value.is_u64(),
            ParameterKind::Boolean => value.is_boolean(),
            ParameterKind::Any => true,
        }
    }
}

/// One named parameter of a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub description: String,
    pub kind: ParameterKind,
    pub required: bool,
}

/// A parsed request to run a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub parameters: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// String parameter by name
    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }
}

/// The callable side of a tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. Errors become a failed [`ToolResult`](super::ToolResult).
    async fn call(&self, parameters: &Map<String, Value>) -> Result<String>;
}

/// Adapts an async closure into a [`ToolHandler`]
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn call(&self, parameters: &Map<String, Value>) -> Result<String> {
        (self.0)(parameters.clone()).await
    }
}

/// A registered tool: name, description, parameters and handler
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Build a descriptor around an async closure
    pub fn from_fn<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self::new(name, description, FnHandler(f))
    }

    /// Add a parameter of any kind
    pub fn param(
        mut self,
        name: &str,
        description: &str,
        kind: ParameterKind,
        required: bool,
    ) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required,
        });
        self
    }

    /// Add a string parameter
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.param(name, description, ParameterKind::String, required)
    }

    /// Add an integer parameter
    pub fn integer(self, name: &str, description: &str, required: bool) -> Self {
        self.param(name, description, ParameterKind::Integer, required)
    }

    /// Add a boolean parameter
    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.param(name, description, ParameterKind::Boolean, required)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Check supplied parameters against the declared ones.
    ///
    /// Rejects missing required parameters, undeclared parameters and
    /// values of the wrong JSON type.
    pub fn validate(&self, supplied: &Map<String, Value>) -> std::result::Result<(), String> {
        for spec in &self.parameters {
            match supplied.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(format!("missing required parameter '{}'", spec.name));
                }
                Some(value) if !value.is_null() && !spec.kind.accepts(value) => {
                    return Err(format!(
                        "parameter '{}' must be of type {}",
                        spec.name,
                        spec.kind.as_str()
                    ));
                }
                _ => {}
            }
        }

        if let Some(unknown) = supplied
            .keys()
            .find(|key| !self.parameters.iter().any(|p| &p.name == *key))
        {
            return Err(format!("unknown parameter '{}'", unknown));
        }

        Ok(())
    }

    /// Render this tool for the prompt's tools block
    pub fn describe(&self) -> String {
        let mut text = format!("- {}: {}\n", self.name, self.description);
        if !self.parameters.is_empty() {
            text.push_str("  Parameters:\n");
            for p in &self.parameters {
                let requirement = if p.required { "required" } else { "optional" };
                text.push_str(&format!(
                    "    - {} ({}, {}): {}\n",
                    p.name,
                    p.kind.as_str(),
                    requirement,
                    p.description
                ));
            }
        }
        text
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn search_tool() -> ToolDescriptor {
        ToolDescriptor::from_fn("web_search", "Search the web", |_| async {
            Ok("ok".to_string())
        })
        .string("query", "The search query", true)
        .integer("max_results", "Number of results", false)
    }

    #[test]
    fn test_parameter_kind_accepts() {
        assert!(ParameterKind::String.accepts(&json!("x")));
        assert!(!ParameterKind::String.accepts(&json!(1)));
        assert!(ParameterKind::Integer.accepts(&json!(3)));
        assert!(!ParameterKind::Integer.accepts(&json!(3.5)));
        assert!(!ParameterKind::Integer.accepts(&json!("3")));
        assert!(ParameterKind::Boolean.accepts(&json!(true)));
        assert!(ParameterKind::Any.accepts(&json!([1, 2])));
    }

    #[test]
    fn test_validate_accepts_declared_parameters() {
        let tool = search_tool();
        assert!(tool.validate(&params(json!({"query": "rust"}))).is_ok());
        assert!(tool
            .validate(&params(json!({"query": "rust", "max_results": 2})))
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        let err = search_tool().validate(&Map::new()).unwrap_err();
        assert!(err.contains("query"));

        let err = search_tool()
            .validate(&params(json!({"query": null})))
            .unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn test_validate_rejects_wrong_kind() {
        let err = search_tool()
            .validate(&params(json!({"query": "rust", "max_results": "two"})))
            .unwrap_err();
        assert!(err.contains("integer"));
    }

    #[test]
    fn test_validate_rejects_unknown_parameter() {
        let err = search_tool()
            .validate(&params(json!({"query": "rust", "lang": "en"})))
            .unwrap_err();
        assert!(err.contains("lang"));
    }

    #[test]
    fn test_describe_lists_parameters() {
        let text = search_tool().describe();
        assert!(text.starts_with("- web_search: Search the web\n"));
        assert!(text.contains("    - query (string, required): The search query\n"));
        assert!(text.contains("    - max_results (integer, optional): Number of results\n"));
    }

    #[tokio::test]
    async fn test_fn_handler_receives_parameters() {
        let tool = ToolDescriptor::from_fn("echo", "Echo", |p| async move {
            Ok(p.get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string())
        });
        let out = tool
            .handler()
            .call(&params(json!({"text": "hi"})))
            .await
            .unwrap();
        assert_eq!(out, "hi");
    }
}
