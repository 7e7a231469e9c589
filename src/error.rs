// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for the relay
//!
//! Transport failures are classified with [`ApiError`] and then folded into
//! structured results by the transport; they only surface as [`RelayError`]
//! on configuration and startup paths.

use thiserror::Error;

/// Main error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Tool execution errors raised by a handler
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    /// A tool with this name is already registered
    #[error("Tool '{0}' already registered")]
    DuplicateTool(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure classes reported by the inference endpoint transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Connection refused, DNS failure, reset
    #[error("{0}")]
    Network(String),

    /// No response within the request timeout
    #[error("Request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// Requested model is not installed on the endpoint
    #[error(
        "Model '{0}' not found. Run 'ollama list' to see installed models or pull the model with: ollama pull {0}"
    )]
    ModelNotFound(String),

    /// Endpoint answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Connection failed after the stream had started
    #[error("Streaming error: {0}")]
    StreamError(String),
}

impl ApiError {
    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ServerError { status, .. } => Some(*status),
            ApiError::ModelNotFound(_) => Some(404),
            _ => None,
        }
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
