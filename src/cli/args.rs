// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for the relay.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::condense::CondenseStrategy;
use crate::config::Settings;

/// Relay - tool-calling answers from a local Ollama model
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(version, about = "Tool-calling answers from a local Ollama model")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (defaults to ~/.relay/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive session (default when no command given)
    Chat(ChatArgs),

    /// Ask a single question
    Ask(AskArgs),

    /// List models installed on the Ollama server
    Models,

    /// Check that the Ollama server is reachable
    Health,
}

/// Options shared by `ask` and `chat`
#[derive(clap::Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Answer without offering tools to the model
    #[arg(long)]
    pub no_tools: bool,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// How tool results are condensed (truncate, extractive, model-assisted)
    #[arg(long, value_name = "METHOD")]
    pub method: Option<CondenseStrategy>,

    /// Do not print stage timing after answers
    #[arg(long)]
    pub no_timing: bool,
}

impl RunArgs {
    /// Fold command-line overrides into the loaded settings
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(model) = &self.model {
            settings.ollama.model = model.clone();
        }
        if let Some(method) = self.method {
            settings.search.processing_method = method;
        }
        if self.no_stream {
            settings.ui.use_streaming = false;
        }
        if self.no_timing {
            settings.ui.show_timing = false;
        }
    }

    pub fn use_tools(&self) -> bool {
        !self.no_tools
    }
}

/// Arguments for the chat subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the ask subcommand
#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl AskArgs {
    /// Words of the question joined back together
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }
}
