// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Relay - tool-calling answers from a local Ollama model
//!
//! Entry point for the relay CLI application.

use clap::Parser;

use ollama_relay::cli::runner;
use ollama_relay::cli::{ChatArgs, Cli, Commands};
use ollama_relay::config::Settings;
use ollama_relay::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` enables the relay's own diagnostics; `-vv` adds per-fragment detail.
    // `RUST_LOG` still takes precedence.
    if cli.verbose > 0 {
        let level = if cli.verbose > 1 { "trace" } else { "debug" };
        for target in [
            "relay.transport",
            "relay.retry",
            "relay.tools",
            "relay.condense",
            "relay.orchestrator",
        ] {
            if let Ok(parsed) = format!("{}={}", target, level).parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Load settings
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load_from(&Settings::default_path())?,
    };
    settings.apply_env_overrides();

    // Dispatch to appropriate command
    match cli.command {
        None => {
            runner::run_chat(ChatArgs::default(), settings).await?;
        }
        Some(Commands::Chat(args)) => {
            runner::run_chat(args, settings).await?;
        }
        Some(Commands::Ask(args)) => {
            let report = runner::run_ask(args, settings).await?;
            if report.is_failed() {
                std::process::exit(1);
            }
        }
        Some(Commands::Models) => {
            settings.validate()?;
            runner::run_models(&settings).await?;
        }
        Some(Commands::Health) => {
            settings.validate()?;
            if !runner::run_health(&settings).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
