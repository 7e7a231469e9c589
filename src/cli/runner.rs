// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Command implementations for the terminal shell

use std::future::Future;
use std::io::{self, Write};

use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::ExecutableCommand;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::task::JoinHandle;

use crate::chat::display::{format_model_list, format_timing, format_tool_usage};
use crate::chat::{CancelHandle, Orchestrator, RunReport};
use crate::config::Settings;
use crate::error::Result;
use crate::llm::OllamaTransport;

use super::args::{AskArgs, ChatArgs};

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "bye"];

/// One read at the chat prompt
#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Prompt(String),
    Skip,
    Exit,
}

/// Answer a single question and return its report
pub async fn run_ask(args: AskArgs, mut settings: Settings) -> Result<RunReport> {
    args.run.apply_to(&mut settings);
    settings.validate()?;

    let mut orchestrator = Orchestrator::from_settings(settings)?;
    let watcher = spawn_interrupt_watcher(orchestrator.cancel_handle());

    let mut stdout = io::stdout();
    let report = answer(
        &mut orchestrator,
        &mut stdout,
        &args.prompt_text(),
        args.run.use_tools(),
    )
    .await;

    watcher.abort();
    report
}

/// Line-based interactive session
pub async fn run_chat(args: ChatArgs, mut settings: Settings) -> Result<()> {
    args.run.apply_to(&mut settings);
    settings.validate()?;

    let use_tools = args.run.use_tools();
    let mut orchestrator = Orchestrator::from_settings(settings)?;

    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::DarkGrey))?;
    writeln!(
        stdout,
        "relay chat with {} (tools {}). Ctrl-C stops an answer; at the prompt it leaves, as does 'exit'.",
        orchestrator.settings().ollama.model,
        if use_tools { "on" } else { "off" }
    )?;
    stdout.execute(ResetColor)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.execute(SetForegroundColor(Color::Cyan))?;
        write!(stdout, "\n> ")?;
        stdout.execute(ResetColor)?;
        stdout.flush()?;

        let prompt = match read_input(&mut lines, interrupted()).await? {
            ChatInput::Prompt(prompt) => prompt,
            ChatInput::Skip => continue,
            ChatInput::Exit => {
                writeln!(stdout)?;
                break;
            }
        };

        // Ctrl-C belongs to the run only while it is in flight
        let watcher = spawn_interrupt_watcher(orchestrator.cancel_handle());
        let result = answer(&mut orchestrator, &mut stdout, &prompt, use_tools).await;
        watcher.abort();
        result?;
    }

    Ok(())
}

/// Wait for the next prompt line. An interrupt while waiting, end of
/// input or an exit command ends the session.
async fn read_input<R, I>(lines: &mut Lines<R>, interrupt: I) -> Result<ChatInput>
where
    R: AsyncBufRead + Unpin,
    I: Future<Output = ()>,
{
    let line = tokio::select! {
        biased;
        _ = interrupt => return Ok(ChatInput::Exit),
        line = lines.next_line() => line?,
    };

    let Some(line) = line else {
        return Ok(ChatInput::Exit);
    };
    let input = line.trim();
    Ok(if input.is_empty() {
        ChatInput::Skip
    } else if is_exit_command(input) {
        ChatInput::Exit
    } else {
        ChatInput::Prompt(input.to_string())
    })
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Print the models installed on the endpoint
pub async fn run_models(settings: &Settings) -> Result<()> {
    let transport = OllamaTransport::new(&settings.ollama, &settings.resilience)?;
    if !transport.health_check().await {
        print_unreachable(transport.base_url())?;
        transport.close();
        return Ok(());
    }

    println!("{}", format_model_list(&transport.list_models().await));
    transport.close();
    Ok(())
}

/// Report whether the endpoint is reachable and the configured model present
pub async fn run_health(settings: &Settings) -> Result<bool> {
    let transport = OllamaTransport::new(&settings.ollama, &settings.resilience)?;
    let mut stdout = io::stdout();

    if !transport.health_check().await {
        print_unreachable(transport.base_url())?;
        transport.close();
        return Ok(false);
    }

    stdout.execute(SetForegroundColor(Color::Green))?;
    writeln!(stdout, "Ollama is reachable at {}", transport.base_url())?;
    stdout.execute(ResetColor)?;

    let model = &settings.ollama.model;
    let healthy = transport.model_exists(model).await;
    if healthy {
        writeln!(stdout, "Model '{}' is installed", model)?;
    } else {
        stdout.execute(SetForegroundColor(Color::Yellow))?;
        writeln!(stdout, "Model '{}' is not installed. Run: ollama pull {}", model, model)?;
        stdout.execute(ResetColor)?;
    }

    transport.close();
    Ok(healthy)
}

/// Run one prompt and render it to `out`: tool notices, the answer
/// (streamed or whole, per settings) and the timing line.
pub async fn answer<W: Write>(
    orchestrator: &mut Orchestrator,
    out: &mut W,
    prompt: &str,
    use_tools: bool,
) -> Result<RunReport> {
    let streaming = orchestrator.settings().ui.use_streaming;
    let show_timing = orchestrator.settings().ui.show_timing;

    let report = if streaming {
        let mut stream = orchestrator.run_streamed(prompt, use_tools).await;
        if let Some((name, elapsed)) = stream.tool_used() {
            print_tool_notice(out, name, elapsed)?;
        }
        while let Some(fragment) = stream.next().await {
            write!(out, "{}", fragment)?;
            out.flush()?;
        }
        stream.finish().await
    } else {
        let report = orchestrator.run_once(prompt, use_tools).await;
        if let (Some(name), Some(elapsed)) = (&report.tool_used, report.timing.tool) {
            print_tool_notice(out, name, elapsed)?;
        }
        write!(out, "{}", report.answer)?;
        report
    };
    writeln!(out)?;

    if report.is_cancelled() {
        out.execute(SetForegroundColor(Color::Yellow))?;
        writeln!(out, "[Cancelled]")?;
        out.execute(ResetColor)?;
    }

    if show_timing {
        out.execute(SetForegroundColor(Color::DarkGrey))?;
        writeln!(out, "{}", format_timing(&report.timing))?;
        out.execute(ResetColor)?;
    }
    out.flush()?;

    Ok(report)
}

pub fn is_exit_command(input: &str) -> bool {
    EXIT_COMMANDS
        .iter()
        .any(|command| input.eq_ignore_ascii_case(command))
}

fn print_tool_notice<W: Write>(out: &mut W, name: &str, elapsed: std::time::Duration) -> Result<()> {
    out.execute(SetForegroundColor(Color::DarkGrey))?;
    writeln!(out, "{}", format_tool_usage(name, None))?;
    writeln!(out, "{}", format_tool_usage(name, Some(elapsed)))?;
    out.execute(ResetColor)?;
    Ok(())
}

fn print_unreachable(base_url: &str) -> Result<()> {
    let mut stderr = io::stderr();
    stderr.execute(SetForegroundColor(Color::Red))?;
    writeln!(stderr, "Cannot connect to Ollama at {}. Is it running?", base_url)?;
    stderr.execute(ResetColor)?;
    Ok(())
}

/// Turn Ctrl-C into a cancel request for the current run
fn spawn_interrupt_watcher(handle: CancelHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!(target: "relay.orchestrator", "interrupt received, cancelling run");
            handle.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::{CondenseStrategy, Condenser};
    use crate::llm::MockBackend;
    use crate::tools::{ToolDescriptor, ToolRegistry};
    use std::sync::Arc;

    fn orchestrator(backend: &MockBackend, streaming: bool) -> Orchestrator {
        let mut settings = Settings::default();
        settings.ui.use_streaming = streaming;

        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::from_fn("web_search", "Search the web", |_| async {
                    Ok("1. Result\n   Snippet text.".to_string())
                })
                .string("query", "The search query", true),
            )
            .unwrap();

        Orchestrator::new(
            settings,
            Arc::new(backend.clone()),
            registry,
            Condenser::new(CondenseStrategy::Truncate, 600),
        )
    }

    fn render(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    fn lines_of(input: &'static [u8]) -> Lines<BufReader<&'static [u8]>> {
        BufReader::new(input).lines()
    }

    #[test]
    fn test_exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("QUIT"));
        assert!(is_exit_command("bye"));
        assert!(!is_exit_command("exit now"));
    }

    #[tokio::test]
    async fn test_read_input_prompt() {
        let mut lines = lines_of(b"  hello there \n");
        let input = read_input(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(input, ChatInput::Prompt("hello there".to_string()));
    }

    #[tokio::test]
    async fn test_read_input_interrupt_at_idle_prompt_exits() {
        let mut lines = lines_of(b"hello\n");
        let input = read_input(&mut lines, std::future::ready(())).await.unwrap();
        assert_eq!(input, ChatInput::Exit);

        // The interrupt wins without consuming the buffered line
        let input = read_input(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(input, ChatInput::Prompt("hello".to_string()));
    }

    #[tokio::test]
    async fn test_read_input_exit_command_and_eof() {
        let mut lines = lines_of(b"quit\n");
        assert_eq!(
            read_input(&mut lines, std::future::pending()).await.unwrap(),
            ChatInput::Exit
        );
        assert_eq!(
            read_input(&mut lines, std::future::pending()).await.unwrap(),
            ChatInput::Exit
        );
    }

    #[tokio::test]
    async fn test_read_input_blank_line_skipped() {
        let mut lines = lines_of(b"   \nnext\n");
        assert_eq!(
            read_input(&mut lines, std::future::pending()).await.unwrap(),
            ChatInput::Skip
        );
        assert_eq!(
            read_input(&mut lines, std::future::pending()).await.unwrap(),
            ChatInput::Prompt("next".to_string())
        );
    }

    #[tokio::test]
    async fn test_answer_streams_direct_reply() {
        let backend = MockBackend::new().with_completion("Paris.");
        let mut orch = orchestrator(&backend, true);
        let mut out = Vec::new();

        let report = answer(&mut orch, &mut out, "Capital of France?", true)
            .await
            .unwrap();

        let text = render(out);
        assert!(report.is_completed());
        assert!(text.contains("Paris.\n"));
        assert!(text.contains("[Timing] Total:"));
        assert!(!text.contains("[Using tool"));
    }

    #[tokio::test]
    async fn test_answer_shows_tool_notices() {
        let backend = MockBackend::new().with_completions([
            r#"{"tool": "web_search", "parameters": {"query": "news"}}"#,
            "Here is the news.",
        ]);
        let mut orch = orchestrator(&backend, false);
        let mut out = Vec::new();

        let report = answer(&mut orch, &mut out, "News?", true).await.unwrap();

        let text = render(out);
        assert_eq!(report.answer, "Here is the news.");
        assert!(text.contains("[Using tool: web_search]"));
        assert!(text.contains("[Tool result retrieved in"));
        assert!(text.contains("[Timing] Initial:"));
    }

    #[tokio::test]
    async fn test_answer_without_timing() {
        let backend = MockBackend::new().with_completion("Hi.");
        let mut settings = Settings::default();
        settings.ui.show_timing = false;
        let mut orch = Orchestrator::new(
            settings,
            Arc::new(backend),
            ToolRegistry::new(),
            Condenser::new(CondenseStrategy::Truncate, 600),
        );
        let mut out = Vec::new();

        answer(&mut orch, &mut out, "Hello", false).await.unwrap();
        assert!(!render(out).contains("[Timing]"));
    }
}
