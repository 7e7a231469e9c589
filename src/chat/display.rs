// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Display formatting for the terminal shell
//!
//! Functions return formatted strings rather than writing directly to
//! stdout, making them easy to test.

use std::time::Duration;

use crate::llm::message::ModelInfo;

use super::timing::StageTiming;

/// Seconds with two decimals, e.g. `1.25s`
pub fn format_seconds(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// Timing line printed after an answer.
///
/// A run that went through every stage shows the breakdown; a direct
/// answer shows the total only.
pub fn format_timing(timing: &StageTiming) -> String {
    match (timing.tool, timing.final_answer) {
        (Some(tool), Some(final_answer)) => format!(
            "\n[Timing] Initial: {} | Tool: {} | Final: {} | Total: {}",
            format_seconds(timing.initial),
            format_seconds(tool),
            format_seconds(final_answer),
            format_seconds(timing.total)
        ),
        _ => format!("\n[Timing] Total: {}", format_seconds(timing.total)),
    }
}

/// Tool notice: the announcement before execution, or the elapsed time after
pub fn format_tool_usage(tool_name: &str, elapsed: Option<Duration>) -> String {
    match elapsed {
        Some(elapsed) => format!("[Tool result retrieved in {}]", format_seconds(elapsed)),
        None => format!("[Using tool: {}]", tool_name),
    }
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// One line per installed model
pub fn format_model_list(models: &[ModelInfo]) -> String {
    if models.is_empty() {
        return "No models installed. Pull one with 'ollama pull <model>'.".to_string();
    }
    let width = models.iter().map(|m| m.name.len()).max().unwrap_or(0);
    models
        .iter()
        .map(|model| {
            format!(
                "{:<width$}  {:>9}  {}",
                model.name,
                model.size.map(format_size).unwrap_or_else(|| "-".to_string()),
                model.modified.as_deref().unwrap_or("-"),
                width = width
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Duration::from_millis(1250)), "1.25s");
        assert_eq!(format_seconds(Duration::ZERO), "0.00s");
    }

    #[test]
    fn test_format_timing_direct_answer() {
        let timing = StageTiming {
            initial: Duration::from_millis(800),
            total: Duration::from_millis(810),
            ..Default::default()
        };
        assert_eq!(format_timing(&timing), "\n[Timing] Total: 0.81s");
    }

    #[test]
    fn test_format_timing_full_breakdown() {
        let timing = StageTiming {
            initial: Duration::from_millis(1000),
            tool: Some(Duration::from_millis(2500)),
            final_answer: Some(Duration::from_millis(3000)),
            total: Duration::from_millis(6520),
        };
        assert_eq!(
            format_timing(&timing),
            "\n[Timing] Initial: 1.00s | Tool: 2.50s | Final: 3.00s | Total: 6.52s"
        );
    }

    #[test]
    fn test_format_tool_usage() {
        assert_eq!(format_tool_usage("web_search", None), "[Using tool: web_search]");
        assert_eq!(
            format_tool_usage("web_search", Some(Duration::from_millis(1500))),
            "[Tool result retrieved in 1.50s]"
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(2_300_000_000), "2.1 GB");
    }

    #[test]
    fn test_format_model_list() {
        assert!(format_model_list(&[]).contains("ollama pull"));

        let models = vec![
            ModelInfo {
                name: "phi3:mini".to_string(),
                size: Some(2_300_000_000),
                modified: Some("2025-01-01".to_string()),
            },
            ModelInfo {
                name: "tinyllama:latest".to_string(),
                size: Some(640_000_000),
                modified: None,
            },
        ];
        let out = format_model_list(&models);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("phi3:mini         "));
        assert!(lines[1].contains("610.4 MB"));
        assert!(lines[1].ends_with('-'));
    }
}
