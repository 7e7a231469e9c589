// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

const ELLIPSIS: &str = "...";

/// Cut `text` to at most `budget` characters, breaking on a word boundary
/// and marking the cut with an ellipsis. Text within budget is returned as is.
pub fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    if budget <= ELLIPSIS.len() {
        return text.chars().take(budget).collect();
    }

    let limit = budget - ELLIPSIS.len();
    let head: String = text.chars().take(limit).collect();
    let cut_on_space = text.chars().nth(limit).is_some_and(char::is_whitespace);

    let kept = if cut_on_space {
        head.as_str()
    } else {
        match head.rfind(char::is_whitespace) {
            Some(pos) if pos > 0 => &head[..pos],
            _ => head.as_str(),
        }
    };

    format!("{}{}", kept.trim_end(), ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate("hello world", 20), "hello world");
        assert_eq!(truncate("exactly", 7), "exactly");
    }

    #[test]
    fn test_breaks_on_word_boundary() {
        let out = truncate("the quick brown fox jumps", 15);
        assert_eq!(out, "the quick...");
        assert!(out.chars().count() <= 15);
    }

    #[test]
    fn test_cut_exactly_before_space() {
        // first 12 chars end a word and the next char is a space
        assert_eq!(truncate("the quick br own", 15), "the quick br...");
    }

    #[test]
    fn test_single_long_word_is_hard_cut() {
        let out = truncate("abcdefghijklmnopqrstuvwxyz", 10);
        assert_eq!(out, "abcdefg...");
    }

    #[test]
    fn test_tiny_budget() {
        assert_eq!(truncate("abcdef", 2), "ab");
        assert_eq!(truncate("abcdef", 0), "");
    }

    #[test]
    fn test_multibyte_counts_chars() {
        let text = "café ".repeat(20);
        let out = truncate(&text, 12);
        assert!(out.chars().count() <= 12);
        assert!(out.ends_with("..."));
    }
}
