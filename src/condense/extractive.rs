// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Query-aware sentence extraction

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::truncate::truncate;

/// Fragments this short are usually list numbers or abbreviations
const MIN_SENTENCE_CHARS: usize = 10;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence regex"));

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}']+").expect("valid word regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "did", "do",
    "does", "for", "from", "had", "has", "have", "how", "i", "if", "in", "into", "is", "it",
    "its", "me", "my", "of", "on", "or", "our", "s", "so", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "to", "was", "we", "were", "what", "when",
    "where", "which", "who", "why", "will", "with", "you", "your",
];

struct Sentence {
    position: usize,
    text: String,
    chars: usize,
    score: usize,
}

/// Pick the sentences sharing the most significant words with `query`,
/// within `budget` characters, in their original order.
///
/// Text within budget is returned unchanged. When no sentence fits, falls
/// back to [`truncate`].
pub fn extract(text: &str, query: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let query_terms = significant_terms(query);
    let mut sentences = split_sentences(text, &query_terms);

    // Highest score first, earlier sentence wins ties
    sentences.sort_by(|a, b| b.score.cmp(&a.score).then(a.position.cmp(&b.position)));

    let mut used = 0;
    let mut selected: Vec<&Sentence> = Vec::new();
    for sentence in &sentences {
        // "." after the first sentence, ". " joins every later one
        let cost = if selected.is_empty() {
            sentence.chars + 1
        } else {
            sentence.chars + 2
        };
        if used + cost <= budget {
            used += cost;
            selected.push(sentence);
        }
    }

    if selected.is_empty() {
        tracing::debug!(target: "relay.condense", budget, "no sentence fits, truncating");
        return truncate(text, budget);
    }

    selected.sort_by_key(|s| s.position);
    let body = selected
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(". ");
    format!("{}.", body)
}

fn split_sentences(text: &str, query_terms: &HashSet<String>) -> Vec<Sentence> {
    SENTENCE_END
        .split(text)
        .map(|raw| WHITESPACE.replace_all(raw.trim(), " ").into_owned())
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .enumerate()
        .map(|(position, text)| {
            let terms = significant_terms(&text);
            let score = query_terms.intersection(&terms).count();
            Sentence {
                position,
                chars: text.chars().count(),
                text,
                score,
            }
        })
        .collect()
}

/// Lower-cased words that are not stop words
fn significant_terms(text: &str) -> HashSet<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}
