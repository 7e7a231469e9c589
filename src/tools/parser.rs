// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool directive parsing
//!
//! Finds a `{"tool": ..., "parameters": {...}}` object anywhere in model
//! output. Code fences need no special handling: the object inside a
//! ```json fence is found like a bare one.

use serde_json::{Map, Value};

use super::definition::ToolInvocation;

/// Extract the tool directive from model text, if there is one.
///
/// The first well-formed JSON object in the text decides. It is a directive
/// when it has a `tool` or `parameters` key and `tool` is a non-empty
/// string; a missing `parameters` means no parameters. Anything else,
/// including truncated JSON, means "no tool call".
pub fn parse_tool_directive(text: &str) -> Option<ToolInvocation> {
    let object = first_json_object(text)?;

    if !object.contains_key("tool") && !object.contains_key("parameters") {
        return None;
    }

    let name = object
        .get("tool")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    let parameters = match object.get("parameters") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return None,
    };

    Some(ToolInvocation::new(name, parameters))
}

/// First `{` position that starts a complete JSON object
fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    let mut offset = 0;
    while let Some(found) = text[offset..].find('{') {
        let start = offset + found;
        let mut objects =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<Map<String, Value>>();
        if let Some(Ok(object)) = objects.next() {
            return Some(object);
        }
        offset = start + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_directive() {
        let invocation =
            parse_tool_directive(r#"{"tool": "web_search", "parameters": {"query": "rust"}}"#)
                .unwrap();
        assert_eq!(invocation.name, "web_search");
        assert_eq!(invocation.str_param("query"), Some("rust"));
    }

    #[test]
    fn test_parse_fenced_directive() {
        let text = "Let me look that up.\n```json\n{\"tool\": \"web_search\", \"parameters\": {\"query\": \"today's top news\"}}\n```\n";
        let invocation = parse_tool_directive(text).unwrap();
        assert_eq!(invocation.name, "web_search");
        assert_eq!(invocation.str_param("query"), Some("today's top news"));
    }

    #[test]
    fn test_parse_directive_with_surrounding_prose() {
        let text = r#"I need current data. {"tool": "web_search", "parameters": {"query": "weather"}} Thanks!"#;
        assert_eq!(parse_tool_directive(text).unwrap().name, "web_search");
    }

    #[test]
    fn test_missing_parameters_defaults_to_empty() {
        let invocation = parse_tool_directive(r#"{"tool": "clock"}"#).unwrap();
        assert_eq!(invocation.name, "clock");
        assert!(invocation.parameters.is_empty());
    }

    #[test]
    fn test_plain_text_is_not_a_directive() {
        assert!(parse_tool_directive("2 + 2 = 4").is_none());
        assert!(parse_tool_directive("").is_none());
    }

    #[test]
    fn test_truncated_json_is_not_a_directive() {
        let text = r#"{"tool": "web_search", "parameters": {"query": "today's"#;
        assert!(parse_tool_directive(text).is_none());
    }

    #[test]
    fn test_unrelated_object_is_not_a_directive() {
        assert!(parse_tool_directive(r#"Here is data: {"name": "x", "value": 1}"#).is_none());
    }

    #[test]
    fn test_empty_or_non_string_tool_rejected() {
        assert!(parse_tool_directive(r#"{"tool": "", "parameters": {}}"#).is_none());
        assert!(parse_tool_directive(r#"{"tool": 42, "parameters": {}}"#).is_none());
        assert!(parse_tool_directive(r#"{"parameters": {"query": "x"}}"#).is_none());
    }

    #[test]
    fn test_non_object_parameters_rejected() {
        assert!(parse_tool_directive(r#"{"tool": "web_search", "parameters": "rust"}"#).is_none());
    }

    #[test]
    fn test_first_well_formed_object_wins() {
        let text = r#"{broken {"tool": "first", "parameters": {}} {"tool": "second"}"#;
        assert_eq!(parse_tool_directive(text).unwrap().name, "first");
    }

    #[test]
    fn test_leading_unrelated_object_hides_later_directive() {
        let text = r#"Data: {"name": "x"} then {"tool": "web_search", "parameters": {"query": "q"}}"#;
        assert!(parse_tool_directive(text).is_none());
    }

    #[test]
    fn test_nested_braces_in_values() {
        let text = r#"{"tool": "web_search", "parameters": {"query": "what is {x}?"}}"#;
        assert_eq!(
            parse_tool_directive(text).unwrap().str_param("query"),
            Some("what is {x}?")
        );
    }

    #[test]
    fn test_non_ascii_prefix() {
        let text = "Voilà — résumé: {\"tool\": \"web_search\", \"parameters\": {\"query\": \"café\"}}";
        assert_eq!(
            parse_tool_directive(text).unwrap().str_param("query"),
            Some("café")
        );
    }

    fn tool_name() -> impl Strategy<Value = String> {
        "[a-z][a-z_]{0,15}"
    }

    proptest! {
        #[test]
        fn prop_embedded_directive_is_extracted(
            name in tool_name(),
            query in "[a-zA-Z0-9 ?.,'-]{0,40}",
            prefix in "[a-zA-Z0-9 .,!?\n]{0,60}",
            suffix in "[a-zA-Z0-9 .,!?\n{}]{0,60}",
            fenced in any::<bool>(),
        ) {
            let directive = json!({"tool": name, "parameters": {"query": query}}).to_string();
            let body = if fenced {
                format!("```json\n{}\n```", directive)
            } else {
                directive
            };
            let text = format!("{}{}{}", prefix, body, suffix);

            let invocation = parse_tool_directive(&text).unwrap();
            prop_assert_eq!(invocation.name, name);
            prop_assert_eq!(invocation.parameters.get("query"), Some(&json!(query)));
        }

        #[test]
        fn prop_text_without_braces_has_no_directive(text in "[^{}]{0,200}") {
            prop_assert!(parse_tool_directive(&text).is_none());
        }
    }
}
