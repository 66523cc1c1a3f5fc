//! Message Normalizer: turns a request-side messages array into canonical
//! `user_input` and `tool_io(output)` events.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::event::RawEvent;
use crate::providers::normalize_value_to_text;

// The `regex` crate guarantees linear-time matching and so supports no
// lookaround; splitting on "User:" blocks is done in two passes instead of
// the single lookahead-terminated pattern a backtracking engine could use.
static USER_BLOCK_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\r?\n)User:\s*\r?\n").unwrap());
static USER_BLOCK_STOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n(?:Assistant:|User:)").unwrap());

const SUPPRESSED_PREFIXES: [&str; 4] = [
    "# AGENTS.md instructions",
    "<environment_context>",
    "# System Instructions",
    "# Conversation",
];

/// True for already-whitespace-only or system-scaffolding text that should
/// never become a `user_input` event on its own.
fn should_ignore_user_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    SUPPRESSED_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix))
}

/// Split `text` into "User:"-prefixed blocks; empty if there are none. Each
/// block runs from just past its "User:" header to the next "Assistant:"/
/// "User:" header or end of text.
fn extract_user_lines(text: &str) -> Vec<String> {
    USER_BLOCK_START_RE
        .find_iter(text)
        .filter_map(|header| {
            let start = header.end();
            let end = USER_BLOCK_STOP_RE
                .find_at(text, start)
                .map(|stop| stop.start())
                .unwrap_or(text.len());
            let block = text[start..end].trim();
            (!block.is_empty()).then(|| block.to_string())
        })
        .collect()
}

/// Emit one `user_input` per "User:" block found in `text`, or a single one
/// for the whole text if no block matched and it isn't suppressed.
fn emit_user_text(events: &mut Vec<RawEvent>, text: &str) {
    let blocks = extract_user_lines(text);
    if !blocks.is_empty() {
        for block in blocks {
            events.push(RawEvent::user_input(block));
        }
    } else if !should_ignore_user_text(text) {
        events.push(RawEvent::user_input(text.to_string()));
    }
}

fn collect_text_parts(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::String(_) => Vec::new(),
        Value::Array(items) => {
            let mut parts = Vec::new();
            for item in items {
                match item {
                    Value::String(s) if !s.is_empty() => parts.push(s.clone()),
                    Value::Object(obj) => {
                        if let Some(Value::String(s)) = obj.get("text") {
                            if !s.is_empty() {
                                parts.push(s.clone());
                            }
                        }
                    }
                    _ => {}
                }
            }
            parts
        }
        Value::Object(obj) => match obj.get("text") {
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Collapse a `content`/`parts`-shaped value to a single text string,
/// falling back to JSON-stringifying it when no string fragments exist.
pub fn normalize_content_to_text(value: &Value) -> Option<String> {
    let parts = collect_text_parts(value);
    if !parts.is_empty() {
        Some(parts.concat())
    } else {
        normalize_value_to_text(value)
    }
}

/// Extract `user_input`/`tool_io(output)` events from a request's decoded
/// messages array, preserving array and within-message order.
pub fn extract_events_from_messages(messages: &Value) -> Vec<RawEvent> {
    let mut events = Vec::new();
    let Some(messages) = messages.as_array() else {
        return events;
    };

    for message in messages {
        let Some(message) = message.as_object() else {
            continue;
        };
        let role = message.get("role").and_then(Value::as_str);
        let content = message.get("content").or_else(|| message.get("parts"));

        if role == Some("user") {
            if let Some(content) = content {
                if let Some(text) = normalize_content_to_text(content) {
                    if !text.trim().is_empty() {
                        emit_user_text(&mut events, &text);
                    }
                }
            }
        }

        if message.get("type").and_then(Value::as_str) == Some("input_text") {
            if let Some(Value::String(text)) = message.get("text") {
                if !text.trim().is_empty() {
                    emit_user_text(&mut events, text);
                }
            }
        }

        if let Some(Value::Array(parts)) = content {
            for part in parts {
                let Some(part) = part.as_object() else {
                    continue;
                };
                if part.get("type").and_then(Value::as_str) == Some("tool_result") {
                    if let Some(text) = part.get("content").and_then(normalize_content_to_text) {
                        if !text.trim().is_empty() {
                            events.push(RawEvent::tool_io_output(text));
                        }
                    }
                }
            }
        }

        if role == Some("tool") {
            if let Some(text) = message.get("content").and_then(normalize_content_to_text) {
                if !text.trim().is_empty() {
                    events.push(RawEvent::tool_io_output(text));
                }
            }
        }

        if message.get("type").and_then(Value::as_str) == Some("function_call_output") {
            let output = message
                .get("output")
                .or_else(|| message.get("content"))
                .or_else(|| message.get("result"));
            if let Some(text) = output.and_then(normalize_content_to_text) {
                if !text.trim().is_empty() {
                    events.push(RawEvent::tool_io_output(text));
                }
            }
        }
    }

    events
}
