//! Provider Extractors: pulls `(answer_text, tool_uses)` out of an
//! arbitrary response payload, across four provider wire formats, each in
//! both a single-JSON-object and an SSE-streaming shape.
//!
//! Provider payloads are untyped JSON from an external system; every field
//! access here is a checked accessor that returns `None` on shape mismatch
//! rather than panicking. Accumulators (`text_parts`, `tool_uses`) are
//! passed in explicitly so the "run all four on ambiguous input" fallback
//! in [`extract_llm_artifacts`] composes without re-entrant surprises.

pub mod claude;
pub mod gemini;
pub mod openai;
pub mod response_api;

use serde_json::Value;

use crate::sse::{self, SseRecord};

/// A model-initiated function call, as extracted from a response payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse {
    pub id: Option<String>,
    pub name: Option<String>,
    pub input: Option<Value>,
}

pub fn as_str(value: &Value) -> Option<&str> {
    value.as_str()
}

pub fn as_object(value: &Value) -> Option<&serde_json::Map<String, Value>> {
    value.as_object()
}

pub fn as_array(value: &Value) -> Option<&Vec<Value>> {
    value.as_array()
}

/// Append `value` to `parts` only if it is a non-empty string.
pub(crate) fn append_text(parts: &mut Vec<String>, value: Option<&Value>) {
    if let Some(Value::String(s)) = value {
        if !s.is_empty() {
            parts.push(s.clone());
        }
    }
}

/// Best-effort JSON-parse of a tool-call argument string; on failure, or if
/// the value isn't a string, the value is returned unchanged.
pub(crate) fn parse_tool_input(value: Option<&Value>) -> Option<Value> {
    match value {
        None => None,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(Value::String(s.clone()))
            } else {
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(parsed) => Some(parsed),
                    Err(_) => Some(Value::String(s.clone())),
                }
            }
        }
        Some(other) => Some(other.clone()),
    }
}

/// Canonical signature for deduplication: `{id, name, input}` with `input`
/// serialized using sorted object keys. First occurrence wins.
fn tool_use_signature(tool_use: &ToolUse) -> Option<String> {
    let input_json = match &tool_use.input {
        Some(v) => canonical_json(v),
        None => "null".to_string(),
    };
    let normalized = serde_json::json!({
        "id": tool_use.id,
        "name": tool_use.name,
        "input": input_json,
    });
    serde_json::to_string(&normalized).ok()
}

/// Serialize with object keys sorted, so structurally identical inputs with
/// different key order produce the same signature.
fn canonical_json(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut sorted = serde_json::Map::new();
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    sorted.insert(key.clone(), sort(&map[key]));
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    serde_json::to_string(&sort(value)).unwrap_or_else(|_| value.to_string())
}

/// Deduplicate tool uses by [`tool_use_signature`], preserving first-seen
/// order. Idempotent: running this twice yields the same list as once.
pub fn dedupe_tool_uses(tool_uses: Vec<ToolUse>) -> Vec<ToolUse> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::new();
    for tool_use in tool_uses {
        let Some(signature) = tool_use_signature(&tool_use) else {
            continue;
        };
        if seen.insert(signature) {
            deduped.push(tool_use);
        }
    }
    deduped
}

enum Format {
    Claude,
    OpenAi,
    ResponseApi,
    Gemini,
}

fn detect_sse_format(records: &[SseRecord]) -> Option<Format> {
    for record in records {
        let Some(data) = as_object(&record.data) else {
            continue;
        };
        if data.get("choices").and_then(Value::as_array).is_some() {
            return Some(Format::OpenAi);
        }
        if data.get("candidates").and_then(Value::as_array).is_some() {
            return Some(Format::Gemini);
        }
        if data.get("output").and_then(Value::as_array).is_some() {
            return Some(Format::ResponseApi);
        }
        if let Some(response_obj) = data.get("response").and_then(Value::as_object) {
            if response_obj.get("output").and_then(Value::as_array).is_some() {
                return Some(Format::ResponseApi);
            }
            if response_obj.get("candidates").and_then(Value::as_array).is_some() {
                return Some(Format::Gemini);
            }
        }
        if let Some(event_type) = data.get("type").and_then(Value::as_str) {
            if event_type.starts_with("response.") {
                return Some(Format::ResponseApi);
            }
            if matches!(
                event_type,
                "message_start"
                    | "message_stop"
                    | "content_block_start"
                    | "content_block_delta"
                    | "content_block_stop"
                    | "message_delta"
            ) {
                return Some(Format::Claude);
            }
        }
    }
    None
}

fn detect_json_format(payload: &Value) -> Option<Format> {
    let obj = as_object(payload)?;
    if obj.get("choices").and_then(Value::as_array).is_some() {
        return Some(Format::OpenAi);
    }
    if obj.get("output").and_then(Value::as_array).is_some() {
        return Some(Format::ResponseApi);
    }
    if obj.get("candidates").and_then(Value::as_array).is_some() {
        return Some(Format::Gemini);
    }
    if obj.get("content").and_then(Value::as_array).is_some() {
        return Some(Format::Claude);
    }
    if let Some(response_obj) = obj.get("response").and_then(Value::as_object) {
        if response_obj.get("output").and_then(Value::as_array).is_some() {
            return Some(Format::ResponseApi);
        }
        if response_obj.get("candidates").and_then(Value::as_array).is_some() {
            return Some(Format::Gemini);
        }
    }
    None
}

/// Top-level entry point: classify `response_text` as SSE or JSON, dispatch
/// to the matching provider extractor(s), and return the deduplicated
/// result. `answer_text` is `None` if the concatenated text is blank.
pub fn extract_llm_artifacts(response_text: &str) -> (Option<String>, Vec<ToolUse>) {
    let mut text_parts = Vec::new();
    let mut tool_uses = Vec::new();

    if sse::is_sse_text(response_text) {
        let records = sse::drop_done_sentinel(sse::parse_sse_data(response_text));
        match detect_sse_format(&records) {
            Some(Format::Claude) => claude::extract_from_stream(&records, &mut text_parts, &mut tool_uses),
            Some(Format::OpenAi) => openai::extract_from_stream(&records, &mut text_parts, &mut tool_uses),
            Some(Format::ResponseApi) => {
                response_api::extract_from_stream(&records, &mut text_parts, &mut tool_uses)
            }
            Some(Format::Gemini) => {
                for record in &records {
                    if let Some(obj) = record.data.as_object() {
                        gemini::extract_from_object(obj, &mut text_parts, &mut tool_uses);
                    }
                }
            }
            None => {
                claude::extract_from_stream(&records, &mut text_parts, &mut tool_uses);
                openai::extract_from_stream(&records, &mut text_parts, &mut tool_uses);
                response_api::extract_from_stream(&records, &mut text_parts, &mut tool_uses);
                for record in &records {
                    if let Some(obj) = record.data.as_object() {
                        gemini::extract_from_object(obj, &mut text_parts, &mut tool_uses);
                    }
                }
            }
        }
    } else {
        let Ok(parsed) = serde_json::from_str::<Value>(response_text) else {
            return (None, Vec::new());
        };
        let Some(obj) = as_object(&parsed) else {
            return (None, Vec::new());
        };
        let response_obj = obj.get("response").and_then(Value::as_object);
        match detect_json_format(&parsed) {
            Some(Format::Claude) => claude::extract_from_object(obj, &mut text_parts, &mut tool_uses),
            Some(Format::OpenAi) => openai::extract_from_object(obj, &mut text_parts, &mut tool_uses),
            Some(Format::ResponseApi) => {
                if let Some(response_obj) = response_obj {
                    response_api::extract_from_object(response_obj, &mut text_parts, &mut tool_uses);
                }
                response_api::extract_from_object(obj, &mut text_parts, &mut tool_uses);
            }
            Some(Format::Gemini) => {
                if let Some(response_obj) = response_obj {
                    gemini::extract_from_object(response_obj, &mut text_parts, &mut tool_uses);
                }
                gemini::extract_from_object(obj, &mut text_parts, &mut tool_uses);
            }
            None => {
                if let Some(response_obj) = response_obj {
                    response_api::extract_from_object(response_obj, &mut text_parts, &mut tool_uses);
                    gemini::extract_from_object(response_obj, &mut text_parts, &mut tool_uses);
                }
                claude::extract_from_object(obj, &mut text_parts, &mut tool_uses);
                openai::extract_from_object(obj, &mut text_parts, &mut tool_uses);
                response_api::extract_from_object(obj, &mut text_parts, &mut tool_uses);
                gemini::extract_from_object(obj, &mut text_parts, &mut tool_uses);
            }
        }
    }

    let tool_uses = dedupe_tool_uses(tool_uses);
    let answer_text = text_parts.concat();
    if answer_text.trim().is_empty() {
        (None, tool_uses)
    } else {
        (Some(answer_text), tool_uses)
    }
}

/// Render a tool-use's `input` as text: the `command` field if `input` is
/// an object carrying a non-empty string one, else the JSON-stringified
/// value.
pub fn tool_input_to_text(value: &Value) -> Option<String> {
    if let Some(obj) = value.as_object() {
        if let Some(command) = obj.get("command").and_then(Value::as_str) {
            if !command.trim().is_empty() {
                return Some(command.to_string());
            }
        }
    }
    normalize_value_to_text(value)
}

/// `null` maps to `None`; strings pass through; numbers/bools use their
/// native textual form; everything else is JSON-stringified.
pub fn normalize_value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => serde_json::to_string(other).ok(),
    }
}
