//! Claude object and streaming extractors.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{append_text, parse_tool_input, ToolUse};
use crate::sse::SseRecord;

pub fn extract_from_object(payload: &Map<String, Value>, text_parts: &mut Vec<String>, tool_uses: &mut Vec<ToolUse>) {
    match payload.get("content").and_then(Value::as_array) {
        Some(blocks) => {
            for block in blocks {
                let Some(block) = block.as_object() else {
                    continue;
                };
                match block.get("type").and_then(Value::as_str) {
                    Some("text") => append_text(text_parts, block.get("text")),
                    Some("tool_use") => tool_uses.push(ToolUse {
                        id: block.get("id").and_then(Value::as_str).map(str::to_string),
                        name: block.get("name").and_then(Value::as_str).map(str::to_string),
                        input: block.get("input").cloned(),
                    }),
                    _ => {}
                }
            }
        }
        None => append_text(text_parts, payload.get("content")),
    }
}

struct PartialToolUse {
    id: Option<String>,
    name: Option<String>,
    input: Option<Value>,
    input_json: Option<String>,
}

pub fn extract_from_stream(records: &[SseRecord], text_parts: &mut Vec<String>, tool_uses: &mut Vec<ToolUse>) {
    let mut by_index: BTreeMap<i64, PartialToolUse> = BTreeMap::new();

    for record in records {
        let Some(data) = record.data.as_object() else {
            continue;
        };
        match data.get("type").and_then(Value::as_str) {
            Some("content_block_start") => {
                let Some(block) = data.get("content_block").and_then(Value::as_object) else {
                    continue;
                };
                if block.get("type").and_then(Value::as_str) != Some("tool_use") {
                    continue;
                }
                let tool_use = PartialToolUse {
                    id: block.get("id").and_then(Value::as_str).map(str::to_string),
                    name: block.get("name").and_then(Value::as_str).map(str::to_string),
                    input: block.get("input").cloned(),
                    input_json: None,
                };
                match data.get("index").and_then(Value::as_i64) {
                    Some(index) => {
                        by_index.insert(index, tool_use);
                    }
                    None => tool_uses.push(ToolUse {
                        id: tool_use.id,
                        name: tool_use.name,
                        input: tool_use.input,
                    }),
                }
            }
            Some("content_block_delta") => {
                let Some(delta) = data.get("delta").and_then(Value::as_object) else {
                    continue;
                };
                match delta.get("type").and_then(Value::as_str) {
                    Some("text_delta") => append_text(text_parts, delta.get("text")),
                    Some("input_json_delta") => {
                        let Some(index) = data.get("index").and_then(Value::as_i64) else {
                            continue;
                        };
                        let Some(partial) = delta.get("partial_json").and_then(Value::as_str) else {
                            continue;
                        };
                        let entry = by_index.entry(index).or_insert(PartialToolUse {
                            id: None,
                            name: None,
                            input: None,
                            input_json: None,
                        });
                        let buffer = entry.input_json.get_or_insert_with(String::new);
                        buffer.push_str(partial);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    for (_, mut entry) in by_index {
        if entry.input.is_none() {
            if let Some(input_json) = entry.input_json.take() {
                if !input_json.is_empty() {
                    entry.input = parse_tool_input(Some(&Value::String(input_json)));
                }
            }
        }
        tool_uses.push(ToolUse {
            id: entry.id,
            name: entry.name,
            input: entry.input,
        });
    }
}
