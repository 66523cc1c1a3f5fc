//! OpenAI chat-completion object and streaming extractors.

use serde_json::{Map, Value};

use super::{append_text, parse_tool_input, ToolUse};
use crate::sse::SseRecord;

pub fn extract_from_object(payload: &Map<String, Value>, text_parts: &mut Vec<String>, tool_uses: &mut Vec<ToolUse>) {
    let Some(choices) = payload.get("choices").and_then(Value::as_array) else {
        return;
    };
    for choice in choices {
        let Some(message) = choice.get("message").and_then(Value::as_object) else {
            continue;
        };
        append_text(text_parts, message.get("content"));
        let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) else {
            continue;
        };
        for tool_call in tool_calls {
            let Some(tool_call) = tool_call.as_object() else {
                continue;
            };
            let func = tool_call.get("function").and_then(Value::as_object);
            tool_uses.push(ToolUse {
                id: tool_call.get("id").and_then(Value::as_str).map(str::to_string),
                name: func
                    .and_then(|f| f.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                input: func.and_then(|f| parse_tool_input(f.get("arguments"))),
            });
        }
    }
}

struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    args: String,
}

pub fn extract_from_stream(records: &[SseRecord], text_parts: &mut Vec<String>, tool_uses: &mut Vec<ToolUse>) {
    let mut by_key: Vec<(String, PartialToolCall)> = Vec::new();

    for record in records {
        let Some(data) = record.data.as_object() else {
            continue;
        };
        let Some(choices) = data.get("choices").and_then(Value::as_array) else {
            continue;
        };
        for choice in choices {
            let Some(delta) = choice.get("delta").and_then(Value::as_object) else {
                continue;
            };
            append_text(text_parts, delta.get("content"));
            let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) else {
                continue;
            };
            for tool_call in tool_calls {
                let Some(tool_call) = tool_call.as_object() else {
                    continue;
                };
                let index = tool_call.get("index").and_then(Value::as_i64);
                let id_str = tool_call.get("id").and_then(Value::as_str);
                let key = match id_str {
                    Some(id) => id.to_string(),
                    None => format!("index:{}", index.unwrap_or(by_key.len() as i64)),
                };
                let func = tool_call.get("function").and_then(Value::as_object);
                let position = match by_key.iter().position(|(k, _)| k == &key) {
                    Some(position) => position,
                    None => {
                        by_key.push((
                            key.clone(),
                            PartialToolCall {
                                id: id_str.map(str::to_string),
                                name: None,
                                args: String::new(),
                            },
                        ));
                        by_key.len() - 1
                    }
                };
                let entry = &mut by_key[position].1;
                if let Some(name) = func.and_then(|f| f.get("name")).and_then(Value::as_str) {
                    entry.name = Some(name.to_string());
                }
                if let Some(args) = func.and_then(|f| f.get("arguments")).and_then(Value::as_str) {
                    entry.args.push_str(args);
                }
            }
        }
    }

    for (_, entry) in by_key {
        let input = if entry.args.is_empty() {
            None
        } else {
            parse_tool_input(Some(&Value::String(entry.args)))
        };
        tool_uses.push(ToolUse {
            id: entry.id,
            name: entry.name,
            input,
        });
    }
}
