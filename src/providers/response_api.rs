//! OpenAI Response-API object and streaming extractors.

use serde_json::{Map, Value};

use super::{append_text, parse_tool_input, ToolUse};
use crate::sse::SseRecord;

pub fn extract_from_object(payload: &Map<String, Value>, text_parts: &mut Vec<String>, tool_uses: &mut Vec<ToolUse>) {
    let Some(output) = payload.get("output").and_then(Value::as_array) else {
        return;
    };
    for item in output {
        let Some(item) = item.as_object() else {
            continue;
        };
        let item_type = item.get("type").and_then(Value::as_str);
        if item_type == Some("message") {
            if let Some(content) = item.get("content").and_then(Value::as_array) {
                for part in content {
                    let Some(part) = part.as_object() else {
                        continue;
                    };
                    if matches!(part.get("type").and_then(Value::as_str), Some("output_text") | Some("text")) {
                        append_text(text_parts, part.get("text"));
                    }
                }
            }
        }
        if item_type == Some("output_text") {
            append_text(text_parts, item.get("text"));
        }
        if item_type == Some("function_call") {
            let arguments = item.get("arguments").or_else(|| item.get("input"));
            tool_uses.push(ToolUse {
                id: item.get("id").and_then(Value::as_str).map(str::to_string),
                name: item.get("name").and_then(Value::as_str).map(str::to_string),
                input: parse_tool_input(arguments),
            });
        }
    }
}

pub fn extract_from_stream(records: &[SseRecord], text_parts: &mut Vec<String>, tool_uses: &mut Vec<ToolUse>) {
    for record in records {
        let Some(data) = record.data.as_object() else {
            continue;
        };
        let event_type = data.get("type").and_then(Value::as_str).unwrap_or("");

        if event_type == "response.output_text.delta" {
            if let Some(delta) = data.get("delta").and_then(Value::as_object) {
                append_text(text_parts, delta.get("text"));
            }
        }
        if event_type == "response.output_item.added" {
            if let Some(item) = data.get("item").and_then(Value::as_object) {
                let wrapper = serde_json::json!({ "output": [Value::Object(item.clone())] });
                let wrapper = wrapper.as_object().expect("json! object literal is always a map");
                extract_from_object(wrapper, text_parts, tool_uses);
            }
        }
        if event_type.contains("function_call") {
            let name = data
                .get("name")
                .and_then(Value::as_str)
                .or_else(|| {
                    data.get("function")
                        .and_then(Value::as_object)
                        .and_then(|f| f.get("name"))
                        .and_then(Value::as_str)
                })
                .map(str::to_string);
            let args = data.get("arguments").cloned().or_else(|| {
                data.get("function")
                    .and_then(Value::as_object)
                    .and_then(|f| f.get("arguments"))
                    .cloned()
            });
            if name.is_some() || args.is_some() {
                tool_uses.push(ToolUse {
                    id: None,
                    name,
                    input: parse_tool_input(args.as_ref()),
                });
            }
        }
        if let Some(response_obj) = data.get("response").and_then(Value::as_object) {
            extract_from_object(response_obj, text_parts, tool_uses);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_extractor_collects_message_text_and_function_call() {
        let payload = serde_json::json!({
            "output": [
                {"type": "message", "content": [{"type": "output_text", "text": "hi"}]},
                {"type": "function_call", "id": "c1", "name": "sh", "arguments": "{\"command\":\"ls\"}"}
            ]
        });
        let mut text_parts = Vec::new();
        let mut tool_uses = Vec::new();
        extract_from_object(payload.as_object().unwrap(), &mut text_parts, &mut tool_uses);
        assert_eq!(text_parts, vec!["hi".to_string()]);
        assert_eq!(tool_uses[0].name.as_deref(), Some("sh"));
    }

    #[test]
    fn stream_reenters_object_extraction_for_output_item_added() {
        let records = vec![SseRecord {
            event: "message".into(),
            data: serde_json::json!({
                "type": "response.output_item.added",
                "item": {"type": "function_call", "name": "sh", "arguments": "{}"}
            }),
        }];
        let mut text_parts = Vec::new();
        let mut tool_uses = Vec::new();
        extract_from_stream(&records, &mut text_parts, &mut tool_uses);
        assert_eq!(tool_uses[0].name.as_deref(), Some("sh"));
    }

    #[test]
    fn stream_accumulates_delta_text() {
        let records = vec![SseRecord {
            event: "message".into(),
            data: serde_json::json!({
                "type": "response.output_text.delta",
                "delta": {"text": "partial"}
            }),
        }];
        let mut text_parts = Vec::new();
        let mut tool_uses = Vec::new();
        extract_from_stream(&records, &mut text_parts, &mut tool_uses);
        assert_eq!(text_parts.concat(), "partial");
    }
}
