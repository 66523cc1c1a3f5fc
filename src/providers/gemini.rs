//! Gemini object extractor. Gemini has no distinct streaming event shape in
//! this system — SSE chunks carry the same candidate/content/parts object
//! as the non-streaming response, so the stream path reuses this function
//! per-event (see `providers::extract_llm_artifacts`).

use serde_json::{Map, Value};

use super::{append_text, ToolUse};

pub fn extract_from_object(payload: &Map<String, Value>, text_parts: &mut Vec<String>, tool_uses: &mut Vec<ToolUse>) {
    let Some(candidates) = payload.get("candidates").and_then(Value::as_array) else {
        return;
    };
    for candidate in candidates {
        let Some(candidate) = candidate.as_object() else {
            continue;
        };
        let Some(parts) = candidate
            .get("content")
            .and_then(Value::as_object)
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)
        else {
            continue;
        };
        for part in parts {
            let Some(part) = part.as_object() else {
                continue;
            };
            append_text(text_parts, part.get("text"));
            if let Some(function_call) = part.get("functionCall").and_then(Value::as_object) {
                let input = function_call
                    .get("args")
                    .or_else(|| function_call.get("arguments"))
                    .cloned();
                tool_uses.push(ToolUse {
                    id: None,
                    name: function_call.get("name").and_then(Value::as_str).map(str::to_string),
                    input,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_and_function_call_from_parts() {
        let payload = serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "hi"},
                    {"functionCall": {"name": "lookup", "args": {"q": "x"}}}
                ]}
            }]
        });
        let mut text_parts = Vec::new();
        let mut tool_uses = Vec::new();
        extract_from_object(payload.as_object().unwrap(), &mut text_parts, &mut tool_uses);
        assert_eq!(text_parts, vec!["hi".to_string()]);
        assert_eq!(tool_uses[0].name.as_deref(), Some("lookup"));
        assert_eq!(tool_uses[0].input, Some(serde_json::json!({"q": "x"})));
    }
}
