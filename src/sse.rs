//! Streaming Event Parser: turns an SSE byte stream into `{event, data}`
//! records, and the detector that decides whether a body is SSE at all.

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct SseRecord {
    pub event: String,
    pub data: Value,
}

/// True if the first non-empty, non-comment line begins with `event:` or
/// `data:`.
pub fn is_sse_text(text: &str) -> bool {
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with(':') {
            continue;
        }
        return trimmed.starts_with("event:") || trimmed.starts_with("data:");
    }
    false
}

/// Parse an SSE body into an ordered sequence of records. A record whose
/// accumulated `data` lines parse as JSON carries that value; otherwise the
/// joined raw string is kept.
pub fn parse_sse_data(text: &str) -> Vec<SseRecord> {
    let mut records = Vec::new();
    let mut event_name = String::new();
    let mut data_lines: Vec<&str> = Vec::new();

    let mut flush = |event_name: &mut String, data_lines: &mut Vec<&str>, records: &mut Vec<SseRecord>| {
        if data_lines.is_empty() {
            event_name.clear();
            return;
        }
        let joined = data_lines.join("\n");
        let data = serde_json::from_str::<Value>(&joined).unwrap_or(Value::String(joined));
        let name = if event_name.is_empty() {
            "message".to_string()
        } else {
            std::mem::take(event_name)
        };
        records.push(SseRecord { event: name, data });
        data_lines.clear();
    };

    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() {
            flush(&mut event_name, &mut data_lines, &mut records);
            continue;
        }
        if let Some(rest) = line.strip_prefix(':') {
            let _ = rest;
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event_name = rest.trim().to_string();
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            let value = rest.strip_prefix(' ').unwrap_or(rest);
            data_lines.push(value);
        }
    }
    flush(&mut event_name, &mut data_lines, &mut records);
    records
}

/// Drop records whose `data` is the literal sentinel string `[DONE]`.
pub fn drop_done_sentinel(records: Vec<SseRecord>) -> Vec<SseRecord> {
    records
        .into_iter()
        .filter(|r| !matches!(&r.data, Value::String(s) if s.trim() == "[DONE]"))
        .collect()
}
