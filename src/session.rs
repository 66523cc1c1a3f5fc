//! Per-session processing: wires the cursor engine, the store, the
//! normalizer/extractors, and the journal writer together for one session
//! within a single pass.

use std::collections::HashSet;
use std::path::Path;

use crate::cursor::{self, AdvanceStep, SeqPayloads};
use crate::error::Result;
use crate::event::{Event, RawEvent};
use crate::journal;
use crate::normalize;
use crate::providers::{self, tool_input_to_text};
use crate::state::StateDocument;
use crate::store::KvStore;

/// Run §4.5's per-session algorithm for one session within one pass.
pub async fn process_session(
    store: &dyn KvStore,
    state: &mut StateDocument,
    session_id: &str,
    dest_dir: &Path,
    now: f64,
    skip_seconds: u64,
) -> Result<()> {
    let entry = state.entry(session_id);
    let mut current_cursor = cursor::cursor_seq(entry);
    cursor::prune_missing(entry, current_cursor, now, skip_seconds);

    let Some(seq_raw) = store.get(&format!("session:{session_id}:seq")).await? else {
        return Ok(());
    };
    let Ok(max_seq) = seq_raw.trim().parse::<u64>() else {
        return Ok(());
    };

    if current_cursor >= max_seq {
        cursor::commit_cursor(state.entry(session_id), current_cursor);
        return Ok(());
    }

    for seq in (current_cursor + 1)..=max_seq {
        let msg_key = format!("session:{session_id}:req:{seq}:messages");
        let rsp_key = format!("session:{session_id}:req:{seq}:response");
        let values = store.mget(&[msg_key, rsp_key]).await?;
        let payloads = SeqPayloads {
            messages: values.first().cloned().flatten(),
            response: values.get(1).cloned().flatten(),
        };

        let entry = state.entry(session_id);
        let step = cursor::advance_step(entry, seq, &payloads, now, skip_seconds);
        let (messages_ready, response_ready) = match step {
            AdvanceStep::Blocked => break,
            AdvanceStep::Advanced { messages_ready, response_ready } => (messages_ready, response_ready),
        };

        let mut raw_events = Vec::new();
        if messages_ready {
            if let Some(messages) = payloads.messages.as_deref() {
                raw_events.extend(extract_message_events(messages));
            }
        }
        if response_ready {
            if let Some(response) = payloads.response.as_deref() {
                raw_events.extend(extract_response_events(response));
            }
        }
        let events = journal::build_events(raw_events, Some(seq));
        journal::append_events(dest_dir, session_id, &events)?;

        current_cursor = seq;
    }

    let entry = state.entry(session_id);
    cursor::prune_missing(entry, current_cursor, now, skip_seconds);
    cursor::commit_cursor(entry, current_cursor);
    Ok(())
}

/// Malformed messages JSON contributes zero events but the channel still
/// counts as "ready" for cursor advancement (handled by the caller).
fn extract_message_events(raw_messages: &str) -> Vec<RawEvent> {
    match serde_json::from_str::<serde_json::Value>(raw_messages) {
        Ok(messages) => normalize::extract_events_from_messages(&messages),
        Err(_) => Vec::new(),
    }
}

fn extract_response_events(raw_response: &str) -> Vec<Event> {
    if raw_response.is_empty() {
        return Vec::new();
    }
    let (answer_text, tool_uses) = providers::extract_llm_artifacts(raw_response);

    let mut raw_events = Vec::new();
    let mut seen = HashSet::new();
    for tool_use in tool_uses {
        let text = tool_use.input.as_ref().and_then(tool_input_to_text);
        let combined = match (tool_use.name.as_deref(), text.as_deref()) {
            (Some(name), Some(text)) => Some(format!("{name}: {text}")),
            (Some(name), None) => Some(name.to_string()),
            (None, Some(text)) => Some(text.to_string()),
            (None, None) => None,
        };
        let Some(combined) = combined else { continue };
        if combined.trim().is_empty() || !seen.insert(combined.clone()) {
            continue;
        }
        raw_events.push(RawEvent::tool_io_input(combined));
    }

    // Stamp tool-input events here (they need no request sequence context
    // beyond what the caller already threads through `journal::build_events`),
    // then fold the answer in as the final raw event.
    if let Some(answer_text) = answer_text {
        raw_events.push(RawEvent::llm_answer(answer_text));
    }

    raw_events.into_iter().map(|raw| Event::build(raw, None)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateDocument;
    use crate::store::KvStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeStore {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl KvStore for FakeStore {
        async fn scan(&self, _cursor: u64, _pattern: &str, _count: usize) -> Result<(u64, Vec<String>)> {
            Ok((0, Vec::new()))
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
            let values = self.values.lock().unwrap();
            Ok(keys.iter().map(|k| values.get(k).cloned()).collect())
        }
    }

    #[tokio::test]
    async fn happy_path_openai_json_produces_expected_journal_lines() {
        let mut values = HashMap::new();
        values.insert("session:A:seq".to_string(), "1".to_string());
        values.insert(
            "session:A:req:1:messages".to_string(),
            r#"[{"role":"user","content":"hello"}]"#.to_string(),
        );
        values.insert(
            "session:A:req:1:response".to_string(),
            r#"{"choices":[{"message":{"content":"hi","tool_calls":[{"id":"t1","function":{"name":"sh","arguments":"{\"command\":\"ls\"}"}}]}}]}"#.to_string(),
        );
        let store = FakeStore { values: Mutex::new(values) };
        let mut state = StateDocument::empty();
        let dir = tempdir().unwrap();

        process_session(&store, &mut state, "A", dir.path(), 0.0, 300).await.unwrap();

        let contents = std::fs::read_to_string(journal::session_file_path(dir.path(), "A")).unwrap();
        let lines: Vec<serde_json::Value> = contents.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "user_input");
        assert_eq!(lines[0]["payload"]["text"], "hello");
        assert_eq!(lines[1]["type"], "tool_io");
        assert_eq!(lines[1]["payload"]["text"], "sh: ls");
        assert_eq!(lines[2]["type"], "llm_answer");
        assert_eq!(lines[2]["payload"]["text"], "hi");

        assert_eq!(state.entry("A").cursor_seq, Some(1));
    }

    #[tokio::test]
    async fn grace_window_skips_response_and_still_advances() {
        let mut values = HashMap::new();
        values.insert("session:B:seq".to_string(), "5".to_string());
        values.insert(
            "session:B:req:5:messages".to_string(),
            r#"[{"role":"user","content":"hi"}]"#.to_string(),
        );
        let store = FakeStore { values: Mutex::new(values) };
        let mut state = StateDocument::empty();
        state.entry("B").cursor_seq = Some(4);
        let dir = tempdir().unwrap();

        process_session(&store, &mut state, "B", dir.path(), 0.0, 300).await.unwrap();
        assert_eq!(state.entry("B").cursor_seq, Some(4));

        process_session(&store, &mut state, "B", dir.path(), 100.0, 300).await.unwrap();
        assert_eq!(state.entry("B").cursor_seq, Some(4));

        process_session(&store, &mut state, "B", dir.path(), 400.0, 300).await.unwrap();
        assert_eq!(state.entry("B").cursor_seq, Some(5));

        let contents = std::fs::read_to_string(journal::session_file_path(dir.path(), "B")).unwrap();
        let lines: Vec<serde_json::Value> = contents.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["type"], "user_input");
    }

    #[tokio::test]
    async fn absent_session_seq_leaves_cursor_untouched() {
        let store = FakeStore { values: Mutex::new(HashMap::new()) };
        let mut state = StateDocument::empty();
        let dir = tempdir().unwrap();
        process_session(&store, &mut state, "missing", dir.path(), 0.0, 300).await.unwrap();
        assert!(!journal::session_file_path(dir.path(), "missing").exists());
    }
}
