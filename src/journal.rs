//! Event Builder & Journal Writer: wraps `RawEvent`s with timestamp and
//! sequence metadata and appends them as newline-delimited JSON to a
//! per-session file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::event::{Event, RawEvent};
use crate::error::Result;
use crate::path::sanitize_session_id;

pub fn session_file_path(dest_dir: &Path, session_id: &str) -> PathBuf {
    dest_dir.join(format!("{}.json", sanitize_session_id(session_id)))
}

/// Append `events` (already stamped) to the session's journal file. An
/// empty slice is a no-op; no file is created.
pub fn append_events(dest_dir: &Path, session_id: &str, events: &[Event]) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dest_dir)?;
    let path = session_file_path(dest_dir, session_id);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for event in events {
        let line = serde_json::to_string(event).expect("Event serialization is infallible");
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Stamp a batch of raw events with the given request sequence.
pub fn build_events(raw_events: Vec<RawEvent>, request_sequence: Option<u64>) -> Vec<Event> {
    raw_events
        .into_iter()
        .map(|raw| Event::build(raw, request_sequence))
        .collect()
}
