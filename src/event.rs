//! Canonical event shape appended to per-session journals.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// Event kind, before timestamp/sequence metadata is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserInput,
    ToolIo,
    LlmAnswer,
}

/// A `{type, payload}` pair produced by the normalizer or a provider
/// extractor, before it has been stamped with a timestamp and sequence.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub event_type: EventType,
    pub payload: Value,
}

impl RawEvent {
    pub fn user_input(text: impl Into<String>) -> Self {
        RawEvent {
            event_type: EventType::UserInput,
            payload: serde_json::json!({ "text": text.into() }),
        }
    }

    pub fn tool_io_input(text: impl Into<String>) -> Self {
        RawEvent {
            event_type: EventType::ToolIo,
            payload: serde_json::json!({ "phase": "input", "text": text.into() }),
        }
    }

    pub fn tool_io_output(text: impl Into<String>) -> Self {
        RawEvent {
            event_type: EventType::ToolIo,
            payload: serde_json::json!({ "phase": "output", "text": text.into() }),
        }
    }

    pub fn llm_answer(text: impl Into<String>) -> Self {
        RawEvent {
            event_type: EventType::LlmAnswer,
            payload: serde_json::json!({ "text": text.into() }),
        }
    }
}

/// One canonical record, as written to the journal.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub at: String,
    #[serde(rename = "requestSequence")]
    pub request_sequence: Option<u64>,
    pub payload: Value,
}

impl Event {
    /// Stamp a raw `{type, payload}` pair with the current wall-clock time
    /// and the request sequence it was derived from.
    pub fn build(raw: RawEvent, request_sequence: Option<u64>) -> Self {
        Event {
            event_type: raw.event_type,
            at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            request_sequence,
            payload: raw.payload,
        }
    }
}
