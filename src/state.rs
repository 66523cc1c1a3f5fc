//! State Store: atomic load/save of the aggregated session-state document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const STATE_VERSION: u64 = 1;

/// Per-session cursor and missing-channel bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionEntry {
    #[serde(default)]
    pub cursor_seq: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub missing: BTreeMap<String, f64>,
    #[serde(default)]
    pub last_msg_seq: Option<u64>,
    #[serde(default)]
    pub last_rsp_seq: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateDocument {
    pub version: u64,
    #[serde(default)]
    pub sessions: BTreeMap<String, SessionEntry>,
}

impl StateDocument {
    pub fn empty() -> Self {
        StateDocument {
            version: STATE_VERSION,
            sessions: BTreeMap::new(),
        }
    }

    pub fn entry(&mut self, session_id: &str) -> &mut SessionEntry {
        self.sessions.entry(session_id.to_string()).or_default()
    }
}

/// Read the state document at `path`. A missing file, a parse failure, or a
/// version mismatch all yield an empty document — never an error.
pub fn load(path: &Path) -> StateDocument {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return StateDocument::empty();
    };
    match serde_json::from_str::<StateDocument>(&contents) {
        Ok(doc) if doc.version == STATE_VERSION => doc,
        _ => StateDocument::empty(),
    }
}

/// Write `doc` to `path` via temp-then-rename.
pub fn save(path: &Path, doc: &StateDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path: PathBuf = {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    };
    let json = serde_json::to_string(doc).expect("StateDocument serialization is infallible");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
