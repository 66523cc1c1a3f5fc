//! Poll Driver: orchestrates one pass over all sessions known to the
//! key-value store, plus the session-id scan primitive it uses to find them.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::session;
use crate::state::{self, StateDocument};
use crate::store::KvStore;

const SESSION_INFO_PATTERN: &str = "session:*:info";
const SCAN_BATCH: usize = 1000;

/// Tally of what happened during one pass, for the summary log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassStats {
    pub sessions_scanned: usize,
    pub sessions_errored: usize,
}

/// Enumerate session identifiers by scanning `session:*:info` keys to
/// completion. `cursor == 0` both starts and (on return) ends the scan.
pub async fn scan_session_ids(store: &dyn KvStore) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut cursor = 0u64;
    loop {
        let (next_cursor, keys) = store.scan(cursor, SESSION_INFO_PATTERN, SCAN_BATCH).await?;
        for key in keys {
            if let Some(id) = decode_session_info_key(&key) {
                ids.push(id);
            }
        }
        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }
    Ok(ids)
}

/// Strip the `session:` prefix and `:info` suffix from a scanned key;
/// `None` if the result is empty or the key doesn't match the expected shape.
fn decode_session_info_key(key: &str) -> Option<String> {
    let id = key.strip_prefix("session:")?.strip_suffix(":info")?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Run one full pass: create destination/state directories, load state,
/// process every scanned session in order, then persist state.
pub async fn run_pass(store: &dyn KvStore, config: &Config, now: f64) -> Result<PassStats> {
    let dest_dir = Path::new(&config.dest_dir);
    let state_path = Path::new(&config.state_path);
    std::fs::create_dir_all(dest_dir)?;
    if let Some(parent) = state_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut doc: StateDocument = state::load(state_path);
    let session_ids = scan_session_ids(store).await?;

    let mut stats = PassStats {
        sessions_scanned: session_ids.len(),
        ..PassStats::default()
    };

    for session_id in &session_ids {
        if let Err(err) = session::process_session(
            store,
            &mut doc,
            session_id,
            dest_dir,
            now,
            config.missing_skip_seconds,
        )
        .await
        {
            stats.sessions_errored += 1;
            tracing::warn!(session = %session_id, error = %err, "session processing failed, continuing pass");
        }
    }

    state::save(state_path, &doc)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as CoreResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeStore {
        values: HashMap<String, String>,
        scan_pages: Mutex<Vec<(u64, Vec<String>)>>,
    }

    #[async_trait]
    impl KvStore for FakeStore {
        async fn scan(&self, cursor: u64, _pattern: &str, _count: usize) -> CoreResult<(u64, Vec<String>)> {
            let mut pages = self.scan_pages.lock().unwrap();
            if cursor == 0 && pages.is_empty() {
                return Ok((0, Vec::new()));
            }
            Ok(pages.remove(0))
        }

        async fn get(&self, key: &str) -> CoreResult<Option<String>> {
            Ok(self.values.get(key).cloned())
        }

        async fn mget(&self, keys: &[String]) -> CoreResult<Vec<Option<String>>> {
            Ok(keys.iter().map(|k| self.values.get(k).cloned()).collect())
        }
    }

    #[test]
    fn decodes_session_id_from_info_key() {
        assert_eq!(decode_session_info_key("session:abc-123:info"), Some("abc-123".to_string()));
        assert_eq!(decode_session_info_key("session::info"), None);
        assert_eq!(decode_session_info_key("garbage"), None);
    }

    #[tokio::test]
    async fn scan_session_ids_follows_cursor_until_zero() {
        let store = FakeStore {
            values: HashMap::new(),
            scan_pages: Mutex::new(vec![
                (7, vec!["session:a:info".to_string()]),
                (0, vec!["session:b:info".to_string(), "session::info".to_string()]),
            ]),
        };
        let ids = scan_session_ids(&store).await.unwrap();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn run_pass_journals_and_persists_state() {
        let mut values = HashMap::new();
        values.insert("session:s:seq".to_string(), "1".to_string());
        values.insert(
            "session:s:req:1:messages".to_string(),
            r#"[{"role":"user","content":"hi"}]"#.to_string(),
        );
        values.insert("session:s:req:1:response".to_string(), r#"{"choices":[{"message":{"content":"yo"}}]}"#.to_string());
        let store = FakeStore {
            values,
            scan_pages: Mutex::new(vec![(0, vec!["session:s:info".to_string()])]),
        };

        let dir = tempdir().unwrap();
        let config = Config {
            redis_url: "redis://unused".to_string(),
            poll_interval_seconds: 60,
            dest_dir: dir.path().join("session").to_string_lossy().to_string(),
            state_path: dir.path().join("state/state.json").to_string_lossy().to_string(),
            missing_skip_seconds: 300,
        };

        let stats = run_pass(&store, &config, 0.0).await.unwrap();
        assert_eq!(stats.sessions_scanned, 1);
        assert_eq!(stats.sessions_errored, 0);

        let loaded = state::load(Path::new(&config.state_path));
        assert_eq!(loaded.sessions["s"].cursor_seq, Some(1));

        let journal_path = dir.path().join("session").join("s.json");
        assert!(journal_path.exists());
    }
}
