//! Session Cursor Engine: per-session incremental advancement with
//! missing-payload tolerance via a grace window.

use crate::state::SessionEntry;

/// Highest sequence whose events are committed, honoring the legacy
/// `last_msg_seq`/`last_rsp_seq` aliases when `cursor_seq` itself is absent.
pub fn cursor_seq(entry: &SessionEntry) -> u64 {
    if let Some(seq) = entry.cursor_seq {
        return seq;
    }
    entry.last_msg_seq.unwrap_or(0).max(entry.last_rsp_seq.unwrap_or(0))
}

fn parse_missing_key(key: &str) -> Option<(&'static str, u64)> {
    let (channel, seq_text) = key.split_once(':')?;
    let channel = match channel {
        "msg" => "msg",
        "rsp" => "rsp",
        _ => return None,
    };
    let seq: i64 = seq_text.parse().ok()?;
    if seq < 0 {
        return None;
    }
    Some((channel, seq as u64))
}

/// Drop `missing` entries that are malformed, at-or-before the cursor, or
/// older than `max(4G, 600)` seconds. Removes the map entirely once empty.
pub fn prune_missing(entry: &mut SessionEntry, cursor_seq: u64, now: f64, skip_seconds: u64) {
    let expire_before = now - (skip_seconds as f64 * 4.0).max(600.0);
    entry.missing.retain(|key, first_seen| match parse_missing_key(key) {
        None => false,
        Some((_, seq)) => seq > cursor_seq && *first_seen >= expire_before,
    });
}

fn missing_key(channel: &str, seq: u64) -> String {
    format!("{channel}:{seq}")
}

/// Record or check the first-seen time for an absent channel slot. Returns
/// whether it is skippable (first seen at least `skip_seconds` ago).
fn should_skip_missing(entry: &mut SessionEntry, channel: &str, seq: u64, now: f64, skip_seconds: u64) -> bool {
    let key = missing_key(channel, seq);
    match entry.missing.get(&key) {
        None => {
            entry.missing.insert(key, now);
            false
        }
        Some(&first_seen) => now - first_seen >= skip_seconds as f64,
    }
}

fn clear_missing(entry: &mut SessionEntry, channel: &str, seq: u64) {
    entry.missing.remove(&missing_key(channel, seq));
}

/// The two channel payloads read for one `(session, seq)` pair.
pub struct SeqPayloads {
    pub messages: Option<String>,
    pub response: Option<String>,
}

/// Outcome of attempting to advance the cursor through one `seq`.
pub enum AdvanceStep {
    /// Neither channel is ready or skippable; the loop must stop here.
    Blocked,
    /// Both channels resolved (present or grace-skipped); `seq` becomes the
    /// new cursor. Carries which channels were actually present, so the
    /// caller knows which to extract events from.
    Advanced { messages_ready: bool, response_ready: bool },
}

/// Apply one step of §4.5 rule 5 to `entry` for a single `seq`, given the
/// freshly read payloads. Does not advance `entry.cursor_seq` itself — the
/// caller does that once it has appended the derived events.
pub fn advance_step(entry: &mut SessionEntry, seq: u64, payloads: &SeqPayloads, now: f64, skip_seconds: u64) -> AdvanceStep {
    let messages_ready = payloads.messages.is_some();
    let response_ready = payloads.response.is_some();

    let messages_skipped = if messages_ready {
        clear_missing(entry, "msg", seq);
        false
    } else {
        should_skip_missing(entry, "msg", seq, now, skip_seconds)
    };

    let response_skipped = if response_ready {
        clear_missing(entry, "rsp", seq);
        false
    } else {
        should_skip_missing(entry, "rsp", seq, now, skip_seconds)
    };

    if (!messages_ready && !messages_skipped) || (!response_ready && !response_skipped) {
        return AdvanceStep::Blocked;
    }

    if !messages_ready {
        clear_missing(entry, "msg", seq);
    }
    if !response_ready {
        clear_missing(entry, "rsp", seq);
    }

    AdvanceStep::Advanced {
        messages_ready,
        response_ready,
    }
}

/// Write `cursor_seq` and the legacy aliases in one place, per §3.
pub fn commit_cursor(entry: &mut SessionEntry, new_cursor_seq: u64) {
    entry.cursor_seq = Some(new_cursor_seq);
    entry.last_msg_seq = Some(new_cursor_seq);
    entry.last_rsp_seq = Some(new_cursor_seq);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_seq_falls_back_to_max_of_legacy_aliases() {
        let entry = SessionEntry {
            cursor_seq: None,
            last_msg_seq: Some(3),
            last_rsp_seq: Some(7),
            ..Default::default()
        };
        assert_eq!(cursor_seq(&entry), 7);
    }

    #[test]
    fn cursor_seq_prefers_explicit_field() {
        let entry = SessionEntry {
            cursor_seq: Some(10),
            last_msg_seq: Some(99),
            last_rsp_seq: Some(99),
            ..Default::default()
        };
        assert_eq!(cursor_seq(&entry), 10);
    }

    #[test]
    fn prune_removes_stale_seq_le_cursor_and_malformed_entries() {
        let mut entry = SessionEntry::default();
        entry.missing.insert("msg:7".to_string(), 0.0);
        entry.missing.insert("rsp:11".to_string(), 0.0);
        entry.missing.insert("garbage".to_string(), 0.0);
        entry.missing.insert("rsp:12".to_string(), 950.0);

        let now = 1000.0;
        let g = 300;
        prune_missing(&mut entry, 10, now, g);

        assert_eq!(entry.missing.len(), 1);
        assert!(entry.missing.contains_key("rsp:12"));
    }

    #[test]
    fn grace_window_engages_then_skips() {
        let mut entry = SessionEntry::default();
        let g = 300;

        let payloads_absent = SeqPayloads { messages: Some("[]".into()), response: None };
        let step = advance_step(&mut entry, 5, &payloads_absent, 0.0, g);
        assert!(matches!(step, AdvanceStep::Blocked));
        assert_eq!(entry.missing.get("rsp:5"), Some(&0.0));

        let step = advance_step(&mut entry, 5, &payloads_absent, 100.0, g);
        assert!(matches!(step, AdvanceStep::Blocked));

        let step = advance_step(&mut entry, 5, &payloads_absent, 400.0, g);
        match step {
            AdvanceStep::Advanced { messages_ready, response_ready } => {
                assert!(messages_ready);
                assert!(!response_ready);
            }
            AdvanceStep::Blocked => panic!("expected the response channel to be skippable at t=400"),
        }
    }

    #[test]
    fn both_channels_present_advances_immediately() {
        let mut entry = SessionEntry::default();
        let payloads = SeqPayloads { messages: Some("[]".into()), response: Some("{}".into()) };
        let step = advance_step(&mut entry, 1, &payloads, 0.0, 300);
        assert!(matches!(
            step,
            AdvanceStep::Advanced { messages_ready: true, response_ready: true }
        ));
        assert!(entry.missing.is_empty());
    }

    #[test]
    fn commit_cursor_writes_legacy_aliases() {
        let mut entry = SessionEntry::default();
        commit_cursor(&mut entry, 9);
        assert_eq!(entry.cursor_seq, Some(9));
        assert_eq!(entry.last_msg_seq, Some(9));
        assert_eq!(entry.last_rsp_seq, Some(9));
    }
}
