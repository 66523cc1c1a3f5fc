//! Maps opaque session identifiers to filesystem-safe path segments.
//!
//! The sanitized form is used only for the on-disk journal filename; the
//! unsanitized identifier remains the semantic key everywhere else
//! (state document, key-value lookups).

/// Replace every character outside `[A-Za-z0-9_.:-]` with `_`, then collapse
/// the degenerate results `""`, `"."`, `".."` to `"unknown"`.
pub fn sanitize_session_id(id: &str) -> String {
    let sanitized: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match sanitized.as_str() {
        "" | "." | ".." => "unknown".to_string(),
        _ => sanitized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_safe_characters_untouched() {
        assert_eq!(sanitize_session_id("abc-123_DEF.ghi:jkl"), "abc-123_DEF.ghi:jkl");
    }

    #[test]
    fn replaces_unsafe_characters() {
        assert_eq!(sanitize_session_id("a/b\\c d"), "a_b_c_d");
    }

    #[test]
    fn collapses_degenerate_results() {
        assert_eq!(sanitize_session_id(""), "unknown");
        assert_eq!(sanitize_session_id("."), "unknown");
        assert_eq!(sanitize_session_id(".."), "unknown");
        assert_eq!(sanitize_session_id("///"), "unknown");
    }

    #[test]
    fn closure_property_holds_for_arbitrary_input() {
        let samples = [
            "normal_id",
            "has spaces and/slashes\\here",
            "日本語セッション",
            "..",
            "",
            "a..b",
            "CAPS-and-dots.more",
        ];
        for s in samples {
            let out = sanitize_session_id(s);
            assert!(!out.is_empty());
            assert_ne!(out, ".");
            assert_ne!(out, "..");
            assert!(out.chars().all(|c| c.is_ascii_alphanumeric()
                || matches!(c, '_' | '.' | ':' | '-')));
        }
    }
}
