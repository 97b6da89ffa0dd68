//! Shared utility functions used across multiple modules.

use std::sync::atomic::{AtomicI64, Ordering};

static LAST_TIMESTAMP_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// First `len` characters of `value`, used when logging or reporting identifiers.
pub fn text_prefix(value: &str, len: usize) -> String {
    value.chars().take(len).collect()
}

/// Current Unix timestamp in milliseconds, strictly increasing within the process.
///
/// Two calls in the same wall-clock millisecond get consecutive values.
pub fn next_timestamp_millis() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_TIMESTAMP_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_TIMESTAMP_MILLIS.compare_exchange_weak(
            last,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://randomuser.me"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("randomuser.me"));
    }

    #[test]
    fn text_prefix_counts_characters() {
        assert_eq!(text_prefix("0123456789", 8), "01234567");
        assert_eq!(text_prefix("äöü", 2), "äö");
        assert_eq!(text_prefix("ab", 8), "ab");
    }

    #[test]
    fn timestamps_strictly_increase() {
        let stamps: Vec<i64> = (0..1000).map(|_| next_timestamp_millis()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
