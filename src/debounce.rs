//! Caption debouncer
//!
//! Mutation bursts produce many snapshots per on-screen caption. The
//! debouncer keeps one piece of state, the last emitted text, and
//! collapses adjacent repeats into a single caption event.

use chrono::{DateTime, Utc};

/// One discrete caption, ready for translation
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionEvent {
    /// Non-empty trimmed caption text
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Monotonic per-debouncer sequence number, used to drop stale
    /// translation results
    pub seq: u64,
}

/// Collapses raw text snapshots into caption events. One instance per
/// pipeline; the state must never be shared across independently
/// observed subtitle surfaces.
#[derive(Debug, Default)]
pub struct CaptionDebouncer {
    last_emitted: Option<String>,
    next_seq: u64,
}

impl CaptionDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce one raw snapshot to a caption event, or `None` when it is
    /// an adjacent repeat (case- and whitespace-insensitive) or empty.
    /// Empty input leaves the suppression state untouched, so a caption
    /// blanking between two identical lines does not re-emit.
    pub fn reduce(&mut self, raw: &str) -> Option<CaptionEvent> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let normalized = normalize(trimmed);
        if self.last_emitted.as_deref() == Some(normalized.as_str()) {
            return None;
        }
        self.last_emitted = Some(normalized);

        let seq = self.next_seq;
        self.next_seq += 1;
        Some(CaptionEvent {
            text: trimmed.to_string(),
            timestamp: Utc::now(),
            seq,
        })
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
