//! Memory backends for parley.
//!
//! Every backend keeps a rolling list of timestamped notes per conversation
//! and hands the whole list back as one text blob.

pub mod noop;
pub mod in_memory;
pub mod file_backend;

use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use parley_config::MemoryConfig;
use parley_core::memory::MemoryBackend;

pub use noop::NoopMemory;
pub use in_memory::InMemoryBackend;
pub use file_backend::FileBackend;

/// Build the backend named in the configuration.
///
/// Unknown names fall back to the file backend.
pub fn build_from_config(config: &MemoryConfig) -> Arc<dyn MemoryBackend> {
    match config.backend.as_str() {
        "none" => Arc::new(NoopMemory),
        "in_memory" => Arc::new(InMemoryBackend::new(config.max_notes)),
        other => {
            if other != "file" {
                tracing::warn!(backend = other, "Unknown memory backend, using file");
            }
            Arc::new(FileBackend::new(config.resolved_dir(), config.max_notes))
        }
    }
}

/// Render one stored note line: `[<timestamp>] <note>`.
///
/// Timestamps are written in UTC+7, the timezone the notes are read in.
pub(crate) fn note_line(note: &str, at: DateTime<Utc>) -> String {
    let local = at.naive_utc() + Duration::hours(7);
    format!("[{}] {}", local.format("%A, %-d %B %Y %H:%M:%S"), note.trim())
}

/// Append `line` to `existing`, keeping at most `max_notes` non-blank lines.
pub(crate) fn roll_notes(existing: &str, line: String, max_notes: usize) -> String {
    let mut lines: Vec<&str> = existing.lines().filter(|l| !l.trim().is_empty()).collect();
    lines.push(&line);
    let keep = max_notes.max(1);
    if lines.len() > keep {
        lines.drain(..lines.len() - keep);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn note_line_uses_utc_plus_seven() {
        let at = Utc.with_ymd_and_hms(2024, 6, 30, 20, 15, 0).unwrap();
        let line = note_line("  <@42> likes cats ", at);
        assert_eq!(line, "[Monday, 1 July 2024 03:15:00] <@42> likes cats");
    }

    #[test]
    fn roll_keeps_newest_notes() {
        let existing = "a\nb\n\nc\n";
        let rolled = roll_notes(existing, "d".into(), 3);
        assert_eq!(rolled, "b\nc\nd\n");
    }

    #[test]
    fn roll_on_empty() {
        assert_eq!(roll_notes("", "first".into(), 30), "first\n");
    }

    #[test]
    fn build_selects_backend() {
        let mut config = MemoryConfig::default();
        config.backend = "none".into();
        assert_eq!(build_from_config(&config).name(), "none");
        config.backend = "in_memory".into();
        assert_eq!(build_from_config(&config).name(), "in_memory");
        config.backend = "file".into();
        assert_eq!(build_from_config(&config).name(), "file");
    }
}
