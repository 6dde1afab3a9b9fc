//! File-based memory backend — one plain-text notes file per conversation.
//!
//! Storage location: `<dir>/<conversation>.txt`, one `[<timestamp>] <note>`
//! line per note. The file is human-readable and editable by hand.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::error::MemoryError;
use parley_core::memory::{MemoryBackend, MemoryWriteOutcome};
use parley_core::message::ConversationId;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{note_line, roll_notes};

/// A file-backed notes store.
///
/// Reads go straight to disk so hand edits are picked up. Writes are
/// serialized so concurrent notes never clobber each other.
pub struct FileBackend {
    dir: PathBuf,
    max_notes: usize,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Create a backend storing notes under `dir`.
    ///
    /// The directory is created on first write.
    pub fn new(dir: PathBuf, max_notes: usize) -> Self {
        debug!(dir = %dir.display(), max_notes, "File memory backend ready");
        Self {
            dir,
            max_notes,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the notes file for a conversation.
    ///
    /// Anything outside `[A-Za-z0-9_-]` is replaced so an id can never
    /// escape the notes directory.
    pub fn path_for(&self, conversation_id: &ConversationId) -> PathBuf {
        let stem: String = conversation_id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{stem}.txt"))
    }

    async fn read_existing(&self, path: &PathBuf) -> Result<String, MemoryError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(MemoryError::Storage(format!("Failed to read memory file: {e}"))),
        }
    }
}

#[async_trait]
impl MemoryBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn read(&self, conversation_id: &ConversationId) -> Result<String, MemoryError> {
        self.read_existing(&self.path_for(conversation_id)).await
    }

    async fn write(
        &self,
        conversation_id: &ConversationId,
        note: &str,
    ) -> Result<MemoryWriteOutcome, MemoryError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(conversation_id);

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(error = %e, dir = %self.dir.display(), "Failed to create memory directory");
            return Ok(MemoryWriteOutcome::failed("Failed to save memory"));
        }

        let existing = match self.read_existing(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Failed to read existing notes");
                return Ok(MemoryWriteOutcome::failed("Failed to save memory"));
            }
        };

        let updated = roll_notes(&existing, note_line(note, Utc::now()), self.max_notes);
        if let Err(e) = tokio::fs::write(&path, updated).await {
            warn!(error = %e, path = %path.display(), "Failed to write memory file");
            return Ok(MemoryWriteOutcome::failed("Failed to save memory"));
        }

        debug!(conversation_id = %conversation_id, "Memory note saved");
        Ok(MemoryWriteOutcome::saved())
    }
}
