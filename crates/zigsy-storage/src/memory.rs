//! Persistent memory store.
//!
//! Holds the small ledger of facts the assistant keeps about its user and
//! writes it through to a JSON file on every mutation. The file is written
//! before the in-memory record changes, so a failed write leaves both sides
//! as they were.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use zigsy_core::error::{Result, ZigsyError};

/// Durable facts about the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryRecord {
    /// Topics the user struggled with. Insertion ordered, no duplicates.
    pub confusion_points: Vec<String>,
    pub user_name: Option<String>,
    /// Notes from "remember that ..." in the order they were given.
    pub user_notes: Vec<String>,
}

impl MemoryRecord {
    pub fn is_empty(&self) -> bool {
        self.confusion_points.is_empty() && self.user_notes.is_empty()
    }
}

/// Write-through store around a [`MemoryRecord`].
pub struct MemoryStore {
    path: PathBuf,
    record: Mutex<MemoryRecord>,
}

impl MemoryStore {
    /// Load the record from `path`, or start empty if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let record = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let record: MemoryRecord = serde_json::from_str(&content)?;
            info!(
                path = %path.display(),
                notes = record.user_notes.len(),
                topics = record.confusion_points.len(),
                "Memory loaded"
            );
            record
        } else {
            info!(path = %path.display(), "No memory file yet, starting empty");
            MemoryRecord::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            record: Mutex::new(record),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current record.
    pub fn snapshot(&self) -> MemoryRecord {
        match self.record.lock() {
            Ok(record) => record.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Append a note unless an identical one is already stored.
    ///
    /// Returns `true` if the record changed.
    pub async fn add_note(self: &Arc<Self>, note: &str) -> Result<bool> {
        let note = note.trim().to_string();
        self.mutate_blocking(move |record| {
            if record.user_notes.contains(&note) {
                return false;
            }
            record.user_notes.push(note);
            true
        })
        .await
    }

    /// Record a confusion topic unless it is already known.
    ///
    /// Returns `true` if the record changed.
    pub async fn add_confusion(self: &Arc<Self>, topic: &str) -> Result<bool> {
        let topic = topic.to_string();
        self.mutate_blocking(move |record| {
            if record.confusion_points.contains(&topic) {
                return false;
            }
            record.confusion_points.push(topic);
            true
        })
        .await
    }

    /// Run [`Self::mutate`] on the blocking pool; the file write must not
    /// stall the async caller.
    async fn mutate_blocking(
        self: &Arc<Self>,
        change: impl FnOnce(&mut MemoryRecord) -> bool + Send + 'static,
    ) -> Result<bool> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.mutate(change))
            .await
            .map_err(|e| ZigsyError::Memory(format!("memory write task failed: {}", e)))?
    }

    /// Apply `change` to a copy of the record, persist the copy, then commit
    /// it. The lock is held across the write so mutations are serialized.
    fn mutate(&self, change: impl FnOnce(&mut MemoryRecord) -> bool) -> Result<bool> {
        let mut guard = self
            .record
            .lock()
            .map_err(|e| ZigsyError::Memory(format!("memory lock poisoned: {}", e)))?;

        let mut next = guard.clone();
        if !change(&mut next) {
            return Ok(false);
        }

        write_record(&self.path, &next)?;
        *guard = next;
        debug!(path = %self.path.display(), "Memory flushed");
        Ok(true)
    }
}

/// Rewrite the whole file via a temp file and rename.
fn write_record(path: &Path, record: &MemoryRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(record)?;
    let tmp = path.with_extension("json.tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Arc<MemoryStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(&dir.path().join("memory.json")).unwrap();
        (dir, Arc::new(store))
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        let record = store.snapshot();
        assert!(record.is_empty());
        assert!(record.user_name.is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_add_note_writes_through() {
        let (_dir, store) = temp_store();
        assert!(store.add_note("my daughter is called Priya").await.unwrap());

        let on_disk: MemoryRecord =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk, store.snapshot());
        assert_eq!(on_disk.user_notes, vec!["my daughter is called Priya"]);
    }

    #[tokio::test]
    async fn test_duplicate_note_is_ignored() {
        let (_dir, store) = temp_store();
        assert!(store.add_note("likes tea").await.unwrap());
        assert!(!store.add_note("likes tea").await.unwrap());
        assert_eq!(store.snapshot().user_notes.len(), 1);
    }

    #[tokio::test]
    async fn test_confusion_topics_deduplicated_in_order() {
        let (_dir, store) = temp_store();
        store.add_confusion("wifi").await.unwrap();
        store.add_confusion("zoom").await.unwrap();
        store.add_confusion("wifi").await.unwrap();
        assert_eq!(store.snapshot().confusion_points, vec!["wifi", "zoom"]);
    }

    #[tokio::test]
    async fn test_round_trip_reproduces_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        {
            let store = Arc::new(MemoryStore::open(&path).unwrap());
            store.add_confusion("wifi").await.unwrap();
            store.add_confusion("camera").await.unwrap();
            store.add_note("first note").await.unwrap();
            store.add_note("second note").await.unwrap();
            store.add_note("third note").await.unwrap();
        }

        let reloaded = MemoryStore::open(&path).unwrap().snapshot();
        assert_eq!(reloaded.confusion_points, vec!["wifi", "camera"]);
        assert_eq!(
            reloaded.user_notes,
            vec!["first note", "second note", "third note"]
        );
        assert!(reloaded.user_name.is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_reads_file_with_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, r#"{"confusion_points": ["zoom"]}"#).unwrap();

        let record = MemoryStore::open(&path).unwrap().snapshot();
        assert_eq!(record.confusion_points, vec!["zoom"]);
        assert!(record.user_notes.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            MemoryStore::open(&path),
            Err(ZigsyError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // The target path is a directory, so the final rename fails.
        let path = dir.path().join("memory.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let store = Arc::new(MemoryStore {
            path: path.clone(),
            record: Mutex::new(MemoryRecord::default()),
        });
        assert!(store.add_note("will not stick").await.is_err());
        assert!(store.snapshot().user_notes.is_empty());
    }
}
