use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use zigsy_core::error::{Result, ZigsyError};

/// Append-only markdown log of stashed clipboard snippets.
///
/// Each entry is a horizontal rule, a bold local timestamp and the verbatim
/// text. Existing content is never rewritten.
#[derive(Debug, Clone)]
pub struct StashLog {
    path: PathBuf,
}

impl StashLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `text` as a new entry and return the log's location.
    pub fn append(&self, text: &str) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let entry = format_entry(text, &Local::now().format("%Y-%m-%d %H:%M:%S").to_string());

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ZigsyError::Stash(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(entry.as_bytes())
            .map_err(|e| ZigsyError::Stash(format!("{}: {}", self.path.display(), e)))?;

        info!(path = %self.path.display(), chars = text.len(), "Stashed clipboard text");
        Ok(self.path.clone())
    }
}

fn format_entry(text: &str, timestamp: &str) -> String {
    format!("\n---\n**{}**\n\n{}\n", timestamp, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_format() {
        assert_eq!(
            format_entry("hello", "2024-01-01 10:00:00"),
            "\n---\n**2024-01-01 10:00:00**\n\nhello\n"
        );
    }

    #[test]
    fn test_append_twice_keeps_both_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = StashLog::new(dir.path().join("stash.md"));

        let first = log.append("same text").unwrap();
        let second = log.append("same text").unwrap();
        assert_eq!(first, second);

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.matches("\n---\n").count(), 2);
        assert_eq!(content.matches("same text").count(), 2);
    }

    #[test]
    fn test_append_preserves_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stash.md");
        std::fs::write(&path, "# My stash\n").unwrap();

        StashLog::new(&path).append("multi\nline snippet").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# My stash\n"));
        assert!(content.ends_with("\n\nmulti\nline snippet\n"));
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let log = StashLog::new(dir.path().join("nested/deeper/stash.md"));
        log.append("x").unwrap();
        assert!(log.path().exists());
    }
}
