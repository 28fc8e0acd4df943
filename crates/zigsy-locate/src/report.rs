//! Plain-text rendering of search results.

use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    File,
    Folder,
}

impl MatchKind {
    pub fn icon(&self) -> &'static str {
        match self {
            MatchKind::File => "📄",
            MatchKind::Folder => "📁",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchKind::File => "FILE",
            MatchKind::Folder => "FOLDER",
        }
    }
}

/// One search hit, in discovery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundEntry {
    pub path: PathBuf,
    pub kind: MatchKind,
}

impl FoundEntry {
    /// The folder a file manager should open for this hit.
    pub fn containing_folder(&self) -> PathBuf {
        match self.kind {
            MatchKind::Folder => self.path.clone(),
            MatchKind::File => self
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.path.clone()),
        }
    }
}

pub fn not_found(term: &str) -> String {
    format!(
        "Could not find '{}'. Check the spelling or try a shorter name.",
        term
    )
}

pub const EMPTY_TERM: &str = "Please tell me the filename you're looking for.";

/// Summary line, up to `max_listed` entries, and a hint when truncated.
pub fn render(term: &str, found: &[FoundEntry], max_listed: usize) -> String {
    if found.is_empty() {
        return not_found(term);
    }

    let mut out = format!("Found {} match(es) for '{}':\n\n", found.len(), term);
    for entry in found.iter().take(max_listed) {
        out.push_str(&render_entry(entry));
    }
    if found.len() > max_listed {
        out.push_str(&format!(
            "...and {} more. Be more specific to narrow results.\n",
            found.len() - max_listed
        ));
    }
    out.trim().to_string()
}

fn render_entry(entry: &FoundEntry) -> String {
    let name = entry
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.path.display().to_string());

    let mut line = format!(
        "{} {} [{}]\n📍 {}\n",
        entry.kind.icon(),
        name,
        entry.kind.label(),
        entry.path.display()
    );

    if entry.kind == MatchKind::File {
        // Size is best effort; the file may be gone by now.
        if let Ok(meta) = std::fs::metadata(&entry.path) {
            line.push_str(&format_size(meta.len()));
            line.push('\n');
        }
    }
    line.push('\n');
    line
}

fn format_size(bytes: u64) -> String {
    if bytes > 1024 {
        format!("📦 {} KB", bytes / 1024)
    } else {
        format!("📦 {} B", bytes)
    }
}
