//! Filesystem walk behind "find my ..." requests.
//!
//! Walks a fixed list of likely user folders in order, skipping system and
//! build directories, and stops as soon as the match cap is reached.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use regex::Regex;
use tracing::{debug, info};

use zigsy_core::config::LocateConfig;

use crate::query::{clean_search_term, is_natural_language, is_vague};
use crate::report::{self, FoundEntry, MatchKind};

/// Directory names never descended into. Dot-prefixed directories are
/// skipped as well.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "Windows",
    "Program Files",
    "Program Files (x86)",
    "node_modules",
    "site-packages",
    "__pycache__",
    ".git",
    "venv",
    "myenv",
    "$Recycle.Bin",
    "WinSxS",
    "System32",
    "SysWOW64",
    "AppData",
    "Temp",
    "tmp",
    ".vs",
    "obj",
    "bin",
    "build",
    "dist",
    ".next",
    ".nuxt",
    "coverage",
    "target",
];

/// Result of a search that was attempted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocateOutcome {
    /// Text shown to the user.
    pub report: String,
    /// Folder to offer for opening: the first hit, or its parent for a file.
    pub primary_folder: Option<PathBuf>,
    pub found: Vec<FoundEntry>,
}

/// Search roots in priority order: working directory, the usual home
/// subfolders, home itself, and on Windows the system drive.
pub fn default_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(home) = dirs::home_dir() {
        for sub in ["Desktop", "Documents", "Downloads", "Pictures", "Videos", "Music"] {
            roots.push(home.join(sub));
        }
        roots.push(home);
    }
    if cfg!(windows) {
        let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
        roots.push(PathBuf::from(format!("{}\\", drive)));
    }
    roots
}

#[derive(Clone, Debug)]
pub struct FileLocator {
    roots: Vec<PathBuf>,
    skip_dirs: Arc<HashSet<String>>,
    max_matches: usize,
    max_listed: usize,
}

impl FileLocator {
    /// Create a locator over `roots`. Duplicates and roots that do not exist
    /// are dropped here.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let defaults = LocateConfig::default();
        Self {
            roots: usable_roots(roots),
            skip_dirs: Arc::new(DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect()),
            max_matches: defaults.max_matches,
            max_listed: defaults.max_listed,
        }
    }

    /// Locator over [`default_roots`] with limits and extra skip dirs from
    /// config.
    pub fn from_config(config: &LocateConfig) -> Self {
        Self::new(default_roots())
            .with_limits(config.max_matches, config.max_listed)
            .with_extra_skip_dirs(&config.extra_skip_dirs)
    }

    pub fn with_limits(mut self, max_matches: usize, max_listed: usize) -> Self {
        self.max_matches = max_matches.max(1);
        self.max_listed = max_listed;
        self
    }

    pub fn with_extra_skip_dirs(mut self, extra: &[String]) -> Self {
        let mut skip: HashSet<String> = self.skip_dirs.as_ref().clone();
        skip.extend(extra.iter().cloned());
        self.skip_dirs = Arc::new(skip);
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Handle a raw file request.
    ///
    /// Returns `None` when the request is too vague or reads as a question;
    /// the caller should treat it as conversation instead.
    pub fn locate(&self, raw: &str) -> Option<LocateOutcome> {
        if is_natural_language(raw) || is_vague(raw) {
            debug!(query = %raw, "Query is not a file name");
            return None;
        }

        let term = clean_search_term(raw);
        if term.is_empty() {
            return Some(LocateOutcome {
                report: report::EMPTY_TERM.to_string(),
                primary_folder: None,
                found: Vec::new(),
            });
        }

        let found = self.search(&term);
        info!(term = %term, matches = found.len(), "File search finished");

        Some(LocateOutcome {
            report: report::render(&term, &found, self.max_listed),
            primary_folder: found.first().map(FoundEntry::containing_folder),
            found,
        })
    }

    /// Walk every root and collect matching files and folders, up to the
    /// match cap.
    ///
    /// Each directory's own subfolders and files are checked before any of
    /// its subfolders is entered, so shallow hits are never crowded out by a
    /// large subtree.
    pub fn search(&self, term: &str) -> Vec<FoundEntry> {
        let matcher = NameMatcher::new(term);
        let mut found = Vec::new();
        let mut seen = HashSet::new();

        'roots: for root in &self.roots {
            let mut pending = vec![root.clone()];
            while let Some(dir) = pending.pop() {
                let (subdirs, files) = self.list_dir(&dir);

                let hits = subdirs
                    .iter()
                    .map(|path| (path, MatchKind::Folder))
                    .chain(files.iter().map(|path| (path, MatchKind::File)));
                for (path, kind) in hits {
                    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    if !matcher.matches(&name) {
                        continue;
                    }
                    let path = normalize(path);
                    if seen.insert(path.clone()) {
                        found.push(FoundEntry { path, kind });
                        if found.len() >= self.max_matches {
                            break 'roots;
                        }
                    }
                }

                // Reversed so the stack pops subfolders in name order.
                pending.extend(subdirs.into_iter().rev());
            }
        }

        found
    }

    /// Immediate children of `dir`, sorted by name and split into walkable
    /// subfolders and files. Skipped and hidden folders are left out.
    fn list_dir(&self, dir: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let skip = Arc::clone(&self.skip_dirs);
        let walk = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(false)
            .max_depth(Some(1))
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                if !is_dir {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !name.starts_with('.') && !skip.contains(&*name)
            })
            .build();

        let mut subdirs = Vec::new();
        let mut files = Vec::new();
        for entry in walk {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    debug!(dir = %dir.display(), error = %error, "Skipping unreadable entry");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            match entry.file_type() {
                Some(ft) if ft.is_dir() => subdirs.push(entry.into_path()),
                _ => files.push(entry.into_path()),
            }
        }
        (subdirs, files)
    }
}

fn usable_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    roots
        .into_iter()
        .map(|root| normalize(&root))
        .filter(|root| root.exists() && seen.insert(root.clone()))
        .collect()
}

fn normalize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Case-insensitive name test: extension suffix for terms starting with a
/// dot, otherwise equality, prefix, or whole-word occurrence.
struct NameMatcher {
    term: String,
    word: Option<Regex>,
}

impl NameMatcher {
    fn new(term: &str) -> Self {
        let term = term.to_lowercase();
        let word = if term.starts_with('.') {
            None
        } else {
            Regex::new(&format!(r"\b{}\b", regex::escape(&term))).ok()
        };
        Self { term, word }
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        if self.term.starts_with('.') {
            return name.ends_with(&self.term);
        }
        name == self.term
            || name.starts_with(&self.term)
            || self.word.as_ref().is_some_and(|re| re.is_match(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"data").unwrap();
    }

    fn locator_for(root: &Path) -> FileLocator {
        FileLocator::new(vec![root.to_path_buf()])
    }

    #[test]
    fn test_name_matcher_rules() {
        let m = NameMatcher::new("Budget");
        assert!(m.matches("budget"));
        assert!(m.matches("Budget_2024.xlsx"));
        assert!(m.matches("family budget.txt"));
        assert!(!m.matches("mybudget.txt"));

        let ext = NameMatcher::new(".pdf");
        assert!(ext.matches("Letter.PDF"));
        assert!(!ext.matches("pdf_notes.txt"));
    }

    #[test]
    fn test_finds_files_and_folders() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("docs/budget.xlsx"));
        fs::create_dir_all(dir.path().join("budget")).unwrap();
        touch(&dir.path().join("other.txt"));

        let found = locator_for(dir.path()).search("budget");
        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .any(|e| e.kind == MatchKind::Folder && e.path.ends_with("budget")));
        assert!(found
            .iter()
            .any(|e| e.kind == MatchKind::File && e.path.ends_with("budget.xlsx")));
    }

    #[test]
    fn test_skips_denied_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("node_modules/budget.js"));
        touch(&dir.path().join(".cache/budget.txt"));
        touch(&dir.path().join("target/budget.rlib"));
        touch(&dir.path().join("visible/budget.txt"));

        let found = locator_for(dir.path()).search("budget");
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("visible/budget.txt"));
    }

    #[test]
    fn test_extra_skip_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("archive/budget.txt"));

        let locator = locator_for(dir.path()).with_extra_skip_dirs(&["archive".to_string()]);
        assert!(locator.search("budget").is_empty());
    }

    #[test]
    fn test_cap_at_fifteen_with_more_hint() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            touch(&dir.path().join(format!("report_{:02}.txt", i)));
        }

        let outcome = locator_for(dir.path()).locate("report").unwrap();
        assert_eq!(outcome.found.len(), 15);
        assert!(outcome.report.starts_with("Found 15 match(es) for 'report':"));
        assert!(outcome
            .report
            .contains("...and 10 more. Be more specific to narrow results."));
    }

    #[test]
    fn test_shallow_match_survives_large_subtree() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..15 {
            touch(&dir.path().join(format!("a/budget_{:02}.txt", i)));
        }
        touch(&dir.path().join("budget.txt"));

        let found = locator_for(dir.path()).search("budget");
        assert_eq!(found.len(), 15);
        assert!(found[0].path.ends_with("budget.txt"));
        assert_eq!(found[0].path.parent().unwrap(), normalize(dir.path()));
        assert!(found[1].path.ends_with("a/budget_00.txt"));
    }

    #[test]
    fn test_folders_checked_before_files_then_descend() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("zz/notes_deep.txt"));
        fs::create_dir_all(dir.path().join("notes")).unwrap();
        touch(&dir.path().join("notes.txt"));

        let found = locator_for(dir.path()).search("notes");
        let names: Vec<String> = found
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["notes", "notes.txt", "notes_deep.txt"]);
        assert_eq!(found[0].kind, MatchKind::Folder);
    }

    #[test]
    fn test_cap_stops_before_later_roots() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        for i in 0..3 {
            touch(&first.path().join(format!("photo{}.jpg", i)));
            touch(&second.path().join(format!("photo{}.jpg", i)));
        }

        let locator = FileLocator::new(vec![first.path().to_path_buf(), second.path().to_path_buf()])
            .with_limits(3, 5);
        let found = locator.search("photo");
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|e| e.path.starts_with(first.path())));
    }

    #[test]
    fn test_overlapping_roots_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("sub/notes.txt"));

        let locator = FileLocator::new(vec![
            dir.path().join("sub"),
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
            dir.path().join("does-not-exist"),
        ]);
        assert_eq!(locator.roots().len(), 2);
        assert_eq!(locator.search("notes").len(), 1);
    }

    #[test]
    fn test_primary_folder_is_parent_of_first_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("letters/landlord.docx"));

        let outcome = locator_for(dir.path()).locate("my landlord file?").unwrap();
        assert_eq!(outcome.found.len(), 1);
        assert_eq!(
            outcome.primary_folder.unwrap(),
            normalize(&dir.path().join("letters"))
        );
    }

    #[test]
    fn test_not_found_report() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = locator_for(dir.path()).locate("zebra").unwrap();
        assert_eq!(
            outcome.report,
            "Could not find 'zebra'. Check the spelling or try a shorter name."
        );
        assert!(outcome.primary_folder.is_none());
    }

    #[test]
    fn test_empty_term_asks_for_name() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = locator_for(dir.path()).locate("my the please").unwrap();
        assert_eq!(outcome.report, "Please tell me the filename you're looking for.");
        assert!(outcome.found.is_empty());
    }

    #[test]
    fn test_vague_or_question_terms_decline() {
        let dir = tempfile::tempdir().unwrap();
        let locator = locator_for(dir.path());
        assert!(locator.locate("that pdf from work").is_none());
        assert!(locator.locate("where is python installed").is_none());
    }
}
