//! Knowledge retrieval.
//!
//! The pipeline only depends on [`Retriever`]. [`KnowledgeIndex`] is the
//! bundled implementation: paragraphs from `.txt` / `.md` files under the
//! raw knowledge directory, persisted as JSON and scored by keyword overlap.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use zigsy_core::error::{Result, ZigsyError};
use zigsy_core::events::{AssistantEvent, AssistantStatus, EventSink};

use crate::error::ChatError;

/// Top-K passage lookup.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> std::result::Result<Vec<String>, ChatError>;
}

/// The retriever once the knowledge load job has finished. Empty until then.
#[derive(Clone, Default)]
pub struct KnowledgeSlot {
    inner: Arc<RwLock<Option<Arc<dyn Retriever>>>>,
}

impl KnowledgeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, retriever: Arc<dyn Retriever>) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(retriever);
        }
    }

    pub fn get(&self) -> Option<Arc<dyn Retriever>> {
        self.inner.read().ok().and_then(|slot| slot.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }
}

// =============================================================================
// Keyword index
// =============================================================================

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "you", "your", "are", "can", "how", "what", "this", "that", "with",
    "from", "have", "has", "was", "but", "not", "all", "any", "out", "into", "then", "than",
    "there", "their", "them", "they", "will", "would", "should", "could", "about", "when", "where",
    "which", "who", "why", "does", "did", "doing", "i'm", "its", "it's", "our", "use",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// File the passage came from, relative to the raw directory.
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeIndex {
    passages: Vec<Passage>,
}

impl KnowledgeIndex {
    pub fn from_passages(passages: Vec<Passage>) -> Self {
        Self { passages }
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    /// Load the persisted index, or build it from `raw_dir` and persist it.
    pub fn load_or_build(raw_dir: &Path, index_file: &Path) -> Result<Self> {
        if index_file.exists() {
            let content = std::fs::read_to_string(index_file)?;
            let index: KnowledgeIndex = serde_json::from_str(&content)?;
            info!(path = %index_file.display(), passages = index.passages.len(), "Loaded knowledge index");
            return Ok(index);
        }

        let index = Self::build(raw_dir)?;
        index.save(index_file)?;
        info!(
            raw_dir = %raw_dir.display(),
            passages = index.passages.len(),
            "Built knowledge index"
        );
        Ok(index)
    }

    /// Split every `.txt` / `.md` file under `raw_dir` into paragraphs.
    pub fn build(raw_dir: &Path) -> Result<Self> {
        if !raw_dir.is_dir() {
            return Err(ZigsyError::Retrieval(format!(
                "knowledge directory not found: {}",
                raw_dir.display()
            )));
        }

        let mut files = Vec::new();
        collect_documents(raw_dir, &mut files)?;
        files.sort();

        let mut passages = Vec::new();
        for file in files {
            let content = match std::fs::read_to_string(&file) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Skipping unreadable document");
                    continue;
                }
            };
            let source = file
                .strip_prefix(raw_dir)
                .unwrap_or(&file)
                .to_string_lossy()
                .into_owned();
            passages.extend(split_paragraphs(&content).into_iter().map(|text| Passage {
                source: source.clone(),
                text,
            }));
        }

        Ok(Self { passages })
    }

    pub fn save(&self, index_file: &Path) -> Result<()> {
        if let Some(parent) = index_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(index_file, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Passages sharing the most distinct keywords with `query`. Ties keep
    /// index order; passages with no shared keyword are never returned.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<String> {
        let terms = keywords(query);
        if terms.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize)> = self
            .passages
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let words = keywords(&p.text);
                let score = terms.iter().filter(|t| words.contains(*t)).count();
                (score > 0).then_some((score, i))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        scored
            .into_iter()
            .take(top_k)
            .map(|(_, i)| self.passages[i].text.clone())
            .collect()
    }
}

#[async_trait]
impl Retriever for KnowledgeIndex {
    async fn retrieve(&self, query: &str, top_k: usize) -> std::result::Result<Vec<String>, ChatError> {
        Ok(self.search(query, top_k))
    }
}

fn collect_documents(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_documents(&path, out)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt") | Some("md")
        ) {
            out.push(path);
        }
    }
    Ok(())
}

fn split_paragraphs(content: &str) -> Vec<String> {
    content
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn keywords(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Background load
// =============================================================================

/// Load the knowledge index off the pipeline and install it into `slot`.
///
/// Reports `Syncing` when it starts and `Ready` when it finishes, whether or
/// not the load succeeded. Retrieval stays skipped after a failure.
pub fn spawn_knowledge_load(
    raw_dir: PathBuf,
    index_file: PathBuf,
    slot: KnowledgeSlot,
    sink: Arc<dyn EventSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        sink.emit(AssistantEvent::Status {
            status: AssistantStatus::Syncing,
        });
        sink.emit(AssistantEvent::Notice {
            text: "SYNCING TACTICAL DATA...".to_string(),
        });

        let loaded =
            tokio::task::spawn_blocking(move || KnowledgeIndex::load_or_build(&raw_dir, &index_file)).await;

        match loaded {
            Ok(Ok(index)) => slot.install(Arc::new(index)),
            Ok(Err(e)) => warn!(error = %e, "Knowledge index unavailable; retrieval disabled"),
            Err(e) => warn!(error = %e, "Knowledge load task failed"),
        }

        sink.emit(AssistantEvent::Status {
            status: AssistantStatus::Ready,
        });
        sink.emit(AssistantEvent::Notice {
            text: "SYSTEM READY. How can I help you today?".to_string(),
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zigsy_core::events::ChannelSink;

    fn write_docs(dir: &Path) {
        std::fs::create_dir_all(dir.join("apps")).unwrap();
        std::fs::write(
            dir.join("wifi.txt"),
            "To connect to WiFi, click the network icon.\n\nPick your network and type the password.",
        )
        .unwrap();
        std::fs::write(
            dir.join("apps/whatsapp.md"),
            "# WhatsApp\n\nOpen a chat and tap the camera icon for a video call.",
        )
        .unwrap();
        std::fs::write(dir.join("ignored.pdf"), "binary").unwrap();
    }

    #[test]
    fn test_build_splits_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let index = KnowledgeIndex::build(dir.path()).unwrap();
        assert_eq!(index.passages().len(), 4);
        assert!(index.passages().iter().all(|p| !p.source.ends_with(".pdf")));
    }

    #[test]
    fn test_build_missing_dir_is_retrieval_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = KnowledgeIndex::build(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ZigsyError::Retrieval(_)));
    }

    #[test]
    fn test_search_ranks_by_overlap() {
        let index = KnowledgeIndex::from_passages(vec![
            Passage {
                source: "a".into(),
                text: "Restart the router by unplugging it.".into(),
            },
            Passage {
                source: "b".into(),
                text: "Connect to WiFi from the network icon.".into(),
            },
            Passage {
                source: "c".into(),
                text: "WiFi passwords are on the router label.".into(),
            },
        ]);

        let hits = index.search("How do I connect my WiFi?", 2);
        assert_eq!(hits[0], "Connect to WiFi from the network icon.");
        assert_eq!(hits[1], "WiFi passwords are on the router label.");
        assert!(index.search("banana", 2).is_empty());
        assert!(index.search("wifi", 0).is_empty());
    }

    #[test]
    fn test_load_or_build_persists_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        let index_file = dir.path().join("index/passages.json");
        write_docs(&raw);

        let built = KnowledgeIndex::load_or_build(&raw, &index_file).unwrap();
        assert!(index_file.exists());

        std::fs::remove_dir_all(&raw).unwrap();
        let reloaded = KnowledgeIndex::load_or_build(&raw, &index_file).unwrap();
        assert_eq!(reloaded.passages(), built.passages());
    }

    #[tokio::test]
    async fn test_load_job_installs_index_and_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        write_docs(&raw);

        let slot = KnowledgeSlot::new();
        let (sink, mut rx) = ChannelSink::channel();
        spawn_knowledge_load(raw, dir.path().join("index.json"), slot.clone(), Arc::new(sink))
            .await
            .unwrap();

        assert!(slot.is_loaded());
        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AssistantEvent::Status { status } = event {
                statuses.push(status);
            }
        }
        assert_eq!(statuses, vec![AssistantStatus::Syncing, AssistantStatus::Ready]);
    }

    #[tokio::test]
    async fn test_load_job_failure_leaves_slot_empty() {
        let dir = tempfile::tempdir().unwrap();
        let slot = KnowledgeSlot::new();
        let (sink, mut rx) = ChannelSink::channel();

        spawn_knowledge_load(
            dir.path().join("missing"),
            dir.path().join("index.json"),
            slot.clone(),
            Arc::new(sink),
        )
        .await
        .unwrap();

        assert!(!slot.is_loaded());
        let mut saw_ready = false;
        while let Ok(event) = rx.try_recv() {
            if event == (AssistantEvent::Status { status: AssistantStatus::Ready }) {
                saw_ready = true;
            }
        }
        assert!(saw_ready);
    }
}
