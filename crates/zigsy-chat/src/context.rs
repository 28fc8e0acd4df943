//! Context fusion: memory summary, screen awareness and retrieved knowledge
//! merged into the string that frames a chat request.

use std::sync::Arc;

use tracing::{debug, warn};

use zigsy_core::types::WindowSnapshot;
use zigsy_storage::memory::{MemoryRecord, MemoryStore};
use zigsy_watch::window::WindowState;

use crate::error::ChatError;
use crate::retrieval::KnowledgeSlot;

// =============================================================================
// Pattern tables
// =============================================================================

/// Phrases that mean the user wants step-by-step help from the knowledge base.
pub const TASK_KEYWORDS: &[&str] = &[
    "how to", "how do i", "help me", "steps to", "whatsapp", "wifi", "zoom", "call", "message",
    "settings", "connect", "send", "open", "install", "shortcut", "keyboard", "unity", "editor",
];

/// Phrases that mean the user is asking about what is on screen.
pub const SCREEN_KEYWORDS: &[&str] = &[
    "which screen",
    "what screen",
    "where am i",
    "which app",
    "what is open",
    "what am i looking at",
    "what is this",
    "i am confused",
    "i'm confused",
    "lost",
    "what do i see",
];

/// Topics remembered as trouble spots when they come up in a help request.
pub const CONFUSION_KEYWORDS: &[&str] = &["whatsapp", "wifi", "zoom", "camera", "shortcut", "unity"];

/// Process name to friendly application name.
pub const KNOWN_APPS: &[(&str, &str)] = &[
    ("chrome", "Google Chrome"),
    ("msedge", "Microsoft Edge"),
    ("firefox", "Firefox"),
    ("whatsapp", "WhatsApp"),
    ("zoom", "Zoom"),
    ("notepad", "Notepad"),
    ("winword", "Microsoft Word"),
    ("excel", "Microsoft Excel"),
    ("powerpnt", "Microsoft PowerPoint"),
    ("code", "Visual Studio Code"),
    ("powershell", "PowerShell"),
    ("cmd", "Command Prompt"),
    ("mspaint", "Paint"),
    ("vlc", "VLC Media Player"),
    ("explorer", "File Explorer"),
    ("systemsettings", "Windows Settings"),
    ("control", "Control Panel"),
    ("mmc", "Computer Management"),
    ("taskmgr", "Task Manager"),
    ("regedit", "Registry Editor"),
    ("msconfig", "System Configuration"),
    ("shellexperiencehost", "the Desktop"),
];

/// Apps whose window titles are not worth repeating (paths, consoles).
pub const SKIP_TITLE_APPS: &[&str] = &["code", "powershell", "cmd", "regedit", "mmc", "msconfig"];

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

pub fn needs_screen(text: &str) -> bool {
    mentions_any(text, SCREEN_KEYWORDS)
}

pub fn needs_retrieval(text: &str) -> bool {
    mentions_any(text, TASK_KEYWORDS)
}

/// Confusion topics mentioned in `text`, in table order.
pub fn confusion_topics(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    CONFUSION_KEYWORDS
        .iter()
        .copied()
        .filter(|k| lower.contains(k))
        .collect()
}

// =============================================================================
// Segments
// =============================================================================

/// Which optional segments a request wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextRequest {
    pub needs_screen: bool,
    pub needs_retrieval: bool,
}

impl ContextRequest {
    pub fn for_text(text: &str) -> Self {
        Self {
            needs_screen: needs_screen(text),
            needs_retrieval: needs_retrieval(text),
        }
    }
}

/// Summary of what is remembered about the user, or `None` when there is
/// nothing to say.
pub fn memory_segment(record: &MemoryRecord) -> Option<String> {
    let mut parts = Vec::new();

    if !record.confusion_points.is_empty() {
        parts.push(format!(
            "Topics this user has struggled with: {}. Be extra patient about these.",
            record.confusion_points.join(", ")
        ));
    }

    if !record.user_notes.is_empty() {
        let notes = record
            .user_notes
            .iter()
            .map(|note| format!("  - {}", note))
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!(
            "IMPORTANT FACTS about this user — treat each one as separate and distinct:\n{}",
            notes
        ));
    }

    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

/// One sentence naming the foreground application.
pub fn screen_segment(snapshot: &WindowSnapshot) -> Option<String> {
    let title = snapshot.title.trim();
    if title.chars().count() < 3 || title.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let process = snapshot.process_name.to_lowercase();
    let app_name = KNOWN_APPS
        .iter()
        .find(|(name, _)| *name == process)
        .map(|(_, friendly)| friendly.to_string())
        .unwrap_or_else(|| capitalize(&process));

    if SKIP_TITLE_APPS.contains(&process.as_str()) {
        Some(format!("The user has {} open on their screen", app_name))
    } else {
        Some(format!("The user has {} open, showing: {}", app_name, title))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Fusion engine
// =============================================================================

pub struct ContextFusion {
    memory: Arc<MemoryStore>,
    window: WindowState,
    knowledge: KnowledgeSlot,
    top_k: usize,
}

impl ContextFusion {
    pub fn new(memory: Arc<MemoryStore>, window: WindowState, knowledge: KnowledgeSlot, top_k: usize) -> Self {
        Self {
            memory,
            window,
            knowledge,
            top_k,
        }
    }

    /// Build the augmentation string for `text`.
    ///
    /// Segments are, in order: memory summary, screen awareness, retrieved
    /// passages. Missing segments are left out; with none the result is
    /// empty. Retrieval failures are returned as errors. Confusion topics are
    /// recorded whenever retrieval runs, and a failed memory write there is
    /// only logged.
    pub async fn assemble(&self, text: &str) -> Result<String, ChatError> {
        let request = ContextRequest::for_text(text);
        let mut segments = Vec::new();

        if let Some(memory) = memory_segment(&self.memory.snapshot()) {
            segments.push(memory);
        }

        if request.needs_screen {
            match self.window.latest().as_ref().and_then(screen_segment) {
                Some(screen) => segments.push(screen),
                None => debug!("No foreground window known"),
            }
        }

        if request.needs_retrieval {
            if let Some(retriever) = self.knowledge.get() {
                let passages = retriever.retrieve(text, self.top_k).await?;
                if !passages.is_empty() {
                    segments.push(passages.join("\n\n"));
                }
                self.record_confusion(text).await;
            } else {
                debug!("Knowledge index not loaded; skipping retrieval");
            }
        }

        debug!(
            segments = segments.len(),
            screen = request.needs_screen,
            retrieval = request.needs_retrieval,
            "Context assembled"
        );
        Ok(segments.join("\n\n"))
    }

    async fn record_confusion(&self, text: &str) {
        for topic in confusion_topics(text) {
            if let Err(e) = self.memory.add_confusion(topic).await {
                warn!(topic, error = %e, "Failed to record confusion topic");
            }
        }
    }
}
