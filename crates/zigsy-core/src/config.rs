use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Top-level configuration for the Zigsy assistant.
///
/// Loaded from `~/.zigsy/config.toml` by default. Each section corresponds
/// to one component of the assistant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZigsyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub chat: ChatBackendConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub locate: LocateConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ZigsyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ZigsyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the memory file, stash log and knowledge base.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.zigsy".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Persona and prompt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Display name, also used to ignore the assistant's own windows.
    pub name: String,
    /// System prompt sent with every chat call.
    pub system_prompt: String,
    /// Phrase the wake-word listener reacts to.
    pub wake_phrase: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Zigsy".to_string(),
            system_prompt: "You are Zigsy, a calm and patient desktop assistant. \
                            Explain things in short, simple steps. \
                            Never use jargon without explaining it."
                .to_string(),
            wake_phrase: "hey zigsy".to_string(),
        }
    }
}

/// Language-model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatBackendConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Model name passed to the backend.
    pub model: String,
}

impl Default for ChatBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
        }
    }
}

/// Passive watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether the clipboard watcher runs.
    pub clipboard_enabled: bool,
    /// Clipboard poll cadence in milliseconds.
    pub clipboard_poll_ms: u64,
    /// Whether the foreground-window watcher runs.
    pub window_enabled: bool,
    /// Foreground-window poll cadence in milliseconds.
    pub window_poll_ms: u64,
    /// Process names (substring match, lower case) never reported as the
    /// foreground application.
    pub ignored_processes: Vec<String>,
    /// Whether the wake-word listener runs.
    pub wake_word_enabled: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            clipboard_enabled: true,
            clipboard_poll_ms: 1000,
            window_enabled: true,
            window_poll_ms: 2000,
            ignored_processes: vec![
                "zigsy".to_string(),
                "python".to_string(),
                "python3".to_string(),
                "py".to_string(),
            ],
            wake_word_enabled: false,
        }
    }
}

/// File locator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateConfig {
    /// Maximum number of matches collected per search.
    pub max_matches: usize,
    /// Maximum number of matches listed in the report.
    pub max_listed: usize,
    /// Additional directory names to skip while walking.
    pub extra_skip_dirs: Vec<String>,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            max_matches: 15,
            max_listed: 5,
            extra_skip_dirs: vec![],
        }
    }
}

/// Knowledge base (retrieval) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory with raw `.txt` / `.md` documents, relative to the data dir.
    pub raw_dir: String,
    /// Persisted passage index, relative to the data dir.
    pub index_file: String,
    /// Number of passages returned per lookup.
    pub top_k: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            raw_dir: "knowledge_base/raw".to_string(),
            index_file: "knowledge_base/index/passages.json".to_string(),
            top_k: 2,
        }
    }
}

/// Speech output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whether replies are spoken.
    pub enabled: bool,
    /// TTS program invoked with the reply as its last argument.
    /// When unset a platform default is used.
    pub command: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
        }
    }
}

/// Microphone input: push-to-talk recording and the wake-word listener's
/// audio source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whether `/talk` push-to-talk recording is offered.
    pub push_to_talk: bool,
    /// Input device name or substring; "default" picks the system default.
    pub device: String,
    /// GGML Whisper model. A leading `~` is expanded.
    pub model_path: String,
    /// Transcription language code, or "auto".
    pub language: String,
    /// Longest push-to-talk recording kept.
    pub max_record_seconds: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            push_to_talk: true,
            device: "default".to_string(),
            model_path: "~/.zigsy/models/ggml-base.en.bin".to_string(),
            language: "en".to_string(),
            max_record_seconds: 30,
        }
    }
}

/// Durable file names, relative to the data dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub memory_file: String,
    pub stash_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            memory_file: "memory.json".to_string(),
            stash_file: "stash.md".to_string(),
        }
    }
}
