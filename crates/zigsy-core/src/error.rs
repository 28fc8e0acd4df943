use thiserror::Error;

/// Top-level error type for the Zigsy assistant.
///
/// Subsystem crates define their own error types where they need richer
/// variants and implement `From<ZigsyError>` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ZigsyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Memory store error: {0}")]
    Memory(String),

    #[error("Stash error: {0}")]
    Stash(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Window introspection error: {0}")]
    Window(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ZigsyError {
    fn from(err: toml::de::Error) -> Self {
        ZigsyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ZigsyError {
    fn from(err: serde_json::Error) -> Self {
        ZigsyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Zigsy operations.
pub type Result<T> = std::result::Result<T, ZigsyError>;
