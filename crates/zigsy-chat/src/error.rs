//! Error types for the conversation pipeline.

use zigsy_core::error::ZigsyError;

use crate::state::TurnState;

/// Errors from the conversation engine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ChatError {
    #[error("LLM error: {0}")]
    LlmError(String),
    #[error("retrieval error: {0}")]
    RetrievalError(String),
    #[error("voice error: {0}")]
    VoiceError(String),
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("system vitals unavailable: {0}")]
    VitalsUnavailable(String),
    #[error("invalid turn transition: {from} -> {to}")]
    InvalidTransition { from: TurnState, to: TurnState },
}

impl ChatError {
    /// Failures of an external collaborator. These abandon the turn without
    /// touching history.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ChatError::LlmError(_) | ChatError::RetrievalError(_) | ChatError::VoiceError(_)
        )
    }
}

impl From<ZigsyError> for ChatError {
    fn from(err: ZigsyError) -> Self {
        match err {
            ZigsyError::Retrieval(msg) => ChatError::RetrievalError(msg),
            ZigsyError::Audio(msg) | ZigsyError::Transcription(msg) => ChatError::VoiceError(msg),
            other => ChatError::StorageError(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::LlmError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(
            ChatError::LlmError("connection refused".to_string()).to_string(),
            "LLM error: connection refused"
        );
        assert_eq!(
            ChatError::RetrievalError("index missing".to_string()).to_string(),
            "retrieval error: index missing"
        );
        assert_eq!(
            ChatError::InvalidTransition {
                from: TurnState::Received,
                to: TurnState::Completed,
            }
            .to_string(),
            "invalid turn transition: Received -> Completed"
        );
        assert_eq!(
            ChatError::VitalsUnavailable("no memory info".to_string()).to_string(),
            "system vitals unavailable: no memory info"
        );
    }

    #[test]
    fn test_from_zigsy_error_routes_variants() {
        let err: ChatError = ZigsyError::Retrieval("bad index".to_string()).into();
        assert!(matches!(err, ChatError::RetrievalError(_)));

        let err: ChatError = ZigsyError::Transcription("no model".to_string()).into();
        assert!(matches!(err, ChatError::VoiceError(_)));

        let err: ChatError = ZigsyError::Memory("disk full".to_string()).into();
        assert!(matches!(err, ChatError::StorageError(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_upstream_classification() {
        assert!(ChatError::LlmError(String::new()).is_upstream());
        assert!(ChatError::RetrievalError(String::new()).is_upstream());
        assert!(!ChatError::StorageError(String::new()).is_upstream());
        assert!(!ChatError::VitalsUnavailable(String::new()).is_upstream());
    }
}
