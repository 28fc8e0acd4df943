use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// The input channel an utterance arrived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtteranceSource {
    /// Typed into the input field.
    Typed,
    /// Transcribed speech (push-to-talk or wake word).
    Voice,
    /// A one or two word clipboard capture to be defined.
    ClipboardWord,
    /// A 3-50 word clipboard capture waiting for an explicit "explain".
    ClipboardPhrase,
    /// One of the canned quick-action questions.
    QuickAction,
}

impl UtteranceSource {
    /// Whether the utterance was produced by the user directly, as opposed to
    /// being derived from a clipboard capture.
    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            UtteranceSource::Typed | UtteranceSource::Voice | UtteranceSource::QuickAction
        )
    }
}

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Word-count class of a clipboard sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardClass {
    /// Reserved command echo, a single character, or more than 50 words.
    Ignore,
    /// 1-2 words: define automatically.
    AutoDefine,
    /// 3-50 words: offer an explanation.
    PromptExplain,
}

// =============================================================================
// Core Domain Types
// =============================================================================

/// One unit of input text, regardless of source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub source: UtteranceSource,
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn new(text: impl Into<String>, source: UtteranceSource) -> Self {
        Self {
            text: text.into(),
            source,
            timestamp: Utc::now(),
        }
    }

    pub fn typed(text: impl Into<String>) -> Self {
        Self::new(text, UtteranceSource::Typed)
    }

    pub fn voice(text: impl Into<String>) -> Self {
        Self::new(text, UtteranceSource::Voice)
    }
}

/// One message in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The latest foreground window, as reported by the window watcher.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub title: String,
    /// Lower-cased process name without extension (e.g. `chrome`).
    pub process_name: String,
}

/// A normalized clipboard capture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardSample {
    pub text: String,
    pub word_count: usize,
}

/// Messages accepted by the conversation pipeline's mailbox.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// An utterance from any input channel.
    Utterance(Utterance),
    /// The wake phrase was heard. `remainder` holds whatever followed the
    /// phrase in the same fragment, if anything.
    WakeWord { remainder: Option<String> },
}

/// A canned question offered as a one-click shortcut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    pub message: &'static str,
}

pub const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction {
        label: "📱 WhatsApp Call",
        message: "How do I make a video call on WhatsApp?",
    },
    QuickAction {
        label: "🌐 Connect WiFi",
        message: "How do I connect to WiFi?",
    },
    QuickAction {
        label: "🔠 Bigger Text",
        message: "How do I make the text bigger on my screen?",
    },
    QuickAction {
        label: "🔄 Restart PC",
        message: "How do I restart my computer?",
    },
    QuickAction {
        label: "📹 Zoom Meeting",
        message: "How do I join a Zoom meeting?",
    },
    QuickAction {
        label: "📁 Find a File",
        message: "How do I find a file on my computer?",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_source_serde() {
        let json = serde_json::to_string(&UtteranceSource::ClipboardPhrase).unwrap();
        assert_eq!(json, "\"clipboard_phrase\"");
        let back: UtteranceSource = serde_json::from_str("\"quick_action\"").unwrap();
        assert_eq!(back, UtteranceSource::QuickAction);
    }

    #[test]
    fn test_direct_sources() {
        assert!(UtteranceSource::Typed.is_direct());
        assert!(UtteranceSource::Voice.is_direct());
        assert!(UtteranceSource::QuickAction.is_direct());
        assert!(!UtteranceSource::ClipboardWord.is_direct());
        assert!(!UtteranceSource::ClipboardPhrase.is_direct());
    }

    #[test]
    fn test_conversation_turn_constructors() {
        let user = ConversationTurn::user("hi");
        let assistant = ConversationTurn::assistant("hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(assistant.role.as_str(), "assistant");
        assert_eq!(assistant.content, "hello");
    }

    #[test]
    fn test_utterance_helpers_set_source() {
        assert_eq!(Utterance::typed("a").source, UtteranceSource::Typed);
        assert_eq!(Utterance::voice("b").source, UtteranceSource::Voice);
    }

    #[test]
    fn test_quick_actions_are_questions() {
        assert_eq!(QUICK_ACTIONS.len(), 6);
        assert!(QUICK_ACTIONS.iter().all(|qa| qa.message.ends_with('?')));
    }
}
