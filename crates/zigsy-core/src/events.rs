use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::UtteranceSource;

/// Coarse assistant status shown next to the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantStatus {
    /// The knowledge index is loading.
    Syncing,
    /// A turn is being processed.
    Processing,
    /// Idle and ready for input.
    Ready,
}

/// Everything the orchestration engine tells the outside world.
///
/// Presentation is owned by the [`EventSink`]: the engine never edits text it
/// already emitted, it emits explicit events instead (a `Pending` indicator is
/// always followed by exactly one `Finalized` or `TurnFailed` with the same
/// `turn_id`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AssistantEvent {
    /// Echo of a direct user utterance.
    UserMessage {
        text: String,
        source: UtteranceSource,
    },

    /// Assistant text produced without the chat collaborator (commands, file
    /// search results, clipboard prompts, inline error reports).
    Notice { text: String },

    /// A chat call has been dispatched; show a transient working indicator.
    Pending { turn_id: Uuid },

    /// The chat call for `turn_id` returned. Retracts the indicator.
    Finalized { turn_id: Uuid, reply: String },

    /// The chat call for `turn_id` failed. Retracts the indicator; history
    /// was not modified.
    TurnFailed { turn_id: Uuid, reason: String },

    /// The input surface must not accept new submissions.
    InputLocked,

    /// The input surface may accept submissions again.
    InputReleased,

    /// A file search found something; the front end may offer to open it.
    FolderAvailable { path: PathBuf },

    /// Ghost (semi-transparent) mode was toggled.
    GhostModeChanged { enabled: bool },

    /// The wake phrase was heard.
    WakeWordDetected,

    /// Assistant status changed.
    Status { status: AssistantStatus },
}

/// Consumer of orchestration output (UI, logger, test harness).
///
/// `emit` is called from the pipeline task and must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AssistantEvent);
}

/// Sink that forwards every event into an unbounded channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AssistantEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AssistantEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: AssistantEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Event receiver dropped; event discarded");
        }
    }
}

/// Sink that writes events to the tracing log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AssistantEvent) {
        match &event {
            AssistantEvent::TurnFailed { turn_id, reason } => {
                tracing::warn!(%turn_id, reason = %reason, "Turn failed");
            }
            AssistantEvent::Finalized { turn_id, reply } => {
                tracing::info!(%turn_id, reply_len = reply.len(), "Turn finalized");
            }
            other => tracing::debug!(event = ?other, "Assistant event"),
        }
    }
}

/// Fan an event out to several sinks in order.
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: AssistantEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}
