//! The conversation pipeline.
//!
//! A single task drains the mailbox and handles one message at a time, so a
//! second utterance waits until the first reaches `Completed` or `Failed`.
//! Conversation history belongs to this task and is only extended when a
//! chat turn completes.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use zigsy_core::commands::ReservedCommand;
use zigsy_core::events::{AssistantEvent, AssistantStatus, EventSink};
use zigsy_core::types::{ConversationTurn, Inbound, Utterance, UtteranceSource};
use zigsy_locate::FileLocator;
use zigsy_storage::{MemoryStore, StashLog};
use zigsy_watch::{ClipboardSource, PendingClipboard};

use crate::backend::ChatBackend;
use crate::classifier::{classify, Classification, CommandKind};
use crate::context::ContextFusion;
use crate::error::ChatError;
use crate::speech::Speaker;
use crate::state::{Turn, TurnState};
use crate::vitals::VitalsProbe;

const PREVIEW_CHARS: usize = 80;

/// Frame a user message with fused context. Without context the message is
/// sent as is.
pub fn augment_message(message: &str, context: &str) -> String {
    if context.trim().is_empty() {
        return message.to_string();
    }
    format!(
        "IMPORTANT: You MUST answer using ONLY the information below. \
         Do not ask the user to describe what they see — you already know \
         from the screen information provided.\n\n\
         INFORMATION:\n{}\n\nUSER QUESTION: {}",
        context, message
    )
}

pub fn define_prompt(word: &str) -> String {
    format!(
        "Define this word or term in simple, clear language in 2-3 sentences maximum: '{}'",
        word
    )
}

pub fn explain_prompt(text: &str) -> String {
    format!("Explain this in simple terms: {}", text)
}

fn clipboard_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Collaborators and shared handles the pipeline is built from.
pub struct PipelineParts {
    pub backend: Arc<dyn ChatBackend>,
    pub fusion: ContextFusion,
    pub locator: Arc<FileLocator>,
    pub memory: Arc<MemoryStore>,
    pub stash: StashLog,
    pub clipboard: Arc<dyn ClipboardSource>,
    pub pending: PendingClipboard,
    pub vitals: Arc<dyn VitalsProbe>,
    pub speaker: Arc<dyn Speaker>,
    pub sink: Arc<dyn EventSink>,
    pub system_prompt: String,
}

pub struct ConversationPipeline {
    backend: Arc<dyn ChatBackend>,
    fusion: ContextFusion,
    locator: Arc<FileLocator>,
    memory: Arc<MemoryStore>,
    stash: StashLog,
    clipboard: Arc<dyn ClipboardSource>,
    pending: PendingClipboard,
    vitals: Arc<dyn VitalsProbe>,
    speaker: Arc<dyn Speaker>,
    sink: Arc<dyn EventSink>,
    system_prompt: String,
    history: Vec<ConversationTurn>,
    ghost_mode: bool,
}

impl ConversationPipeline {
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            backend: parts.backend,
            fusion: parts.fusion,
            locator: parts.locator,
            memory: parts.memory,
            stash: parts.stash,
            clipboard: parts.clipboard,
            pending: parts.pending,
            vitals: parts.vitals,
            speaker: parts.speaker,
            sink: parts.sink,
            system_prompt: parts.system_prompt,
            history: Vec::new(),
            ghost_mode: false,
        }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn ghost_mode(&self) -> bool {
        self.ghost_mode
    }

    /// Drain `mailbox` until it closes or `cancel_token` fires, then return
    /// the conversation history. A message already being handled is finished
    /// before cancellation is observed.
    pub async fn run(
        mut self,
        mut mailbox: UnboundedReceiver<Inbound>,
        cancel_token: CancellationToken,
    ) -> Vec<ConversationTurn> {
        info!("Conversation pipeline started");
        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    info!("Conversation pipeline cancelled");
                    break;
                }
                message = mailbox.recv() => match message {
                    Some(message) => self.handle(message).await,
                    None => {
                        info!("Mailbox closed; conversation pipeline stopping");
                        break;
                    }
                }
            }
        }
        self.history
    }

    /// Handle one mailbox message to completion.
    pub async fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::WakeWord { remainder } => {
                self.sink.emit(AssistantEvent::WakeWordDetected);
                if let Some(rest) = remainder.filter(|r| !r.trim().is_empty()) {
                    self.handle_utterance(Utterance::voice(rest)).await;
                }
            }
            Inbound::Utterance(utterance) => self.handle_utterance(utterance).await,
        }
    }

    async fn handle_utterance(&mut self, utterance: Utterance) {
        let text = utterance.text.trim().to_string();
        if text.is_empty() {
            return;
        }

        match utterance.source {
            UtteranceSource::ClipboardWord => self.define(&text).await,
            UtteranceSource::ClipboardPhrase => self.notice(format!(
                "📋 Copied: \"{}\"\nType 'explain' if you want me to explain this.",
                clipboard_preview(&text)
            )),
            UtteranceSource::Typed | UtteranceSource::Voice | UtteranceSource::QuickAction => {
                self.sink.emit(AssistantEvent::UserMessage {
                    text: text.clone(),
                    source: utterance.source,
                });
                self.set_status(AssistantStatus::Processing);
                if let Err(e) = self.process(&text).await {
                    error!(error = %e, "Turn aborted");
                    self.notice(format!("Something went wrong: {}", e));
                    self.sink.emit(AssistantEvent::InputReleased);
                }
                self.set_status(AssistantStatus::Ready);
            }
        }
    }

    /// Classify one direct utterance and drive its turn to a terminal state.
    pub async fn process(&mut self, text: &str) -> Result<(), ChatError> {
        let mut turn = Turn::new();
        turn.advance(TurnState::Classified)?;
        let classification = classify(text);
        debug!(turn_id = %turn.id(), ?classification, "Utterance classified");

        match classification {
            Classification::Command(CommandKind::Reserved(ReservedCommand::Explain)) => {
                match self.clipboard_for_explain() {
                    Some((clip, from_pending)) => {
                        let outcome = self.converse(turn, &explain_prompt(&clip)).await?;
                        if outcome == TurnState::Failed && from_pending {
                            debug!("Explain failed; phrase kept for another try");
                            self.pending.set(clip);
                        }
                        Ok(())
                    }
                    None => {
                        turn.advance(TurnState::FastPath)?;
                        self.notice("Nothing in clipboard to explain.");
                        turn.advance(TurnState::Completed)
                    }
                }
            }
            Classification::Command(command) => {
                turn.advance(TurnState::FastPath)?;
                self.run_command(command).await;
                turn.advance(TurnState::Completed)
            }
            Classification::FileSearch(term) => {
                let locator = self.locator.clone();
                let query = term.clone();
                let outcome = match tokio::task::spawn_blocking(move || locator.locate(&query)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(term = %term, error = %e, "File search task failed");
                        None
                    }
                };

                match outcome {
                    Some(outcome) => {
                        turn.advance(TurnState::FastPath)?;
                        self.notice(outcome.report);
                        if let Some(path) = outcome.primary_folder {
                            self.sink.emit(AssistantEvent::FolderAvailable { path });
                        }
                        turn.advance(TurnState::Completed)
                    }
                    None => self.converse(turn, text).await.map(|_| ()),
                }
            }
            Classification::Conversational => self.converse(turn, text).await.map(|_| ()),
        }
    }

    /// The chat path: context fusion, one chat call, history on success.
    /// Returns the terminal state the turn reached.
    async fn converse(&mut self, mut turn: Turn, text: &str) -> Result<TurnState, ChatError> {
        turn.advance(TurnState::ContextBuilding)?;
        self.sink.emit(AssistantEvent::InputLocked);

        let context = match self.fusion.assemble(text).await {
            Ok(context) => context,
            Err(e) => {
                turn.advance(TurnState::Failed)?;
                warn!(turn_id = %turn.id(), error = %e, "Context fusion failed");
                self.sink.emit(AssistantEvent::TurnFailed {
                    turn_id: turn.id(),
                    reason: e.to_string(),
                });
                self.sink.emit(AssistantEvent::InputReleased);
                return Ok(TurnState::Failed);
            }
        };
        let message = augment_message(text, &context);

        turn.advance(TurnState::Dispatched)?;
        self.sink.emit(AssistantEvent::Pending { turn_id: turn.id() });

        match self
            .backend
            .invoke(&self.system_prompt, &self.history, &message)
            .await
        {
            Ok(reply) => {
                turn.advance(TurnState::Completed)?;
                self.history.push(ConversationTurn::user(text));
                self.history.push(ConversationTurn::assistant(reply.clone()));
                info!(turn_id = %turn.id(), history = self.history.len(), "Turn completed");
                self.speaker.speak(&reply);
                self.sink.emit(AssistantEvent::Finalized {
                    turn_id: turn.id(),
                    reply,
                });
            }
            Err(e) => {
                turn.advance(TurnState::Failed)?;
                warn!(turn_id = %turn.id(), error = %e, "Chat call failed");
                self.sink.emit(AssistantEvent::TurnFailed {
                    turn_id: turn.id(),
                    reason: e.to_string(),
                });
            }
        }

        self.sink.emit(AssistantEvent::InputReleased);
        Ok(turn.state())
    }

    /// One-shot definition of a copied word. No history, no context.
    async fn define(&mut self, word: &str) {
        self.notice(format!("📖 Defining: \"{}\"", word));

        let turn_id = Uuid::new_v4();
        self.sink.emit(AssistantEvent::Pending { turn_id });

        match self
            .backend
            .invoke(&self.system_prompt, &[], &define_prompt(word))
            .await
        {
            Ok(reply) => {
                self.speaker.speak(&reply);
                self.sink.emit(AssistantEvent::Finalized { turn_id, reply });
            }
            Err(e) => {
                warn!(%turn_id, error = %e, "Definition failed");
                self.sink.emit(AssistantEvent::TurnFailed {
                    turn_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn run_command(&mut self, command: CommandKind) {
        match command {
            CommandKind::Reserved(ReservedCommand::Ghost) => {
                self.ghost_mode = !self.ghost_mode;
                self.sink.emit(AssistantEvent::GhostModeChanged {
                    enabled: self.ghost_mode,
                });
                self.notice(if self.ghost_mode {
                    "👻 Ghost Mode ON — I'm semi-transparent now."
                } else {
                    "👻 Ghost Mode OFF — Back to full opacity."
                });
            }
            CommandKind::Reserved(ReservedCommand::Status) => {
                let vitals = self.vitals.clone();
                let text = match tokio::task::spawn_blocking(move || vitals.sample()).await {
                    Ok(Ok(vitals)) => vitals.report(),
                    Ok(Err(e)) => format!("Could not read system vitals: {}", e),
                    Err(e) => format!("Could not read system vitals: {}", e),
                };
                self.notice(text);
            }
            CommandKind::Reserved(ReservedCommand::Stash) => {
                let text = self.stash_clipboard();
                self.notice(text);
            }
            CommandKind::Reserved(ReservedCommand::Explain) => {
                // Routed through the chat path by `process`.
                debug!("Explain reached the command runner");
            }
            CommandKind::Remember(note) => {
                let text = self.remember(&note).await;
                self.notice(text);
            }
        }
    }

    fn stash_clipboard(&self) -> String {
        let text = match self.clipboard.read_text() {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                debug!(error = %e, "Clipboard unreadable");
                String::new()
            }
        };
        if text.is_empty() {
            return "Nothing in clipboard to stash.".to_string();
        }

        match self.stash.append(&text) {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "stash.md".to_string());
                format!("Stashed to {} ✅\n📍 {}", name, path.display())
            }
            Err(e) => format!("Could not stash: {}", e),
        }
    }

    async fn remember(&self, note: &str) -> String {
        if note.trim().is_empty() {
            return "What should I remember?".to_string();
        }
        match self.memory.add_note(note).await {
            Ok(_) => "Got it, I'll remember that!".to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to save note");
                format!("Could not save that note: {}", e)
            }
        }
    }

    /// The pending clipboard phrase, else the live clipboard. The flag is
    /// set when the text came out of the pending slot.
    fn clipboard_for_explain(&self) -> Option<(String, bool)> {
        if let Some(text) = self.pending.take() {
            return Some((text, true));
        }
        match self.clipboard.read_text() {
            Ok(text) => {
                let text = text.trim().to_string();
                (!text.is_empty()).then_some((text, false))
            }
            Err(e) => {
                debug!(error = %e, "Clipboard unreadable");
                None
            }
        }
    }

    fn notice(&self, text: impl Into<String>) {
        self.sink.emit(AssistantEvent::Notice { text: text.into() });
    }

    fn set_status(&self, status: AssistantStatus) {
        self.sink.emit(AssistantEvent::Status { status });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_augment_without_context_is_raw() {
        assert_eq!(augment_message("hello", ""), "hello");
        assert_eq!(augment_message("hello", "  \n"), "hello");
    }

    #[test]
    fn test_augment_with_context() {
        let framed = augment_message("How do I call?", "Tap the camera.");
        assert!(framed.starts_with("IMPORTANT: You MUST answer using ONLY the information below."));
        assert!(framed.contains("\n\nINFORMATION:\nTap the camera.\n\nUSER QUESTION: How do I call?"));
    }

    #[test]
    fn test_prompts() {
        assert_eq!(
            define_prompt("ephemeral"),
            "Define this word or term in simple, clear language in 2-3 sentences maximum: 'ephemeral'"
        );
        assert_eq!(explain_prompt("a b c"), "Explain this in simple terms: a b c");
    }

    #[test]
    fn test_clipboard_preview_truncates() {
        assert_eq!(clipboard_preview("short"), "short");
        let long = "x".repeat(81);
        let preview = clipboard_preview(&long);
        assert_eq!(preview.chars().count(), 83);
        assert!(preview.ends_with("..."));
    }
}
