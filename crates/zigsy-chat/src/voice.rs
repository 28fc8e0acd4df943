//! Push-to-talk voice input.
//!
//! [`VoiceCapture`] buffers samples between start and stop. The recorded
//! buffer is handed to [`spawn_transcription`], which turns it into a voice
//! utterance on the pipeline mailbox without blocking the pipeline.
//! [`PushToTalk`] ties the two together behind a single toggle.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use zigsy_core::events::{AssistantEvent, EventSink};
use zigsy_core::types::{Inbound, Utterance};

use crate::error::ChatError;

/// Speech-to-text collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, samples: Vec<f32>, sample_rate: u32) -> Result<String, ChatError>;
}

/// Recording state for one push-to-talk capture.
#[derive(Debug)]
pub struct VoiceCapture {
    sample_rate: u32,
    /// Longest recording kept, in seconds. Samples past it are dropped.
    pub max_duration_seconds: u32,
    active: bool,
    buffer: Vec<f32>,
}

impl VoiceCapture {
    pub fn new(sample_rate: u32, max_duration_seconds: u32) -> Self {
        Self {
            sample_rate,
            max_duration_seconds,
            active: false,
            buffer: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start_listening(&mut self) -> Result<(), ChatError> {
        if self.active {
            return Err(ChatError::VoiceError(
                "Voice capture is already active".to_string(),
            ));
        }
        self.buffer.clear();
        self.active = true;
        Ok(())
    }

    /// Append captured samples. Ignored while not recording.
    pub fn push_samples(&mut self, samples: &[f32]) {
        if !self.active {
            return;
        }
        let limit = self.sample_rate as usize * self.max_duration_seconds as usize;
        let room = limit.saturating_sub(self.buffer.len());
        self.buffer.extend_from_slice(&samples[..samples.len().min(room)]);
    }

    /// Stop recording and return the captured samples.
    pub fn stop_listening(&mut self) -> Result<Vec<f32>, ChatError> {
        if !self.active {
            return Err(ChatError::VoiceError(
                "Voice capture is not active".to_string(),
            ));
        }
        self.active = false;
        Ok(std::mem::take(&mut self.buffer))
    }
}

/// Transcribe a recording in the background and queue the text as a voice
/// utterance. Empty transcripts are dropped; failures are logged only.
pub fn spawn_transcription(
    transcriber: Arc<dyn Transcriber>,
    samples: Vec<f32>,
    sample_rate: u32,
    mailbox: UnboundedSender<Inbound>,
    sink: Arc<dyn EventSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if samples.is_empty() {
            debug!("Empty recording; nothing to transcribe");
            return;
        }

        sink.emit(AssistantEvent::Notice {
            text: "Transcribing...".to_string(),
        });

        let text = match transcriber.transcribe(samples, sample_rate).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Transcription failed");
                return;
            }
        };

        if text.is_empty() {
            debug!("Transcription was empty; dropped");
            return;
        }

        info!(chars = text.len(), "Transcription ready");
        if mailbox.send(Inbound::Utterance(Utterance::voice(text))).is_err() {
            warn!("Pipeline mailbox closed; transcription dropped");
        }
    })
}

/// Shared recorder plus the transcription hand-off. The audio thread feeds
/// [`PushToTalk::recorder`]; the front end calls [`PushToTalk::toggle`].
pub struct PushToTalk {
    capture: Arc<Mutex<VoiceCapture>>,
    transcriber: Arc<dyn Transcriber>,
    mailbox: UnboundedSender<Inbound>,
    sink: Arc<dyn EventSink>,
}

impl PushToTalk {
    pub fn new(
        capture: VoiceCapture,
        transcriber: Arc<dyn Transcriber>,
        mailbox: UnboundedSender<Inbound>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            capture: Arc::new(Mutex::new(capture)),
            transcriber,
            mailbox,
            sink,
        }
    }

    pub fn recorder(&self) -> Arc<Mutex<VoiceCapture>> {
        Arc::clone(&self.capture)
    }

    /// Start recording, or stop and transcribe what was recorded.
    ///
    /// Returns `true` when a recording has just started. Must be called
    /// inside a Tokio runtime.
    pub fn toggle(&self) -> Result<bool, ChatError> {
        let mut capture = self
            .capture
            .lock()
            .map_err(|e| ChatError::VoiceError(format!("recorder lock poisoned: {}", e)))?;

        if !capture.is_active() {
            capture.start_listening()?;
            drop(capture);
            info!("Push-to-talk recording started");
            self.sink.emit(AssistantEvent::Notice {
                text: "🎙️ Listening... type /talk again when you're done.".to_string(),
            });
            return Ok(true);
        }

        let samples = capture.stop_listening()?;
        let sample_rate = capture.sample_rate();
        drop(capture);
        info!(samples = samples.len(), "Push-to-talk recording stopped");

        spawn_transcription(
            Arc::clone(&self.transcriber),
            samples,
            sample_rate,
            self.mailbox.clone(),
            Arc::clone(&self.sink),
        );
        Ok(false)
    }
}
