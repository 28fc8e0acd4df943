//! Whisper speech-to-text.
//!
//! [`WhisperEngine`] owns the loaded model. [`WhisperTranscriber`] serves
//! push-to-talk recordings; [`WhisperRecognizer`] cuts the live microphone
//! stream into utterances for the wake-word listener. Without the `whisper`
//! feature, [`WhisperEngine::load`] fails and neither is ever built.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use zigsy_chat::{ChatError, Transcriber};
use zigsy_core::error::{Result, ZigsyError};
use zigsy_watch::SpeechRecognizer;

use crate::convert::{from_i16, resample, rms, WHISPER_SAMPLE_RATE};

pub struct WhisperEngine {
    #[cfg(feature = "whisper")]
    ctx: whisper_rs::WhisperContext,
    language: String,
}

impl WhisperEngine {
    pub fn language(&self) -> &str {
        &self.language
    }
}

#[cfg(feature = "whisper")]
impl WhisperEngine {
    /// Load a GGML model file.
    pub fn load(model_path: &Path, language: &str) -> Result<Self> {
        use whisper_rs::{WhisperContext, WhisperContextParameters};

        if !model_path.exists() {
            return Err(ZigsyError::Transcription(format!(
                "Whisper model not found: {}",
                model_path.display()
            )));
        }
        let path = model_path.to_str().ok_or_else(|| {
            ZigsyError::Transcription(format!("Model path is not UTF-8: {}", model_path.display()))
        })?;

        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| ZigsyError::Transcription(format!("Cannot load Whisper model: {}", e)))?;
        tracing::info!(model = %model_path.display(), language, "Whisper model loaded");

        Ok(Self {
            ctx,
            language: language.to_string(),
        })
    }

    /// Transcribe 16 kHz mono samples. CPU bound; call off the async threads.
    pub fn transcribe_blocking(&self, samples: &[f32]) -> Result<String> {
        use whisper_rs::{FullParams, SamplingStrategy};

        let failed = |stage: &str, e: whisper_rs::WhisperError| {
            ZigsyError::Transcription(format!("Whisper {} failed: {}", stage, e))
        };

        let mut state = self.ctx.create_state().map_err(|e| failed("state setup", e))?;
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language((self.language != "auto").then_some(self.language.as_str()));
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state.full(params, samples).map_err(|e| failed("inference", e))?;

        let segments = state.full_n_segments().map_err(|e| failed("segment count", e))?;
        let mut text = Vec::with_capacity(segments.max(0) as usize);
        for i in 0..segments {
            let segment = state.full_get_segment_text(i).map_err(|e| failed("segment read", e))?;
            let segment = segment.trim();
            if !segment.is_empty() {
                text.push(segment.to_string());
            }
        }

        tracing::debug!(segments, chars = text.iter().map(String::len).sum::<usize>(), "Whisper pass done");
        Ok(text.join(" "))
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperEngine {
    pub fn load(model_path: &Path, _language: &str) -> Result<Self> {
        Err(ZigsyError::Transcription(format!(
            "built without the `whisper` feature; cannot load {}",
            model_path.display()
        )))
    }

    pub fn transcribe_blocking(&self, _samples: &[f32]) -> Result<String> {
        Err(ZigsyError::Transcription(
            "built without the `whisper` feature".to_string(),
        ))
    }
}

/// Push-to-talk transcriber. Inference runs on the blocking pool.
pub struct WhisperTranscriber {
    engine: Arc<WhisperEngine>,
}

impl WhisperTranscriber {
    pub fn new(engine: Arc<WhisperEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, samples: Vec<f32>, sample_rate: u32) -> std::result::Result<String, ChatError> {
        let samples = resample(&samples, sample_rate, WHISPER_SAMPLE_RATE);
        let engine = Arc::clone(&self.engine);
        let text = tokio::task::spawn_blocking(move || engine.transcribe_blocking(&samples))
            .await
            .map_err(|e| ChatError::VoiceError(format!("transcription task failed: {}", e)))??;
        Ok(text)
    }
}

/// RMS level above which a frame counts as speech.
const SPEECH_LEVEL: f32 = 0.015;
/// Trailing silence that ends an utterance.
const HANGOVER_SECONDS: f32 = 0.8;
/// Utterances are cut at this length even mid-speech.
const MAX_UTTERANCE_SECONDS: usize = 8;

/// Energy based utterance boundary detection.
///
/// Leading silence is discarded. Once speech is heard, frames accumulate
/// until enough quiet follows or the length cap is hit.
#[derive(Debug)]
pub struct Endpointer {
    hangover: usize,
    max_len: usize,
    buffer: Vec<f32>,
    in_speech: bool,
    quiet: usize,
}

impl Endpointer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            hangover: (sample_rate as f32 * HANGOVER_SECONDS) as usize,
            max_len: sample_rate as usize * MAX_UTTERANCE_SECONDS,
            buffer: Vec::new(),
            in_speech: false,
            quiet: 0,
        }
    }

    /// Feed one frame; returns a finished utterance when a boundary is hit.
    pub fn push(&mut self, frame: &[f32]) -> Option<Vec<f32>> {
        let loud = rms(frame) >= SPEECH_LEVEL;
        if !self.in_speech && !loud {
            return None;
        }

        self.in_speech = true;
        self.buffer.extend_from_slice(frame);
        self.quiet = if loud { 0 } else { self.quiet + frame.len() };

        if self.quiet >= self.hangover || self.buffer.len() >= self.max_len {
            self.in_speech = false;
            self.quiet = 0;
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }
}

/// Streaming recognizer for the wake-word listener.
pub struct WhisperRecognizer {
    engine: Arc<WhisperEngine>,
    endpointer: Endpointer,
}

impl WhisperRecognizer {
    pub fn new(engine: Arc<WhisperEngine>) -> Self {
        Self {
            engine,
            endpointer: Endpointer::new(WHISPER_SAMPLE_RATE),
        }
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn accept_frame(&mut self, frame: &[i16]) -> Result<Option<String>> {
        let Some(utterance) = self.endpointer.push(&from_i16(frame)) else {
            return Ok(None);
        };
        let text = self.engine.transcribe_blocking(&utterance)?;
        Ok((!text.trim().is_empty()).then_some(text))
    }
}
