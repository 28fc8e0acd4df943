//! Zigsy Voice crate - microphone input and speech-to-text.
//!
//! The microphone delivers 16 kHz mono frames on a std channel. The audio
//! router fans them out to the push-to-talk recorder and the wake-word
//! listener. Transcription runs on whisper.cpp when built with the `whisper`
//! feature; otherwise loading the model fails and voice input stays off.

pub mod convert;
pub mod microphone;
pub mod router;
pub mod whisper;

pub use convert::WHISPER_SAMPLE_RATE;
pub use microphone::Microphone;
pub use router::spawn_audio_router;
pub use whisper::{Endpointer, WhisperEngine, WhisperRecognizer, WhisperTranscriber};
