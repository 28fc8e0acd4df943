//! Wake-word listener.
//!
//! Audio frames arrive over a std channel from the capture callback and are
//! fed to a streaming recognizer on a blocking thread. Each finished fragment
//! is checked for the wake phrase.

use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zigsy_core::error::Result;
use zigsy_core::types::Inbound;

use crate::controller::WatcherHandle;

/// How long to wait for a frame before rechecking for cancellation.
const FRAME_WAIT: Duration = Duration::from_secs(1);

/// Streaming speech recognizer fed 16-bit mono frames.
pub trait SpeechRecognizer: Send + 'static {
    /// Consume one frame. Returns the recognized text once an utterance
    /// boundary is reached.
    fn accept_frame(&mut self, frame: &[i16]) -> Result<Option<String>>;
}

/// Look for `wake_phrase` in `fragment`.
///
/// Returns `None` if the phrase is absent, otherwise `Some` with whatever
/// followed the phrase (or `None` when nothing did).
pub fn detect_wake_phrase(fragment: &str, wake_phrase: &str) -> Option<Option<String>> {
    let text = fragment.to_lowercase();
    let phrase = wake_phrase.trim().to_lowercase();
    if phrase.is_empty() {
        return None;
    }

    let start = text.find(&phrase)?;
    let remainder = text[start + phrase.len()..]
        .trim_start_matches(|c: char| c == ',' || c.is_whitespace())
        .trim();
    Some((!remainder.is_empty()).then(|| remainder.to_string()))
}

pub struct WakeWordListener<R: SpeechRecognizer> {
    recognizer: R,
    wake_phrase: String,
}

impl<R: SpeechRecognizer> WakeWordListener<R> {
    pub fn new(recognizer: R, wake_phrase: impl Into<String>) -> Self {
        Self {
            recognizer,
            wake_phrase: wake_phrase.into(),
        }
    }

    /// Feed one frame; returns the wake event to forward, if any.
    pub fn process_frame(&mut self, frame: &[i16]) -> Result<Option<Inbound>> {
        let Some(fragment) = self.recognizer.accept_frame(frame)? else {
            return Ok(None);
        };
        debug!(heard = %fragment, "Wake-word fragment");

        Ok(detect_wake_phrase(&fragment, &self.wake_phrase)
            .map(|remainder| Inbound::WakeWord { remainder }))
    }

    /// Run the listener on a blocking thread until cancelled or the frame
    /// source hangs up.
    pub fn spawn(
        mut self,
        frames: std_mpsc::Receiver<Vec<i16>>,
        mailbox: mpsc::UnboundedSender<Inbound>,
        cancel_token: CancellationToken,
    ) -> WatcherHandle {
        let token = cancel_token.clone();
        let handle = tokio::task::spawn_blocking(move || {
            info!(phrase = %self.wake_phrase, "Wake-word listener started");
            while !token.is_cancelled() {
                let frame = match frames.recv_timeout(FRAME_WAIT) {
                    Ok(frame) => frame,
                    Err(std_mpsc::RecvTimeoutError::Timeout) => continue,
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                        warn!("Audio source closed; wake-word listener exiting");
                        break;
                    }
                };

                match self.process_frame(&frame) {
                    Ok(Some(event)) => {
                        info!("Wake phrase detected");
                        if mailbox.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Wake-word recognizer error"),
                }
            }
            info!("Wake-word listener shutting down");
        });
        WatcherHandle::new("wake_word", cancel_token, handle)
    }
}
