//! Fans microphone frames out to the push-to-talk recorder and the
//! wake-word listener.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, info};

use zigsy_chat::VoiceCapture;

use crate::convert::to_i16;

/// Run the router on its own thread. It exits when the microphone side of
/// `frames` hangs up.
pub fn spawn_audio_router(
    frames: Receiver<Vec<f32>>,
    recorder: Option<Arc<Mutex<VoiceCapture>>>,
    wake_frames: Option<Sender<Vec<i16>>>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("zigsy-audio".to_string())
        .spawn(move || {
            let mut wake_frames = wake_frames;
            info!("Audio router started");
            while let Ok(frame) = frames.recv() {
                if let Some(recorder) = &recorder {
                    if let Ok(mut capture) = recorder.lock() {
                        capture.push_samples(&frame);
                    }
                }
                let wake_closed = wake_frames
                    .as_ref()
                    .is_some_and(|tx| tx.send(to_i16(&frame)).is_err());
                if wake_closed {
                    debug!("Wake-word listener gone; no longer forwarding frames");
                    wake_frames = None;
                }
            }
            info!("Microphone closed; audio router exiting");
        })
}
