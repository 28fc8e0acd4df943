//! Microphone capture via cpal (WASAPI on Windows).
//!
//! The capture callback downmixes and resamples every buffer to 16 kHz mono
//! and sends it over a std channel. Dropping the [`Microphone`] stops the
//! stream, which closes the channel. On other platforms `open` returns
//! `ZigsyError::Audio`.

use std::sync::mpsc::Receiver;

#[cfg(target_os = "windows")]
use tracing::{info, warn};

use zigsy_core::error::{Result, ZigsyError};

use crate::convert::WHISPER_SAMPLE_RATE;

pub struct Microphone {
    device: String,
    #[cfg(target_os = "windows")]
    _stream: cpal::Stream,
}

impl Microphone {
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Rate of the frames delivered on the channel.
    pub fn sample_rate(&self) -> u32 {
        WHISPER_SAMPLE_RATE
    }
}

#[cfg(target_os = "windows")]
impl Microphone {
    /// Open `device_name` ("default" or a name substring) and start capture.
    pub fn open(device_name: &str) -> Result<(Self, Receiver<Vec<f32>>)> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
        use cpal::SampleFormat;

        use crate::convert::{downmix, resample};

        let host = cpal::default_host();
        let device = if device_name == "default" {
            host.default_input_device()
                .ok_or_else(|| ZigsyError::Audio("No default input device".into()))?
        } else {
            let wanted = device_name.to_lowercase();
            host.input_devices()
                .map_err(|e| ZigsyError::Audio(format!("Cannot list input devices: {}", e)))?
                .find(|d| d.name().is_ok_and(|n| n.to_lowercase().contains(&wanted)))
                .ok_or_else(|| ZigsyError::Audio(format!("Input device '{}' not found", device_name)))?
        };
        let name = device.name().unwrap_or_else(|_| device_name.to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| ZigsyError::Audio(format!("No usable input config: {}", e)))?;
        let format = supported.sample_format();
        let config = supported.config();
        let channels = config.channels as usize;
        let rate = config.sample_rate.0;

        let (tx, rx) = std::sync::mpsc::channel();
        let on_error = |e: cpal::StreamError| warn!(error = %e, "Microphone stream error");

        let stream = match format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(resample(&downmix(data, channels), rate, WHISPER_SAMPLE_RATE));
                },
                on_error,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let floats = crate::convert::from_i16(data);
                    let _ = tx.send(resample(&downmix(&floats, channels), rate, WHISPER_SAMPLE_RATE));
                },
                on_error,
                None,
            ),
            other => {
                return Err(ZigsyError::Audio(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| ZigsyError::Audio(format!("Cannot build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| ZigsyError::Audio(format!("Cannot start input stream: {}", e)))?;

        info!(device = %name, rate, channels, "Microphone capture started");
        Ok((
            Self {
                device: name,
                _stream: stream,
            },
            rx,
        ))
    }
}

#[cfg(not(target_os = "windows"))]
impl Microphone {
    pub fn open(device_name: &str) -> Result<(Self, Receiver<Vec<f32>>)> {
        Err(ZigsyError::Audio(format!(
            "Microphone capture ('{}') is only available on Windows",
            device_name
        )))
    }
}
