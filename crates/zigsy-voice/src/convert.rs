//! Sample format helpers shared by the capture callback and the recognizer.

/// Rate every consumer downstream of the microphone works at.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Average interleaved channels into one.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler. Good enough for speech going to Whisper.
pub fn resample(mono: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || mono.is_empty() {
        return mono.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let out_len = (mono.len() as f64 / step).floor().max(1.0) as usize;
    let last = mono.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let lo = (pos as usize).min(last);
            let hi = (lo + 1).min(last);
            let t = (pos - lo as f64) as f32;
            mono[lo] + (mono[hi] - mono[lo]) * t
        })
        .collect()
}

pub fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

pub fn from_i16(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|s| *s as f32 / 32768.0).collect()
}

/// Root mean square level, 0.0 for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let power: f32 = samples.iter().map(|s| s * s).sum();
    (power / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_channels() {
        assert_eq!(downmix(&[0.25, 0.75, -1.0, 1.0], 2), vec![0.5, 0.0]);
        assert_eq!(downmix(&[0.5, 0.25], 1), vec![0.5, 0.25]);
        // A trailing partial frame is dropped.
        assert_eq!(downmix(&[0.1, 0.1, 0.9], 2).len(), 1);
    }

    #[test]
    fn test_resample_48k_to_16k() {
        let input: Vec<f32> = (0..480).map(|i| i as f32).collect();
        let out = resample(&input, 48_000, 16_000);
        assert_eq!(out.len(), 160);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 3.0);
        assert_eq!(resample(&input, 16_000, 16_000), input);
    }

    #[test]
    fn test_i16_conversion_clamps() {
        assert_eq!(to_i16(&[0.0, 2.0, -2.0]), vec![0, i16::MAX, -i16::MAX]);
        let back = from_i16(&[16384]);
        assert!((back[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }
}
