//! Shared helpers for integration tests

#![allow(dead_code)]

use salam_face::audio::AudioFrame;

/// Generate mono sine samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sine_samples(frequency: f32, duration_secs: f32, amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let count = (sample_rate as f32 * duration_secs) as usize;
    (0..count)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate a mono sine capture frame
pub fn sine_frame(frequency: f32, duration_secs: f32, amplitude: f32, sample_rate: u32) -> AudioFrame {
    AudioFrame {
        samples: sine_samples(frequency, duration_secs, amplitude, sample_rate),
        sample_rate,
        channels: 1,
    }
}

/// Generate a mono silence frame
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn silence_frame(duration_secs: f32, sample_rate: u32) -> AudioFrame {
    let count = (sample_rate as f32 * duration_secs) as usize;
    AudioFrame {
        samples: vec![0.0; count],
        sample_rate,
        channels: 1,
    }
}
