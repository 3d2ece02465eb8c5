//! Audio playback for synthesized responses
//!
//! Clips arrive at whatever rate the backend synthesized them; the
//! speaker player folds them to mono, resamples to the output device
//! rate with linear interpolation, and fans the result out to every
//! device channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::wav::AudioClip;
use crate::{Error, Result};

/// Playback capability
#[async_trait]
pub trait Player: Send + Sync {
    /// Play a clip to completion
    ///
    /// # Errors
    ///
    /// Returns an error when no output device accepts the clip.
    async fn play(&self, clip: AudioClip) -> Result<()>;
}

/// Plays through the default output device
pub struct SpeakerPlayer;

#[async_trait]
impl Player for SpeakerPlayer {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        tokio::task::spawn_blocking(move || play_blocking(&clip))
            .await
            .map_err(|e| Error::Playback(e.to_string()))?
    }
}

#[allow(clippy::too_many_lines)]
fn play_blocking(clip: &AudioClip) -> Result<()> {
    if clip.samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device available".to_string()))?;
    let config = device
        .default_output_config()
        .map_err(|e| Error::Playback(e.to_string()))?;
    let sample_format = config.sample_format();
    let device_rate = config.sample_rate().0;
    let out_channels = usize::from(config.channels());

    let mono = to_mono(&clip.samples, clip.channels);
    let samples = if clip.sample_rate == device_rate {
        mono
    } else {
        resample_linear(&mono, clip.sample_rate, device_rate)
    };

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        clip_rate = clip.sample_rate,
        device_rate,
        samples = samples.len(),
        "playback starting"
    );

    let total = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let err_fn = |err| tracing::error!(error = %err, "audio playback error");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(out_channels) {
                        let sample = if pos < samples.len() {
                            let s = samples[pos];
                            pos += 1;
                            s
                        } else {
                            finished.store(true, Ordering::Relaxed);
                            0.0
                        };
                        for out in &mut *frame {
                            *out = sample;
                        }
                    }
                    position.store(pos, Ordering::Relaxed);
                },
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::I16 => {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            device.build_output_stream(
                &config.into(),
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(out_channels) {
                        let sample = if pos < samples.len() {
                            let s = samples[pos];
                            pos += 1;
                            s
                        } else {
                            finished.store(true, Ordering::Relaxed);
                            0.0
                        };
                        #[allow(clippy::cast_possible_truncation)]
                        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                        for out in &mut *frame {
                            *out = value;
                        }
                    }
                    position.store(pos, Ordering::Relaxed);
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(Error::Playback(format!(
                "unsupported output sample format {other}"
            )));
        }
    }
    .map_err(|e| Error::Playback(e.to_string()))?;

    stream.play().map_err(|e| Error::Playback(e.to_string()))?;

    // Poll until drained, with a guard deadline in case the device stalls
    let duration_ms = (total as u64).saturating_mul(1000) / u64::from(device_rate.max(1));
    let deadline = std::time::Instant::now() + Duration::from_millis(duration_ms + 500);
    while !finished.load(Ordering::Relaxed) {
        if std::time::Instant::now() > deadline {
            tracing::warn!("playback deadline exceeded, releasing stream");
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    // let the tail of the buffer leave the device
    std::thread::sleep(Duration::from_millis(100));
    drop(stream);

    tracing::debug!(samples = total, "playback complete");
    Ok(())
}

/// Average interleaved channels down to mono
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return samples.to_vec();
    }

    #[allow(clippy::cast_precision_loss)]
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampling, good enough for speech
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn resample_linear(input: &[f32], from: u32, to: u32) -> Vec<f32> {
    if input.is_empty() || from == to {
        return input.to_vec();
    }

    let ratio = f64::from(from) / f64::from(to);
    let out_len = (input.len() as f64 / ratio).round() as usize;
    let last = input.len() - 1;

    (0..out_len)
        .map(|i| {
            let src = i as f64 * ratio;
            let idx = (src as usize).min(last);
            let frac = (src - idx as f64) as f32;
            let a = input[idx];
            let b = input[(idx + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, b) in actual.iter().zip(expected) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn stereo_folds_to_mono_by_averaging() {
        let mono = to_mono(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_close(&mono, &[0.5, 0.5, 0.0]);
    }

    #[test]
    fn mono_passes_through_unchanged() {
        let samples = [0.1, 0.2, 0.3];
        assert_close(&to_mono(&samples, 1), &samples);
    }

    #[test]
    fn resampling_scales_the_length() {
        let input: Vec<f32> = (0..160).map(|i| f32::from(i16::try_from(i).unwrap()) / 160.0).collect();
        let doubled = resample_linear(&input, 16_000, 32_000);
        assert_eq!(doubled.len(), 320);

        let halved = resample_linear(&input, 16_000, 8_000);
        assert_eq!(halved.len(), 80);
    }

    #[test]
    fn identity_resample_is_a_copy() {
        let input = [0.5, -0.5, 0.25];
        assert_close(&resample_linear(&input, 24_000, 24_000), &input);
    }

    #[test]
    fn upsampling_interpolates_between_neighbors() {
        let doubled = resample_linear(&[0.0, 1.0], 1, 2);
        assert_eq!(doubled.len(), 4);
        assert!((doubled[1] - 0.5).abs() < f32::EPSILON);
    }
}
