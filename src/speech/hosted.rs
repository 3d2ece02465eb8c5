//! Hosted speech recognition over HTTP
//!
//! Listens to the microphone, segments the stream into utterances by RMS
//! energy, and posts each utterance as WAV to a whisper-server style
//! endpoint that answers `{"text": ...}`. One `start` call is one
//! session; any transport failure ends the session and leaves the
//! restart decision to the manager.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::source::{AudioFrame, AudioSource, Microphone};
use crate::audio::wav;

use super::recognizer::{RecognitionError, RecognizerEvent, SpeechRecognizer};

/// Minimum RMS energy treated as speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Trailing silence that closes an utterance
const SILENCE_HANGOVER: Duration = Duration::from_millis(800);

/// Longest single utterance posted to the service
const MAX_UTTERANCE: Duration = Duration::from_secs(8);

/// Shortest segment worth transcribing
const MIN_UTTERANCE: Duration = Duration::from_millis(300);

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Recognizer backed by a hosted transcription endpoint
pub struct HostedRecognizer {
    stt_url: String,
    language: Option<String>,
    input_device: Option<String>,
    http: reqwest::Client,
    task: Option<JoinHandle<()>>,
}

impl HostedRecognizer {
    /// `language` is a locale hint like `ru-RU`; the service receives
    /// its primary subtag
    #[must_use]
    pub fn new(stt_url: String, language: String, input_device: Option<String>) -> Self {
        let language = language
            .split('-')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        Self {
            stt_url,
            language,
            input_device,
            http: reqwest::Client::new(),
            task: None,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for HostedRecognizer {
    async fn start(&mut self) -> mpsc::Receiver<RecognizerEvent> {
        let (tx, rx) = mpsc::channel(16);

        let mut source = Microphone::new(self.input_device.clone());
        let frames = match source.start().await {
            Ok(frames) => frames,
            Err(e) => {
                let message = e.to_string();
                let error = if message.contains("denied") || message.contains("permission") {
                    RecognitionError::PermissionDenied(message)
                } else {
                    RecognitionError::Device(message)
                };
                let _ = tx.send(RecognizerEvent::Error(error)).await;
                return rx;
            }
        };

        tracing::debug!(url = %self.stt_url, "hosted recognition session started");
        self.task = Some(tokio::spawn(run_session(
            source,
            frames,
            tx,
            self.http.clone(),
            self.stt_url.clone(),
            self.language.clone(),
        )));
        rx
    }

    async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_session(
    mut source: Microphone,
    mut frames: mpsc::Receiver<AudioFrame>,
    events: mpsc::Sender<RecognizerEvent>,
    http: reqwest::Client,
    stt_url: String,
    language: Option<String>,
) {
    let mut current: Option<Utterance> = None;

    loop {
        let Some(frame) = frames.recv().await else {
            let _ = events.send(RecognizerEvent::Ended).await;
            break;
        };

        let speaking = rms(&frame.samples) > ENERGY_THRESHOLD;
        let finished = match current.as_mut() {
            None if speaking => {
                tracing::trace!("utterance started");
                current = Some(Utterance::begin(frame));
                false
            }
            None => false,
            Some(utterance) => {
                utterance.push(frame, speaking);
                utterance.complete()
            }
        };

        if !finished {
            continue;
        }
        let Some(utterance) = current.take() else {
            continue;
        };
        if !utterance.long_enough() {
            tracing::trace!("utterance too short, discarded");
            continue;
        }

        match transcribe(&http, &stt_url, language.as_deref(), &utterance).await {
            Ok(text) if text.trim().is_empty() => {}
            Ok(text) => {
                if events.send(RecognizerEvent::Transcript(text)).await.is_err() {
                    break;
                }
            }
            Err(message) => {
                let _ = events
                    .send(RecognizerEvent::Error(RecognitionError::Transport(message)))
                    .await;
                break;
            }
        }
    }

    source.stop().await;
}

/// One utterance being accumulated
struct Utterance {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    trailing_silence: usize,
}

impl Utterance {
    fn begin(frame: AudioFrame) -> Self {
        Self {
            sample_rate: frame.sample_rate,
            channels: frame.channels.max(1),
            samples: frame.samples,
            trailing_silence: 0,
        }
    }

    fn push(&mut self, frame: AudioFrame, speaking: bool) {
        if speaking {
            self.trailing_silence = 0;
        } else {
            self.trailing_silence += frame.samples.len();
        }
        self.samples.extend(frame.samples);
    }

    /// Interleaved sample count corresponding to a wall-clock duration
    #[allow(clippy::cast_possible_truncation)]
    fn samples_for(&self, duration: Duration) -> usize {
        let per_second = u64::from(self.sample_rate) * u64::from(self.channels);
        (per_second * duration.as_millis() as u64 / 1000) as usize
    }

    fn complete(&self) -> bool {
        self.trailing_silence >= self.samples_for(SILENCE_HANGOVER)
            || self.samples.len() >= self.samples_for(MAX_UTTERANCE)
    }

    fn long_enough(&self) -> bool {
        self.samples.len().saturating_sub(self.trailing_silence)
            >= self.samples_for(MIN_UTTERANCE)
    }
}

/// Post an utterance and pull the transcript out of the response
async fn transcribe(
    http: &reqwest::Client,
    url: &str,
    language: Option<&str>,
    utterance: &Utterance,
) -> std::result::Result<String, String> {
    let bytes = wav::encode(&utterance.samples, utterance.sample_rate, utterance.channels)
        .map_err(|e| e.to_string())?;

    tracing::debug!(bytes = bytes.len(), "posting utterance for transcription");

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name("speech.wav")
        .mime_str("audio/wav")
        .map_err(|e| e.to_string())?;
    let mut form = reqwest::multipart::Form::new().part("file", part);
    if let Some(lang) = language {
        form = form.text("language", lang.to_string());
    }

    let response = http
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("speech service error {status}: {body}"));
    }

    let parsed: TranscriptionResponse = response.json().await.map_err(|e| e.to_string())?;
    tracing::debug!(transcript = %parsed.text, "utterance transcribed");
    Ok(parsed.text)
}

/// Root-mean-square energy of a sample buffer
#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_frame(duration_ms: u64) -> AudioFrame {
        #[allow(clippy::cast_possible_truncation)]
        let len = (16_000 * duration_ms / 1000) as usize;
        AudioFrame {
            samples: vec![0.5; len],
            sample_rate: 16_000,
            channels: 1,
        }
    }

    fn quiet_frame(duration_ms: u64) -> AudioFrame {
        #[allow(clippy::cast_possible_truncation)]
        let len = (16_000 * duration_ms / 1000) as usize;
        AudioFrame {
            samples: vec![0.001; len],
            sample_rate: 16_000,
            channels: 1,
        }
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert!(rms(&[]) < f32::EPSILON);
        assert!(rms(&[0.0; 100]) < f32::EPSILON);
    }

    #[test]
    fn rms_of_a_constant_signal_is_its_magnitude() {
        assert!((rms(&[0.5; 100]) - 0.5).abs() < 1e-6);
        assert!((rms(&[-0.5; 100]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn hangover_closes_an_utterance() {
        let mut utterance = Utterance::begin(loud_frame(500));
        utterance.push(quiet_frame(500), false);
        assert!(!utterance.complete());

        utterance.push(quiet_frame(400), false);
        assert!(utterance.complete());
        assert!(utterance.long_enough());
    }

    #[test]
    fn speech_resets_the_hangover() {
        let mut utterance = Utterance::begin(loud_frame(500));
        utterance.push(quiet_frame(700), false);
        utterance.push(loud_frame(100), true);
        assert!(!utterance.complete());
    }

    #[test]
    fn runaway_utterances_are_cut_at_the_maximum() {
        let mut utterance = Utterance::begin(loud_frame(1000));
        for _ in 0..7 {
            utterance.push(loud_frame(1000), true);
        }
        assert!(utterance.complete());
    }

    #[test]
    fn blips_are_too_short_to_post() {
        let mut utterance = Utterance::begin(loud_frame(100));
        utterance.push(quiet_frame(800), false);
        assert!(utterance.complete());
        assert!(!utterance.long_enough());
    }

    #[test]
    fn locale_hints_shrink_to_the_primary_subtag() {
        let recognizer =
            HostedRecognizer::new("http://stt:5000".to_string(), "ru-RU".to_string(), None);
        assert_eq!(recognizer.language.as_deref(), Some("ru"));

        let recognizer =
            HostedRecognizer::new("http://stt:5000".to_string(), "tt".to_string(), None);
        assert_eq!(recognizer.language.as_deref(), Some("tt"));
    }
}
