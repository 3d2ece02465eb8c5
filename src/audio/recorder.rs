//! Fixed-ceiling recording sessions
//!
//! A session drains its audio source into a sample buffer until it is
//! stopped, the source ends, or the ceiling elapses, then encodes the
//! buffer as WAV and emits exactly one completion. Stopping an idle
//! recorder, or stopping one twice, emits nothing extra.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::source::{AudioFrame, AudioSource};
use super::wav;

/// Hard ceiling on a single recording session
pub const RECORDING_CEILING: Duration = Duration::from_secs(10);

/// Sample rate stamped on sessions that never saw a frame
const FALLBACK_SAMPLE_RATE: u32 = 16_000;

/// Owns at most one active recording session
pub struct Recorder {
    completions: mpsc::Sender<Vec<u8>>,
    archive_dir: Option<PathBuf>,
    active: Option<Session>,
}

struct Session {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Recorder {
    /// Completed recordings are sent to `completions` as encoded WAV;
    /// when `archive_dir` is set each one is also written to disk
    #[must_use]
    pub fn new(completions: mpsc::Sender<Vec<u8>>, archive_dir: Option<PathBuf>) -> Self {
        Self {
            completions,
            archive_dir,
            active: None,
        }
    }

    /// Begin a session on a fresh source; ignored while one is running
    pub async fn start(&mut self, mut source: Box<dyn AudioSource>) {
        if let Some(session) = &self.active {
            if !session.task.is_finished() {
                tracing::debug!("recording already active");
                return;
            }
            self.active = None;
        }

        let frames = match source.start().await {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, source = source.name(), "audio source unavailable, skipping recording");
                return;
            }
        };

        tracing::debug!(source = source.name(), "recording started");
        let (stop_tx, stop_rx) = oneshot::channel();
        let completions = self.completions.clone();
        let archive_dir = self.archive_dir.clone();
        let task = tokio::spawn(run_session(source, frames, stop_rx, completions, archive_dir));
        self.active = Some(Session { stop_tx, task });
    }

    /// Stop the active session and wait for its completion to be emitted
    ///
    /// Safe to call when idle; a second call never produces a second
    /// completion.
    pub async fn stop(&mut self) {
        if let Some(session) = self.active.take() {
            let _ = session.stop_tx.send(());
            let _ = session.task.await;
        }
    }

    /// Whether a session is currently accumulating audio
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.active.as_ref().is_some_and(|s| !s.task.is_finished())
    }
}

async fn run_session(
    mut source: Box<dyn AudioSource>,
    mut frames: mpsc::Receiver<AudioFrame>,
    mut stop_rx: oneshot::Receiver<()>,
    completions: mpsc::Sender<Vec<u8>>,
    archive_dir: Option<PathBuf>,
) {
    let started = tokio::time::Instant::now();
    let deadline = tokio::time::sleep(RECORDING_CEILING);
    tokio::pin!(deadline);

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = None;
    let mut channels = None;

    loop {
        tokio::select! {
            () = &mut deadline => {
                tracing::debug!("recording ceiling reached");
                break;
            }
            _ = &mut stop_rx => break,
            frame = frames.recv() => match frame {
                Some(frame) => {
                    sample_rate.get_or_insert(frame.sample_rate);
                    channels.get_or_insert(frame.channels);
                    samples.extend_from_slice(&frame.samples);
                }
                None => {
                    tracing::debug!("capture stream ended early");
                    break;
                }
            }
        }
    }

    source.stop().await;

    let sample_rate = sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE);
    let channels = channels.unwrap_or(1).max(1);

    match wav::encode(&samples, sample_rate, channels) {
        Ok(bytes) => {
            tracing::debug!(
                samples = samples.len(),
                bytes = bytes.len(),
                elapsed = ?started.elapsed(),
                "recording complete"
            );
            if let Some(dir) = archive_dir {
                archive(&dir, &bytes);
            }
            let _ = completions.send(bytes).await;
        }
        Err(e) => tracing::warn!(error = %e, "failed to encode recording"),
    }
}

/// Best-effort copy of the finished clip to the archive directory
fn archive(dir: &Path, bytes: &[u8]) {
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = dir.join(format!("recording_{epoch_ms}.wav"));

    if let Err(e) = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, bytes)) {
        tracing::warn!(path = %path.display(), error = %e, "failed to archive recording");
    } else {
        tracing::debug!(path = %path.display(), "archived recording");
    }
}
