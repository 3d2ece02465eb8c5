//! Speech recognizer capability
//!
//! A recognizer runs one session at a time and publishes events on a
//! channel; the session lifecycle (restarts, terminal failures) lives in
//! [`super::manager`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Why a recognition session failed
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    /// The host refused microphone access; terminal for the process
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// The capture device failed or is missing
    #[error("audio device error: {0}")]
    Device(String),

    /// The speech-to-text service could not be reached or answered badly
    #[error("transcription failed: {0}")]
    Transport(String),
}

impl RecognitionError {
    /// Terminal errors stop the restart loop permanently
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Events published by a recognition session
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// One recognized utterance
    Transcript(String),

    /// The session ended on its own
    Ended,

    /// The session failed
    Error(RecognitionError),
}

/// Continuous speech recognition behind an event channel
#[async_trait]
pub trait SpeechRecognizer: Send {
    /// Open a session; events arrive on the returned channel until the
    /// session ends, fails, or is stopped
    async fn start(&mut self) -> mpsc::Receiver<RecognizerEvent>;

    /// Tear the current session down
    async fn stop(&mut self);
}

/// Replays fixed event schedules; each `start` consumes the next script
///
/// A session stays open after its script runs out, and an exhausted
/// recognizer yields sessions that never produce anything.
pub struct ScriptedRecognizer {
    scripts: VecDeque<Vec<(Duration, RecognizerEvent)>>,
    sessions: Arc<AtomicUsize>,
    task: Option<JoinHandle<()>>,
}

impl ScriptedRecognizer {
    #[must_use]
    pub fn new(scripts: Vec<Vec<(Duration, RecognizerEvent)>>) -> Self {
        Self {
            scripts: scripts.into(),
            sessions: Arc::new(AtomicUsize::new(0)),
            task: None,
        }
    }

    /// Counter of sessions opened so far, usable after the recognizer
    /// has been handed off
    #[must_use]
    pub fn session_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.sessions)
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start(&mut self) -> mpsc::Receiver<RecognizerEvent> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.pop_front();
        let (tx, rx) = mpsc::channel(16);

        self.task = Some(tokio::spawn(async move {
            if let Some(events) = script {
                for (delay, event) in events {
                    tokio::time::sleep(delay).await;
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            tx.closed().await;
        }));

        rx
    }

    async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
