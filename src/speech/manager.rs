//! Recognition session lifecycle
//!
//! Keeps a recognizer listening for as long as the application runs:
//! sessions that end on their own restart after 500 ms, failed ones
//! after 1 s, indefinitely. A permission denial is terminal and
//! disables recognition for the rest of the process.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::recognizer::{RecognizerEvent, SpeechRecognizer};

/// Delay before restarting after a natural session end
pub const RESTART_AFTER_END: Duration = Duration::from_millis(500);

/// Delay before restarting after a recoverable failure
pub const RESTART_AFTER_ERROR: Duration = Duration::from_millis(1000);

enum SessionEnd {
    Natural,
    Errored,
}

/// Spawn the lifecycle loop
///
/// Recognized utterances are forwarded to `transcripts`. A `None`
/// recognizer turns the loop into a no-op so the rest of the
/// application keeps working without voice input.
pub fn spawn(
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    transcripts: mpsc::Sender<String>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(recognizer) = recognizer else {
            tracing::warn!("no speech recognizer configured, voice wake disabled");
            return;
        };
        run(recognizer, transcripts, shutdown).await;
    })
}

async fn run(
    mut recognizer: Box<dyn SpeechRecognizer>,
    transcripts: mpsc::Sender<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let mut events = recognizer.start().await;
        tracing::debug!("recognition session started");

        let end = loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        recognizer.stop().await;
                        return;
                    }
                }
                event = events.recv() => match event {
                    Some(RecognizerEvent::Transcript(text)) => {
                        tracing::debug!(transcript = %text, "recognized");
                        if transcripts.send(text).await.is_err() {
                            recognizer.stop().await;
                            return;
                        }
                    }
                    Some(RecognizerEvent::Ended) | None => break SessionEnd::Natural,
                    Some(RecognizerEvent::Error(error)) if error.is_terminal() => {
                        tracing::warn!(error = %error, "recognition permanently disabled");
                        recognizer.stop().await;
                        return;
                    }
                    Some(RecognizerEvent::Error(error)) => {
                        tracing::warn!(error = %error, "recognition session failed");
                        break SessionEnd::Errored;
                    }
                }
            }
        };

        recognizer.stop().await;

        let delay = match end {
            SessionEnd::Natural => RESTART_AFTER_END,
            SessionEnd::Errored => RESTART_AFTER_ERROR,
        };
        tracing::debug!(delay = ?delay, "restarting recognition");

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}
