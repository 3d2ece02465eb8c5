//! Wake/sleep state machine
//!
//! Combines the transcript stream, the recorder, the inactivity timer,
//! chat submission, and response playback into one controller task. The
//! render loop observes it through a watch channel of [`Snapshot`]s and
//! talks back through [`Command`]s.
//!
//! Submissions are serialized: at most one `/chat-audio` request is in
//! flight, later recordings queue in completion order.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::api::{ApiError, ChatApi, ChatResponse, Scenario};
use crate::audio::playback::Player;
use crate::audio::recorder::Recorder;
use crate::audio::source::AudioSource;
use crate::audio::wav::{self, AudioClip};
use crate::speech::trigger::is_trigger;

/// Silence while awake before falling back asleep
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(15);

const CHANNEL_CAPACITY: usize = 16;

/// Produces a fresh audio source per recording session
pub type SourceFactory = Box<dyn Fn() -> Box<dyn AudioSource> + Send>;

/// The two operating states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WakeState {
    /// Eyes closed, listening only for the trigger phrase
    #[default]
    Asleep,

    /// Eyes open, recording and conversing
    Awake,
}

/// Manual commands from the key handler
#[derive(Debug, Clone, Copy)]
pub enum Command {
    /// Force the asleep state immediately
    Sleep,

    /// Replay the last response clip
    Play,
}

/// Controller state published to the renderer
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub state: WakeState,

    /// A recording session is active
    pub recording: bool,

    /// A chat request is in flight
    pub busy: bool,

    /// Last model answer, if any
    pub answer: Option<String>,

    /// Last submission failure, one line
    pub error: Option<String>,

    /// Playback failed and the clip is kept for manual replay
    pub replay_armed: bool,
}

enum Outcome {
    Submitted(Result<ChatResponse, ApiError>),
    Played(crate::Result<()>),
}

/// Drives the face through its wake/sleep lifecycle
pub struct WakeController {
    api: Arc<dyn ChatApi>,
    player: Arc<dyn Player>,
    scenario: Scenario,
    system_prompt: Option<String>,
    source_factory: SourceFactory,
    recorder: Recorder,
    recordings: mpsc::Receiver<Vec<u8>>,
    transcripts: mpsc::Receiver<String>,
    transcripts_open: bool,
    commands_tx: mpsc::Sender<Command>,
    commands: mpsc::Receiver<Command>,
    outcomes_tx: mpsc::Sender<Outcome>,
    outcomes: mpsc::Receiver<Outcome>,
    shutdown: watch::Receiver<bool>,
    snapshot_tx: watch::Sender<Snapshot>,
    snapshot: Snapshot,
    deadline: Option<Instant>,
    queue: VecDeque<Vec<u8>>,
    in_flight: bool,
    last_clip: Option<AudioClip>,
}

impl WakeController {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        api: Arc<dyn ChatApi>,
        player: Arc<dyn Player>,
        scenario: Scenario,
        system_prompt: Option<String>,
        source_factory: SourceFactory,
        recordings_dir: Option<PathBuf>,
        transcripts: mpsc::Receiver<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (recordings_tx, recordings) = mpsc::channel(CHANNEL_CAPACITY);
        let (commands_tx, commands) = mpsc::channel(CHANNEL_CAPACITY);
        let (outcomes_tx, outcomes) = mpsc::channel(CHANNEL_CAPACITY);
        let (snapshot_tx, _) = watch::channel(Snapshot::default());

        Self {
            api,
            player,
            scenario,
            system_prompt,
            source_factory,
            recorder: Recorder::new(recordings_tx, recordings_dir),
            recordings,
            transcripts,
            transcripts_open: true,
            commands_tx,
            commands,
            outcomes_tx,
            outcomes,
            shutdown,
            snapshot_tx,
            snapshot: Snapshot::default(),
            deadline: None,
            queue: VecDeque::new(),
            in_flight: false,
            last_clip: None,
        }
    }

    /// Sender for manual commands
    #[must_use]
    pub fn commands(&self) -> mpsc::Sender<Command> {
        self.commands_tx.clone()
    }

    /// Subscribe to state snapshots
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Drive the state machine until shutdown
    pub async fn run(mut self) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                transcript = self.transcripts.recv(), if self.transcripts_open => {
                    match transcript {
                        Some(text) => self.on_transcript(&text).await,
                        None => {
                            tracing::warn!("transcript stream closed");
                            self.transcripts_open = false;
                        }
                    }
                }
                recording = self.recordings.recv() => {
                    if let Some(bytes) = recording {
                        self.on_recording(bytes);
                    }
                }
                command = self.commands.recv() => {
                    if let Some(command) = command {
                        self.on_command(command).await;
                    }
                }
                outcome = self.outcomes.recv() => {
                    if let Some(outcome) = outcome {
                        self.on_outcome(outcome);
                    }
                }
                () = async move {
                    if let Some(at) = deadline {
                        tokio::time::sleep_until(at).await;
                    }
                }, if deadline.is_some() => {
                    tracing::info!("inactivity timeout");
                    self.fall_asleep().await;
                }
            }
        }

        self.recorder.stop().await;
        tracing::debug!("wake controller stopped");
    }

    async fn on_transcript(&mut self, text: &str) {
        match self.snapshot.state {
            WakeState::Asleep => {
                if is_trigger(text) {
                    tracing::info!(transcript = %text, "trigger phrase heard");
                    self.wake().await;
                }
            }
            WakeState::Awake => {
                // any recognized speech counts as activity; a repeated
                // trigger does not start a second recording
                self.deadline = Some(Instant::now() + INACTIVITY_TIMEOUT);
            }
        }
    }

    async fn wake(&mut self) {
        self.snapshot.state = WakeState::Awake;
        self.snapshot.error = None;
        self.recorder.start((self.source_factory)()).await;
        self.snapshot.recording = self.recorder.is_recording();
        self.deadline = Some(Instant::now() + INACTIVITY_TIMEOUT);
        self.publish();
        tracing::info!(state = "awake", "state transition");
    }

    async fn fall_asleep(&mut self) {
        self.deadline = None;
        self.recorder.stop().await;
        self.snapshot.state = WakeState::Asleep;
        self.snapshot.recording = false;
        self.publish();
        tracing::info!(state = "asleep", "state transition");

        // best effort, the face goes to sleep either way
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.clear_history().await {
                tracing::warn!(error = %e, "history clear failed");
            }
        });
    }

    fn on_recording(&mut self, bytes: Vec<u8>) {
        tracing::debug!(bytes = bytes.len(), queued = self.queue.len(), "recording finished");
        self.snapshot.recording = self.recorder.is_recording();
        self.queue.push_back(bytes);
        self.pump();
        self.publish();
    }

    /// Start the next submission unless one is already in flight
    fn pump(&mut self) {
        if self.in_flight {
            return;
        }
        let Some(bytes) = self.queue.pop_front() else {
            return;
        };

        self.in_flight = true;
        self.snapshot.busy = true;

        let api = Arc::clone(&self.api);
        let scenario = self.scenario;
        let system_prompt = self.system_prompt.clone();
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = api
                .chat_audio(bytes, Some(scenario), system_prompt.as_deref())
                .await;
            let _ = outcomes.send(Outcome::Submitted(result)).await;
        });
    }

    fn on_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Submitted(Ok(response)) => {
                self.in_flight = false;
                self.snapshot.busy = false;
                self.snapshot.error = None;
                tracing::info!(answer = %response.model_answer_ru, "chat response received");
                self.snapshot.answer = Some(response.model_answer_ru);

                if let Some(encoded) = response.audio_base64 {
                    match decode_response_audio(&encoded) {
                        Ok(clip) => {
                            self.last_clip = Some(clip.clone());
                            self.spawn_playback(clip);
                        }
                        Err(e) => tracing::warn!(error = %e, "response audio unusable"),
                    }
                }
            }
            Outcome::Submitted(Err(e)) => {
                self.in_flight = false;
                self.snapshot.busy = false;
                tracing::warn!(error = %e, "chat submission failed");
                self.snapshot.error = Some(e.to_string());
            }
            Outcome::Played(Ok(())) => {
                self.snapshot.replay_armed = false;
            }
            Outcome::Played(Err(e)) => {
                // playback degrades to a manual affordance
                tracing::warn!(error = %e, "playback failed, replay armed");
                self.snapshot.replay_armed = true;
            }
        }

        self.pump();
        self.publish();
    }

    fn spawn_playback(&self, clip: AudioClip) {
        let player = Arc::clone(&self.player);
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = player.play(clip).await;
            let _ = outcomes.send(Outcome::Played(result)).await;
        });
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Sleep => {
                if self.snapshot.state == WakeState::Awake {
                    tracing::info!("manual sleep");
                    self.fall_asleep().await;
                }
            }
            Command::Play => {
                if let Some(clip) = self.last_clip.clone() {
                    tracing::info!("manual replay");
                    self.spawn_playback(clip);
                }
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot.clone());
    }
}

fn decode_response_audio(encoded: &str) -> crate::Result<AudioClip> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| crate::Error::Playback(format!("bad audio payload: {e}")))?;
    wav::decode(&bytes)
}
