//! Application wiring and the render loop

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::{mpsc, watch};

use crate::api::ChatClient;
use crate::audio::playback::SpeakerPlayer;
use crate::audio::source::{AudioSource, Microphone};
use crate::config::Config;
use crate::face::FaceModel;
use crate::speech::hosted::HostedRecognizer;
use crate::speech::manager;
use crate::speech::recognizer::SpeechRecognizer;
use crate::wake::{Command, SourceFactory, WakeController};
use crate::{Result, face};

/// Render tick; also the animation time step
const TICK: Duration = Duration::from_millis(50);

/// Restores the terminal on every exit path
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(LeaveAlternateScreen);
    }
}

/// Run the face until the user quits (q, Esc, or Ctrl-C)
///
/// # Errors
///
/// Returns an error when startup fails; runtime failures are shown on
/// the face instead of aborting.
pub async fn run(config: Config) -> Result<()> {
    let Config {
        server_url,
        stt_url,
        language,
        scenario,
        system_prompt,
        recordings_dir,
        input_device,
    } = config;

    let client = ChatClient::new(&server_url)?;
    tracing::info!(server = %server_url, scenario = %scenario, "starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (transcripts_tx, transcripts_rx) = mpsc::channel(16);

    let recognizer: Option<Box<dyn SpeechRecognizer>> = stt_url.map(|url| {
        Box::new(HostedRecognizer::new(url, language, input_device.clone()))
            as Box<dyn SpeechRecognizer>
    });
    let recognition = manager::spawn(recognizer, transcripts_tx, shutdown_rx.clone());

    let sources: SourceFactory =
        Box::new(move || Box::new(Microphone::new(input_device.clone())) as Box<dyn AudioSource>);

    let controller = WakeController::new(
        Arc::new(client),
        Arc::new(SpeakerPlayer),
        scenario,
        system_prompt,
        sources,
        recordings_dir,
        transcripts_rx,
        shutdown_rx,
    );
    let commands = controller.commands();
    let mut snapshots = controller.snapshots();
    let controller_task = tokio::spawn(controller.run());

    let guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let mut model = FaceModel::new();
    let mut tick = tokio::time::interval(TICK);

    'render: loop {
        tick.tick().await;

        while crossterm::event::poll(Duration::ZERO)? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break 'render,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break 'render;
                    }
                    KeyCode::Char('s') => {
                        let _ = commands.send(Command::Sleep).await;
                    }
                    KeyCode::Char('p') => {
                        let _ = commands.send(Command::Play).await;
                    }
                    _ => {}
                }
            }
        }

        let snapshot = snapshots.borrow_and_update().clone();
        model.tick(TICK, &snapshot);
        terminal.draw(|frame| face::render::draw(frame, &model, &snapshot))?;
    }

    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = controller_task.await;
    let _ = recognition.await;
    drop(guard);

    Ok(())
}
