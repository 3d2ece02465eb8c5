//! Recording session behavior: ceiling, idempotent stop, and the
//! exactly-one-completion contract

use std::time::Duration;

use salam_face::audio::{Recorder, ScriptedSource, wav};
use tokio::sync::mpsc;

mod common;
use common::sine_frame;

#[tokio::test(start_paused = true)]
async fn session_auto_stops_at_the_ceiling() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut recorder = Recorder::new(tx, None);

    let source = ScriptedSource::new(vec![sine_frame(440.0, 0.5, 0.5, 16_000)]).hold_open();
    recorder.start(Box::new(source)).await;
    assert!(recorder.is_recording());

    // no stop call; the ten second ceiling fires on its own
    let bytes = tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("ceiling should end the session")
        .expect("completion should be emitted");

    let clip = wav::decode(&bytes).unwrap();
    assert_eq!(clip.sample_rate, 16_000);
    assert_eq!(clip.samples.len(), 8_000);
}

#[tokio::test(start_paused = true)]
async fn stop_emits_exactly_one_completion() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut recorder = Recorder::new(tx, None);

    let source = ScriptedSource::new(vec![sine_frame(440.0, 0.1, 0.5, 16_000)]).hold_open();
    recorder.start(Box::new(source)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    recorder.stop().await;
    recorder.stop().await;
    assert!(!recorder.is_recording());

    let bytes = rx.recv().await.unwrap();
    assert!(bytes.len() > 44);

    // the second stop produced nothing
    assert!(
        tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .is_err()
    );
}

#[tokio::test(start_paused = true)]
async fn zero_frame_session_yields_a_valid_silent_wav() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut recorder = Recorder::new(tx, None);

    recorder
        .start(Box::new(ScriptedSource::new(vec![]).hold_open()))
        .await;
    recorder.stop().await;

    let bytes = rx.recv().await.unwrap();
    assert_eq!(bytes.len(), 44);
    let clip = wav::decode(&bytes).unwrap();
    assert!(clip.samples.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_when_idle_is_a_no_op() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut recorder = Recorder::new(tx, None);

    recorder.stop().await;
    assert!(!recorder.is_recording());
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn second_start_while_active_is_ignored() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut recorder = Recorder::new(tx, None);

    recorder
        .start(Box::new(
            ScriptedSource::new(vec![sine_frame(440.0, 0.2, 0.5, 16_000)]).hold_open(),
        ))
        .await;
    recorder
        .start(Box::new(
            ScriptedSource::new(vec![sine_frame(880.0, 0.2, 0.5, 16_000)]).hold_open(),
        ))
        .await;

    // only the first session's completion arrives
    let bytes = tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(bytes.len() > 44);
    assert!(
        tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .is_err()
    );
}

#[tokio::test(start_paused = true)]
async fn completed_recordings_are_archived_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    let mut recorder = Recorder::new(tx, Some(dir.path().to_path_buf()));

    recorder
        .start(Box::new(
            ScriptedSource::new(vec![sine_frame(440.0, 0.1, 0.5, 16_000)]).hold_open(),
        ))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    recorder.stop().await;
    let _ = rx.recv().await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("recording_") && names[0].ends_with(".wav"));
}
