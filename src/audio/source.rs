//! Audio capture sources
//!
//! `cpal` streams are not `Send`, so the hardware source runs its stream
//! on a dedicated thread and drains buffers into a bounded channel. The
//! rest of the pipeline only ever sees [`AudioFrame`]s.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};

use crate::{Error, Result};

/// Frame channel depth; the capture callback drops frames when full
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// How often the capture thread checks for shutdown
const STOP_POLL: Duration = Duration::from_millis(50);

/// One buffer of interleaved float samples from a capture device
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Interleaved samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Samples per second per channel
    pub sample_rate: u32,

    /// Interleaved channel count
    pub channels: u16,
}

/// Capture capability behind an async frame channel
#[async_trait]
pub trait AudioSource: Send {
    /// Begin capturing; frames arrive on the returned channel until the
    /// source is stopped or fails
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device
    async fn stop(&mut self);

    /// Whether a capture session is active
    fn is_capturing(&self) -> bool;

    /// Human-readable source name for logs
    fn name(&self) -> &str;
}

/// Default-host microphone source
pub struct Microphone {
    device_name: Option<String>,
    stop: Arc<AtomicBool>,
    capturing: bool,
}

impl Microphone {
    /// Create a source for the named device, or the default input device
    #[must_use]
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stop: Arc::new(AtomicBool::new(false)),
            capturing: false,
        }
    }
}

#[async_trait]
impl AudioSource for Microphone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            return Err(Error::Audio("capture already running".to_string()));
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        self.stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&self.stop);
        let device_name = self.device_name.clone();

        std::thread::Builder::new()
            .name("salam-capture".to_string())
            .spawn(move || capture_thread(device_name, &frame_tx, ready_tx, &stop))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.capturing = true;
                Ok(frame_rx)
            }
            Ok(Err(message)) => Err(Error::Audio(message)),
            Err(_) => Err(Error::Audio(
                "capture thread exited before starting".to_string(),
            )),
        }
    }

    async fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.capturing = false;
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Body of the dedicated capture thread: the stream lives here until the
/// stop flag is raised or every receiver is gone
fn capture_thread(
    device_name: Option<String>,
    frames: &mpsc::Sender<AudioFrame>,
    ready: oneshot::Sender<std::result::Result<(), String>>,
    stop: &AtomicBool,
) {
    let stream = match open_input_stream(device_name.as_deref(), frames.clone()) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(message) => {
            let _ = ready.send(Err(message));
            return;
        }
    };

    while !stop.load(Ordering::Relaxed) && !frames.is_closed() {
        std::thread::park_timeout(STOP_POLL);
    }

    drop(stream);
    tracing::debug!("capture stream closed");
}

/// Open the input stream and wire its callback into the frame channel
fn open_input_stream(
    device_name: Option<&str>,
    frames: mpsc::Sender<AudioFrame>,
) -> std::result::Result<cpal::Stream, String> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| e.to_string())?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .ok_or_else(|| format!("input device '{name}' not found"))?,
        None => host
            .default_input_device()
            .ok_or_else(|| "no input device available".to_string())?,
    };

    let config = device.default_input_config().map_err(|e| e.to_string())?;
    let sample_format = config.sample_format();
    let sample_rate = config.sample_rate().0;
    let channels = config.channels();

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate,
        channels,
        format = %sample_format,
        "audio capture initialized"
    );

    let err_fn = |err| tracing::error!(error = %err, "audio capture error");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => {
            let tx = frames;
            device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.try_send(AudioFrame {
                        samples: data.to_vec(),
                        sample_rate,
                        channels,
                    });
                },
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::I16 => {
            let tx = frames;
            device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let samples = data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                    let _ = tx.try_send(AudioFrame {
                        samples,
                        sample_rate,
                        channels,
                    });
                },
                err_fn,
                None,
            )
        }
        other => return Err(format!("unsupported sample format {other}")),
    }
    .map_err(|e| e.to_string())?;

    stream.play().map_err(|e| e.to_string())?;
    Ok(stream)
}

/// Plays a fixed list of frames; for tests and headless runs
pub struct ScriptedSource {
    frames: Vec<AudioFrame>,
    hold_open: bool,
    capturing: bool,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            hold_open: false,
            capturing: false,
        }
    }

    /// Keep the frame channel open after the script runs out instead of
    /// signalling end-of-stream
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait]
impl AudioSource for ScriptedSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY.max(self.frames.len() + 1));
        let frames = std::mem::take(&mut self.frames);
        let hold_open = self.hold_open;

        tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
            if hold_open {
                tx.closed().await;
            }
        });

        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) {
        self.capturing = false;
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
