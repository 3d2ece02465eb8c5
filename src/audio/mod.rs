//! Audio capture, WAV codec, recording sessions, and playback

pub mod playback;
pub mod recorder;
pub mod source;
pub mod wav;

pub use playback::{Player, SpeakerPlayer};
pub use recorder::Recorder;
pub use source::{AudioFrame, AudioSource, Microphone, ScriptedSource};
pub use wav::AudioClip;
