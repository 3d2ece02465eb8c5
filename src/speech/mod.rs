//! Speech recognition: trigger matching, recognizer capability, and the
//! session lifecycle loop

pub mod hosted;
pub mod manager;
pub mod recognizer;
pub mod trigger;

pub use recognizer::{RecognitionError, RecognizerEvent, ScriptedRecognizer, SpeechRecognizer};
pub use trigger::is_trigger;
