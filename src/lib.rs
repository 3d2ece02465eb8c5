//! Salam Face - voice-activated animated character for the Salam backend
//!
//! Renders a terminal face that sleeps until it hears a spoken trigger
//! phrase, records a short clip, forwards it to a chat/translation REST
//! backend, and plays the synthesized answer back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    Render loop                        │
//! │   face model  │  particles  │  status  │  keys       │
//! └────────────────────┬─────────────────────────────────┘
//!                      │ snapshots
//! ┌────────────────────▼─────────────────────────────────┐
//! │                 Wake controller                       │
//! │  trigger match │ recorder │ inactivity │ submission  │
//! └──────┬──────────────────────────────────────┬────────┘
//!        │ transcripts                          │ WAV
//! ┌──────▼───────────┐              ┌───────────▼────────┐
//! │ Speech recognition│              │   Chat backend     │
//! │  (hosted STT)     │              │  /chat-audio, ...  │
//! └──────────────────┘              └────────────────────┘
//! ```

pub mod api;
pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod face;
pub mod speech;
pub mod wake;

pub use api::{ApiError, ChatClient, ChatResponse, Scenario};
pub use config::Config;
pub use error::{Error, Result};
