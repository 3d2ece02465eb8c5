//! Error types for the salam face client

use thiserror::Error;

use crate::api::ApiError;

/// Result type alias for salam operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the salam face client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture or encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// Backend API error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
