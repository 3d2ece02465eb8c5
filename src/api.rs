//! HTTP client for the chat/translation backend
//!
//! Thin stateless wrapper over the four backend endpoints: health check,
//! text chat, audio chat, and history clear. Failures are tagged by
//! category so callers can tell a server rejection from an unreachable
//! server without string matching.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-wide request deadline
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Conversation mode tag sent with every chat request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Guided study mode
    Studying,

    /// Free-form dialog
    #[default]
    Dialog,
}

impl Scenario {
    /// Wire representation, also used for query parameters
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Studying => "studying",
            Self::Dialog => "dialog",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scenario {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "studying" => Ok(Self::Studying),
            "dialog" => Ok(Self::Dialog),
            other => Err(crate::Error::Config(format!(
                "unknown scenario '{other}', expected 'studying' or 'dialog'"
            ))),
        }
    }
}

/// Backend API failure, tagged by category
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server responded with a non-success status
    #[error("server error {status}: {detail}")]
    Status {
        /// HTTP status code
        status: StatusCode,
        /// Server-supplied detail, or a generic marker
        detail: String,
    },

    /// No response was received (connect failure or deadline exceeded)
    #[error("server unreachable")]
    Unreachable(#[source] reqwest::Error),

    /// The request could not be built or the response body decoded
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
}

/// Sort a transport-level error into unreachable vs request-side
fn classify(err: reqwest::Error) -> ApiError {
    if err.is_timeout() || err.is_connect() {
        ApiError::Unreachable(err)
    } else {
        ApiError::Request(err)
    }
}

/// Pull a human-readable detail out of an error response body
///
/// Accepts the backend's `{"detail": ...}` shape and the `message`
/// fallback; anything else degrades to a generic marker.
fn extract_detail(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .or_else(|| value.get("message"))
                .map(|d| match d {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        })
        .unwrap_or_else(|| "server error".to_string())
}

/// Request body for `/chat`
#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    message_tat: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<Scenario>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt_ru: Option<&'a str>,
}

/// Response shape shared by `/chat` and `/chat-audio`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Original input as understood by the server (text chat)
    #[serde(default)]
    pub input_tat: Option<String>,

    /// Transcription of the uploaded audio (audio chat)
    #[serde(default)]
    pub recognized_tat: Option<String>,

    /// Input translated to Russian
    pub translated_to_ru: String,

    /// Model answer in Russian
    pub model_answer_ru: String,

    /// Answer translated back to Tatar
    #[serde(default)]
    pub translated_back_to_tat: Option<String>,

    /// Synthesized answer as base64-encoded WAV
    #[serde(default)]
    pub audio_base64: Option<String>,
}

/// Response from `/health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// Service status marker
    pub status: String,

    /// Human-readable status message
    pub message: String,

    /// Backend version string
    pub version: String,
}

/// Chat backend operations used by the wake controller
///
/// The controller only needs the audio path and the history clear; the
/// trait keeps it testable against a recording mock.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Submit an encoded WAV clip to `/chat-audio`
    ///
    /// # Errors
    ///
    /// Returns a tagged [`ApiError`] on any failure.
    async fn chat_audio(
        &self,
        wav: Vec<u8>,
        scenario: Option<Scenario>,
        system_prompt: Option<&str>,
    ) -> Result<ChatResponse, ApiError>;

    /// Clear the server-side conversation history
    ///
    /// # Errors
    ///
    /// Returns a tagged [`ApiError`] on any failure.
    async fn clear_history(&self) -> Result<(), ApiError>;
}

/// HTTP client for the chat backend
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client for the given base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request deadline
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Request)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL this client talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `/health`
    ///
    /// # Errors
    ///
    /// Returns a tagged [`ApiError`] on any failure.
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(classify)?;
        let response = Self::check(response).await?;
        response.json().await.map_err(ApiError::Request)
    }

    /// POST `/chat` with a text message
    ///
    /// # Errors
    ///
    /// Returns a tagged [`ApiError`] on any failure.
    pub async fn chat(
        &self,
        message: &str,
        scenario: Option<Scenario>,
        system_prompt: Option<&str>,
    ) -> Result<ChatResponse, ApiError> {
        tracing::debug!(chars = message.len(), "sending text chat");

        let body = ChatBody {
            message_tat: message,
            scenario,
            system_prompt_ru: system_prompt,
        };

        let response = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(classify)?;
        let response = Self::check(response).await?;
        response.json().await.map_err(ApiError::Request)
    }

    /// POST `/clear-history`
    ///
    /// # Errors
    ///
    /// Returns a tagged [`ApiError`] on any failure.
    pub async fn clear_history_request(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/clear-history", self.base_url))
            .send()
            .await
            .map_err(classify)?;
        Self::check(response).await?;
        Ok(())
    }

    /// POST `/chat-audio` with an encoded WAV clip
    ///
    /// # Errors
    ///
    /// Returns a tagged [`ApiError`] on any failure.
    pub async fn chat_audio_request(
        &self,
        wav: Vec<u8>,
        scenario: Option<Scenario>,
        system_prompt: Option<&str>,
    ) -> Result<ChatResponse, ApiError> {
        tracing::debug!(bytes = wav.len(), "sending audio chat");

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(ApiError::Request)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self
            .http
            .post(format!("{}/chat-audio", self.base_url))
            .multipart(form);
        if let Some(scenario) = scenario {
            request = request.query(&[("scenario", scenario.as_str())]);
        }
        if let Some(prompt) = system_prompt {
            request = request.query(&[("system_prompt_ru", prompt)]);
        }

        let response = request.send().await.map_err(classify)?;
        let response = Self::check(response).await?;
        response.json().await.map_err(ApiError::Request)
    }

    /// Turn a non-success response into a tagged status error
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let detail = extract_detail(&body);
        tracing::debug!(status = %status, detail = %detail, "backend rejected request");
        Err(ApiError::Status { status, detail })
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    async fn chat_audio(
        &self,
        wav: Vec<u8>,
        scenario: Option<Scenario>,
        system_prompt: Option<&str>,
    ) -> Result<ChatResponse, ApiError> {
        self.chat_audio_request(wav, scenario, system_prompt).await
    }

    async fn clear_history(&self) -> Result<(), ApiError> {
        self.clear_history_request().await
    }
}
