//! Configuration for the salam face client
//!
//! Precedence: CLI flags > environment variables > TOML file > defaults.
//! The file lives at `~/.config/salam/config.toml`; every field in it is
//! an optional overlay on top of the defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::api::Scenario;

/// Default chat backend base URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Default recognition locale hint
pub const DEFAULT_LANGUAGE: &str = "ru-RU";

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat backend base URL
    pub server_url: String,

    /// Hosted speech-to-text endpoint; `None` disables recognition
    pub stt_url: Option<String>,

    /// Recognition locale hint passed to the STT service
    pub language: String,

    /// Conversation scenario sent with every chat request
    pub scenario: Scenario,

    /// Optional system prompt forwarded to the backend
    pub system_prompt: Option<String>,

    /// Directory where completed recordings are archived (off when unset)
    pub recordings_dir: Option<PathBuf>,

    /// Input device name override (default device when unset)
    pub input_device: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            stt_url: None,
            language: DEFAULT_LANGUAGE.to_string(),
            scenario: Scenario::default(),
            system_prompt: None,
            recordings_dir: None,
            input_device: None,
        }
    }
}

/// Values supplied on the command line, overriding everything else
#[derive(Debug, Default)]
pub struct Overrides {
    /// `--server`
    pub server_url: Option<String>,

    /// `--scenario`
    pub scenario: Option<Scenario>,

    /// `--system-prompt`
    pub system_prompt: Option<String>,
}

impl Config {
    /// Load configuration with the standard precedence
    ///
    /// An explicit `--config` path must exist and parse; the default path
    /// is a best-effort overlay like the rest of the chain.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly supplied config file cannot be
    /// read or parsed.
    pub fn load(file_path: Option<&Path>, cli: Overrides) -> Result<Self> {
        let file = match file_path {
            Some(path) => ConfigFile::from_path(path)?,
            None => default_file_path()
                .map_or_else(ConfigFile::default, |p| ConfigFile::from_default_path(&p)),
        };
        Ok(Self::merge(file, EnvOverrides::from_env(), cli))
    }

    /// Merge the three override layers onto the defaults
    fn merge(file: ConfigFile, env: EnvOverrides, cli: Overrides) -> Self {
        let default = Self::default();
        Self {
            server_url: cli
                .server_url
                .or(env.server_url)
                .or(file.server_url)
                .unwrap_or(default.server_url),
            stt_url: env.stt_url.or(file.stt_url),
            language: env.language.or(file.language).unwrap_or(default.language),
            scenario: cli
                .scenario
                .or(env.scenario)
                .or(file.scenario)
                .unwrap_or(default.scenario),
            system_prompt: cli
                .system_prompt
                .or(env.system_prompt)
                .or(file.system_prompt),
            recordings_dir: env.recordings_dir.or(file.recordings_dir),
            input_device: env.input_device.or(file.input_device),
        }
    }
}

/// TOML config file schema; every field is an optional override
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Chat backend base URL
    pub server_url: Option<String>,

    /// Hosted speech-to-text endpoint
    pub stt_url: Option<String>,

    /// Recognition locale hint
    pub language: Option<String>,

    /// Conversation scenario ("studying" or "dialog")
    pub scenario: Option<Scenario>,

    /// System prompt forwarded to the backend
    pub system_prompt: Option<String>,

    /// Recording archive directory
    pub recordings_dir: Option<PathBuf>,

    /// Input device name override
    pub input_device: Option<String>,
}

impl ConfigFile {
    /// Load from an explicitly supplied path; errors propagate
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from the default path; missing or broken files fall back to
    /// defaults with a warning
    fn from_default_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded config file");
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse config file, using defaults"
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read config file"
                );
                Self::default()
            }
        }
    }
}

/// Environment variable overrides
#[derive(Debug, Default)]
struct EnvOverrides {
    server_url: Option<String>,
    stt_url: Option<String>,
    language: Option<String>,
    scenario: Option<Scenario>,
    system_prompt: Option<String>,
    recordings_dir: Option<PathBuf>,
    input_device: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        let scenario = std::env::var("SALAM_SCENARIO")
            .ok()
            .and_then(|s| match s.parse() {
                Ok(scenario) => Some(scenario),
                Err(e) => {
                    tracing::warn!(value = %s, error = %e, "ignoring SALAM_SCENARIO");
                    None
                }
            });

        Self {
            server_url: std::env::var("SALAM_SERVER_URL").ok(),
            stt_url: std::env::var("SALAM_STT_URL").ok(),
            language: std::env::var("SALAM_LANGUAGE").ok(),
            scenario,
            system_prompt: std::env::var("SALAM_SYSTEM_PROMPT").ok(),
            recordings_dir: std::env::var("SALAM_RECORDINGS_DIR").ok().map(PathBuf::from),
            input_device: std::env::var("SALAM_INPUT_DEVICE").ok(),
        }
    }
}

/// Return the default config file path: `~/.config/salam/config.toml`
pub fn default_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("salam").join("config.toml"))
}

/// Return the log file path for TUI runs, creating its directory
///
/// Uses `~/.local/state/salam/salam.log` on Linux, falling back to the
/// data directory on platforms without a state dir.
pub fn log_file_path() -> Option<PathBuf> {
    let dirs = directories::BaseDirs::new()?;
    let base = dirs.state_dir().unwrap_or_else(|| dirs.data_dir());
    let dir = base.join("salam");

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "failed to create log directory");
        return None;
    }

    Some(dir.join("salam.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::merge(
            ConfigFile::default(),
            EnvOverrides::default(),
            Overrides::default(),
        );
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.language, DEFAULT_LANGUAGE);
        assert_eq!(config.scenario, Scenario::Dialog);
        assert!(config.stt_url.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            server_url = "http://backend:9000"
            scenario = "studying"
            stt_url = "http://stt:5000/transcribe"
            "#,
        )
        .unwrap();

        let config = Config::merge(file, EnvOverrides::default(), Overrides::default());
        assert_eq!(config.server_url, "http://backend:9000");
        assert_eq!(config.scenario, Scenario::Studying);
        assert_eq!(config.stt_url.as_deref(), Some("http://stt:5000/transcribe"));
    }

    #[test]
    fn env_beats_file_and_cli_beats_env() {
        let file: ConfigFile = toml::from_str(r#"server_url = "http://file:1""#).unwrap();
        let env = EnvOverrides {
            server_url: Some("http://env:2".to_string()),
            ..EnvOverrides::default()
        };
        let merged = Config::merge(file, env, Overrides::default());
        assert_eq!(merged.server_url, "http://env:2");

        let file: ConfigFile = toml::from_str(r#"server_url = "http://file:1""#).unwrap();
        let env = EnvOverrides {
            server_url: Some("http://env:2".to_string()),
            ..EnvOverrides::default()
        };
        let cli = Overrides {
            server_url: Some("http://cli:3".to_string()),
            ..Overrides::default()
        };
        assert_eq!(Config::merge(file, env, cli).server_url, "http://cli:3");
    }

    #[test]
    fn unknown_scenario_in_file_is_a_parse_error() {
        let result: std::result::Result<ConfigFile, _> = toml::from_str(r#"scenario = "karaoke""#);
        assert!(result.is_err());
    }
}
