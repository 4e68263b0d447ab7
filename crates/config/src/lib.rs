//! Configuration loading, validation, and session construction.
//!
//! Loads configuration from `patchsmith.toml` in the current directory with
//! `PATCHSMITH_*` environment variable overrides. Validates all settings
//! before a session is built.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use patchsmith_core::{ChatMode, Session};

/// The root configuration structure.
///
/// Maps directly to `patchsmith.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory all file operations are confined to.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// How user requests are handled by default.
    #[serde(default = "default_chat_mode")]
    pub chat_mode: ChatMode,

    /// LLM provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Sandbox settings.
    #[serde(default)]
    pub security: SecurityConfig,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_chat_mode() -> ChatMode {
    ChatMode::Agent
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Ollama server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name passed with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds. Local models can be slow to load.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "qwen2.5-coder:7b".into()
}
fn default_timeout_secs() -> u64 {
    300
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Confine writes to the work directory. The denylists stay active
    /// even when this is off.
    #[serde(default = "default_true")]
    pub strict: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            chat_mode: default_chat_mode(),
            provider: ProviderConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `./patchsmith.toml`, then apply environment
    /// variable overrides:
    /// - `PATCHSMITH_WORK_DIR`
    /// - `PATCHSMITH_MODEL`
    /// - `PATCHSMITH_BASE_URL`
    /// - `PATCHSMITH_STRICT` (`true`/`false`)
    /// - `PATCHSMITH_CHAT_MODE` (`ask`/`agent`)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(Path::new("patchsmith.toml"))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path. A missing file yields
    /// the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = std::env::var("PATCHSMITH_WORK_DIR") {
            self.work_dir = PathBuf::from(dir);
        }
        if let Ok(model) = std::env::var("PATCHSMITH_MODEL") {
            self.provider.model = model;
        }
        if let Ok(url) = std::env::var("PATCHSMITH_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Ok(strict) = std::env::var("PATCHSMITH_STRICT") {
            self.security.strict = parse_bool("PATCHSMITH_STRICT", &strict)?;
        }
        if let Ok(mode) = std::env::var("PATCHSMITH_CHAT_MODE") {
            self.chat_mode = match mode.as_str() {
                "ask" => ChatMode::Ask,
                "agent" => ChatMode::Agent,
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "PATCHSMITH_CHAT_MODE must be 'ask' or 'agent', got '{other}'"
                    )));
                }
            };
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.model must not be empty".into(),
            ));
        }
        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "provider.base_url must be an http(s) URL, got '{}'",
                self.provider.base_url
            )));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "provider.timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Build the pipeline session this configuration describes.
    pub fn session(&self) -> Session {
        let mut session = Session::new(&self.work_dir, &self.provider.model);
        session.set_security_mode(self.security.strict);
        session.set_chat_mode(self.chat_mode);
        session
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::ValidationError(format!(
            "{name} must be 'true' or 'false', got '{other}'"
        ))),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
