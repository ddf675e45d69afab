//! Configuration loading, validation, and management for Handsfree.
//!
//! Loads configuration from `~/.handsfree/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use handsfree_core::geometry::SUPPORTED_TARGETS;

/// The root configuration structure.
///
/// Maps directly to `~/.handsfree/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model provider: "anthropic" or "openai_compat"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model to drive the agent loop
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL override (needed for openai_compat)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Maximum tokens per model reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Voice capture and speech output settings
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Hand-gesture classifier settings
    #[serde(default)]
    pub gesture: GestureConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Action executor settings
    #[serde(default)]
    pub executor: ExecutorConfig,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("max_tokens", &self.max_tokens)
            .field("voice", &self.voice)
            .field("gesture", &self.gesture)
            .field("agent", &self.agent)
            .field("executor", &self.executor)
            .finish()
    }
}

/// Voice capture and speech output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Phrase that wakes the agent from Idle
    #[serde(default = "default_wake_phrase")]
    pub wake_phrase: String,

    /// Seconds of silence that end an utterance
    #[serde(default = "default_silence_timeout")]
    pub silence_timeout_secs: f32,

    /// Hard cap on a single capture, in seconds
    #[serde(default = "default_max_capture")]
    pub max_capture_secs: u32,

    /// Path to the whisper model file
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,

    /// Speech output engine: "say" or "edge"
    #[serde(default = "default_tts_engine")]
    pub tts_engine: String,

    /// Voice name passed to the speech engine
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,

    /// Whether to speak status lines and replies at all
    #[serde(default = "default_true")]
    pub speak_feedback: bool,
}

fn default_wake_phrase() -> String {
    "hey computer".into()
}
fn default_silence_timeout() -> f32 {
    1.5
}
fn default_max_capture() -> u32 {
    30
}
fn default_whisper_model() -> String {
    "~/.handsfree/models/ggml-base.en.bin".into()
}
fn default_tts_engine() -> String {
    "say".into()
}
fn default_tts_voice() -> String {
    "Samantha".into()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            wake_phrase: default_wake_phrase(),
            silence_timeout_secs: default_silence_timeout(),
            max_capture_secs: default_max_capture(),
            whisper_model: default_whisper_model(),
            tts_engine: default_tts_engine(),
            tts_voice: default_tts_voice(),
            speak_feedback: true,
        }
    }
}

/// Hand-gesture classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Whether the gesture modality is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Command line for the external pose classifier, which writes one pose
    /// name per line to stdout
    #[serde(default = "default_gesture_helper")]
    pub helper_command: Vec<String>,

    /// Cooldown after an accepted pose before the same pose fires again
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_gesture_helper() -> Vec<String> {
    vec!["handsfree-gestured".into()]
}
fn default_cooldown_ms() -> u64 {
    2000
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            helper_command: default_gesture_helper(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum invoke/execute iterations per command
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Provider attempts per invocation (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry backoff; doubles per attempt
    #[serde(default = "default_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// How many recent screenshots to keep in history
    #[serde(default = "default_image_retention")]
    pub image_retention: usize,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Short-circuit "open <app>" / "close <app>" commands locally
    #[serde(default = "default_true")]
    pub local_fast_path: bool,
}

fn default_max_iterations() -> u32 {
    20
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    500
}
fn default_image_retention() -> usize {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_backoff_ms(),
            image_retention: default_image_retention(),
            system_prompt_override: None,
            local_fast_path: true,
        }
    }
}

/// Action executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Pause after state-changing actions before the next capture
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Timeout for each OS helper invocation
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Force a target resolution ("1024x768", "1280x800", "1366x768")
    /// instead of aspect-ratio selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_resolution: Option<String>,
}

fn default_settle_delay_ms() -> u64 {
    100
}
fn default_command_timeout() -> u64 {
    15
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            command_timeout_secs: default_command_timeout(),
            target_resolution: None,
        }
    }
}

impl ExecutorConfig {
    /// Parse the target override into a (width, height) pair.
    pub fn target_override(&self) -> Option<(u32, u32)> {
        let s = self.target_resolution.as_deref()?;
        let (w, h) = s.split_once('x')?;
        Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.handsfree/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `HANDSFREE_API_KEY` (highest priority)
    /// - `ANTHROPIC_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("HANDSFREE_API_KEY")
                .ok()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("HANDSFREE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("HANDSFREE_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
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

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".handsfree")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider != "anthropic" && self.provider != "openai_compat" {
            return Err(ConfigError::ValidationError(format!(
                "unknown provider \"{}\" (expected \"anthropic\" or \"openai_compat\")",
                self.provider
            )));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_attempts must be at least 1".into(),
            ));
        }

        if self.voice.wake_phrase.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "voice.wake_phrase must not be empty".into(),
            ));
        }

        if self.gesture.enabled && self.gesture.helper_command.is_empty() {
            return Err(ConfigError::ValidationError(
                "gesture.helper_command must not be empty when gestures are enabled".into(),
            ));
        }

        if let Some(res) = &self.executor.target_resolution {
            match self.executor.target_override() {
                Some(pair) if SUPPORTED_TARGETS.contains(&pair) => {}
                _ => {
                    return Err(ConfigError::ValidationError(format!(
                        "executor.target_resolution \"{res}\" is not one of 1024x768, 1280x800, 1366x768"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            api_url: None,
            max_tokens: default_max_tokens(),
            voice: VoiceConfig::default(),
            gesture: GestureConfig::default(),
            agent: AgentConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
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

impl From<ConfigError> for handsfree_core::Error {
    fn from(err: ConfigError) -> Self {
        handsfree_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.agent.max_iterations, 20);
        assert_eq!(config.voice.wake_phrase, "hey computer");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.gesture.cooldown_ms, config.gesture.cooldown_ms);
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = AppConfig {
            provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unsupported_target_resolution_rejected() {
        let mut config = AppConfig::default();
        config.executor.target_resolution = Some("1920x1080".into());
        assert!(config.validate().is_err());

        config.executor.target_resolution = Some("1280x800".into());
        assert!(config.validate().is_ok());
        assert_eq!(config.executor.target_override(), Some((1280, 800)));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().provider, "anthropic");
    }

    #[test]
    fn config_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
provider = "anthropic"
model = "claude-sonnet-4-20250514"

[voice]
wake_phrase = "hey nova"
tts_engine = "edge"

[agent]
max_iterations = 8
image_retention = 5
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.voice.wake_phrase, "hey nova");
        assert_eq!(config.voice.tts_engine, "edge");
        assert_eq!(config.agent.max_iterations, 8);
        assert_eq!(config.agent.image_retention, 5);
        // Unspecified sections keep their defaults.
        assert_eq!(config.executor.settle_delay_ms, 100);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("anthropic"));
        assert!(toml_str.contains("hey computer"));
    }
}
