//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;
use crate::session::{InterviewDuration, InterviewType};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A setting required to open an interview is missing or unusable.
///
/// Fatal to `start`, but recoverable: fix `settings.toml` (or the
/// environment) and start again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no agent base URL is configured")]
    MissingBaseUrl,

    #[error("no agent model is configured")]
    MissingModel,

    /// The provider needs a key and neither `api_key` nor the named
    /// environment variable provides one.
    #[error("API key is missing; set `api_key` in settings.toml or the {env} environment variable")]
    MissingApiKey { env: String },
}

// ---------------------------------------------------------------------------
// AgentProvider
// ---------------------------------------------------------------------------

/// Selects which chat backend plays the interviewer.
///
/// Both speak the OpenAI chat-completions wire format; they differ only in
/// whether an API key is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentProvider {
    /// Ollama running locally; no authentication required.
    Ollama,
    /// Any OpenAI-compatible REST API (OpenAI, Groq, Together.ai, LM Studio …).
    OpenAiCompatible,
}

impl Default for AgentProvider {
    fn default() -> Self {
        Self::OpenAiCompatible
    }
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

/// Connection settings for the conversational agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub provider: AgentProvider,
    /// Base URL of the API endpoint, without the `/v1/...` suffix.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key.  When `None` the variable named by `api_key_env` is read.
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is absent.
    pub api_key_env: String,
    /// Model identifier sent to the API (e.g. `"gpt-4o-mini"`, `"qwen2.5:7b"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Upper bound on reply length.  Evaluations are long; keep this generous.
    pub max_tokens: u32,
    /// Maximum seconds to wait for one reply before timing out.
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: AgentProvider::default(),
            base_url: "https://api.openai.com".into(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 1_024,
            timeout_secs: 60,
        }
    }
}

impl AgentConfig {
    /// The key to send, if any: `api_key` when non-empty, otherwise the
    /// environment variable named by `api_key_env`.
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }

    /// Check that a session can be opened with these settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        if self.provider == AgentProvider::OpenAiCompatible && self.resolved_api_key().is_none() {
            return Err(ConfigError::MissingApiKey {
                env: self.api_key_env.clone(),
            });
        }
        Ok(())
    }
}

fn resolve_key(explicit: Option<&str>, env: &str) -> Option<String> {
    match explicit {
        Some(key) if !key.trim().is_empty() => Some(key.trim().to_string()),
        _ => std::env::var(env)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
    }
}

// ---------------------------------------------------------------------------
// InterviewConfig
// ---------------------------------------------------------------------------

/// Defaults pre-selected on the setup screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub interview_type: InterviewType,
    /// `None` means no explicit pacing.
    pub duration_minutes: Option<u32>,
    /// Persona name used in the system instruction and the UI.
    pub interviewer_name: String,
    /// Send the dictated answer as soon as the microphone is switched off.
    pub auto_submit: bool,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            interview_type: InterviewType::default(),
            duration_minutes: Some(45),
            interviewer_name: "Alex".into(),
            auto_submit: false,
        }
    }
}

impl InterviewConfig {
    pub fn duration(&self) -> Option<InterviewDuration> {
        self.duration_minutes.and_then(InterviewDuration::from_minutes)
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper recognition backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Dictation is offered at all.
    pub enabled: bool,
    /// GGML model id (see [`crate::stt::WHISPER_MODELS`]).
    pub model: String,
    /// ISO-639-1 code, or `"auto"` for Whisper's language detection.
    pub language: String,
    /// Attempt GPU-accelerated inference when available.
    pub use_gpu: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "base.en".into(),
            language: "en".into(),
            use_gpu: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Microphone segmentation settings for continuous recognition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// RMS level above which a 30 ms frame counts as voice.
    pub vad_threshold: f32,
    /// Trailing silence that finalizes an utterance.
    pub utterance_silence_ms: u64,
    /// Utterances shorter than this are dropped instead of transcribed.
    pub min_utterance_secs: f32,
    /// A pass with no voice for this long ends on its own.
    pub pass_silence_timeout_secs: f32,
    /// Hard cap on one recognition pass.
    pub max_pass_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            vad_threshold: 0.01,
            utterance_silence_ms: 900,
            min_utterance_secs: 0.5,
            pass_silence_timeout_secs: 8.0,
            max_pass_secs: 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Settings for the speech synthesis backend (`/v1/audio/speech`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Read interviewer replies aloud.
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    /// TTS model: `tts-1` (fast) or `tts-1-hd`.
    pub model: String,
    /// Voice name (alloy, echo, fable, onyx, nova, shimmer …).
    pub voice: String,
    pub timeout_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com".into(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".into(),
            model: "tts-1".into(),
            voice: "alloy".into(),
            timeout_secs: 60,
        }
    }
}

impl PlaybackConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial inner size of the window `(width, height)`.
    pub window_size: (f32, f32),
    /// Multiplier applied to egui's default points-per-pixel.
    pub font_scale: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (960.0, 720.0),
            font_scale: 1.1,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use interview_coach::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub interview: InterviewConfig,
    pub speech: SpeechConfig,
    pub audio: AudioConfig,
    pub playback: PlaybackConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut original = AppConfig::default();
        original.agent.provider = AgentProvider::Ollama;
        original.agent.base_url = "http://localhost:11434".into();
        original.agent.model = "qwen2.5:7b".into();
        original.interview.interview_type = InterviewType::SystemDesign;
        original.interview.duration_minutes = None;
        original.interview.auto_submit = true;
        original.playback.voice = "nova".into();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.agent.provider, AgentProvider::Ollama);
        assert_eq!(loaded.agent.base_url, "http://localhost:11434");
        assert_eq!(loaded.agent.model, "qwen2.5:7b");
        assert_eq!(loaded.interview.interview_type, InterviewType::SystemDesign);
        assert!(loaded.interview.duration_minutes.is_none());
        assert!(loaded.interview.auto_submit);
        assert_eq!(loaded.playback.voice, "nova");
        assert_eq!(loaded.speech.model, original.speech.model);
        assert_eq!(
            loaded.audio.utterance_silence_ms,
            original.audio.utterance_silence_ms
        );
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.agent.model, AgentConfig::default().model);
        assert_eq!(config.interview.interviewer_name, "Alex");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[agent]\napi_key = \"sk-local\"\n\n[interview]\ninterview_type = \"behavioral\"\ninterviewer_name = \"Sam\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).expect("load");
        assert_eq!(config.interview.interview_type, InterviewType::Behavioral);
        assert_eq!(config.interview.interviewer_name, "Sam");
        assert_eq!(config.agent.api_key.as_deref(), Some("sk-local"));
        assert_eq!(config.agent.timeout_secs, 60);
        assert_eq!(config.interview.duration_minutes, Some(45));
        assert!(!config.interview.auto_submit);
        assert!(config.speech.enabled);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.provider, AgentProvider::OpenAiCompatible);
        assert_eq!(cfg.agent.api_key_env, "OPENAI_API_KEY");
        assert_eq!(cfg.interview.duration().map(|d| d.minutes()), Some(45));
        assert_eq!(cfg.speech.language, "en");
        assert_eq!(cfg.playback.model, "tts-1");
    }

    #[test]
    fn validate_rejects_missing_key_for_hosted_provider() {
        let cfg = AgentConfig {
            api_key: None,
            api_key_env: "INTERVIEW_COACH_TEST_UNSET_KEY".into(),
            ..AgentConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MissingApiKey {
                env: "INTERVIEW_COACH_TEST_UNSET_KEY".into()
            })
        );
    }

    #[test]
    fn validate_accepts_explicit_key() {
        let cfg = AgentConfig {
            api_key: Some("sk-test".into()),
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.resolved_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn validate_ollama_needs_no_key() {
        let cfg = AgentConfig {
            provider: AgentProvider::Ollama,
            base_url: "http://localhost:11434".into(),
            api_key: None,
            api_key_env: "INTERVIEW_COACH_TEST_UNSET_KEY".into(),
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_model_and_url() {
        let mut cfg = AgentConfig {
            api_key: Some("k".into()),
            ..AgentConfig::default()
        };
        cfg.model = "  ".into();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingModel));
        cfg.base_url = String::new();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingBaseUrl));
    }

    #[test]
    fn blank_explicit_key_counts_as_missing() {
        let cfg = AgentConfig {
            api_key: Some("   ".into()),
            api_key_env: "INTERVIEW_COACH_TEST_UNSET_KEY".into(),
            ..AgentConfig::default()
        };
        assert!(cfg.resolved_api_key().is_none());
    }
}
