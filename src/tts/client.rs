//! Speech synthesis over an OpenAI-compatible `/v1/audio/speech` endpoint.

use async_trait::async_trait;

use crate::config::PlaybackConfig;
use crate::speech::PlaybackError;

/// Turns text into encoded audio (MP3, WAV …).
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, PlaybackError>;
}

/// Calls `POST {base_url}/v1/audio/speech`.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    config: PlaybackConfig,
    api_key: Option<String>,
}

impl OpenAiSpeech {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: config.resolved_api_key(),
            config: config.clone(),
        }
    }

    /// A key was resolved from the config or the environment.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/audio/speech",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": self.config.voice,
            "response_format": "mp3"
        })
    }
}

#[async_trait]
impl SpeechBackend for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, PlaybackError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut req = self.client.post(self.endpoint()).json(&self.request_body(text));
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }

        log::debug!(
            "tts: POST {} (model={}, voice={}, {} chars)",
            self.endpoint(),
            self.config.model,
            self.config.voice,
            text.len()
        );

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlaybackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }
}
