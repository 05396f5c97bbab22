//! Text-to-speech (TTS) processing

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;

/// Default ElevenLabs API base URL
pub const DEFAULT_TTS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Default ElevenLabs voice (Rachel)
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default ElevenLabs model
pub const DEFAULT_TTS_MODEL: &str = "eleven_monolingual_v1";

/// Voice tuning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Stability in `[0, 1]`
    pub stability: f32,
    /// Similarity boost in `[0, 1]`
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.5,
        }
    }
}

impl VoiceSettings {
    /// Check both parameters are within `[0, 1]`
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::InvalidRequest` naming the offending field
    pub fn validate(&self) -> Result<(), SynthesisError> {
        for (name, value) in [
            ("stability", self.stability),
            ("similarity_boost", self.similarity_boost),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SynthesisError::InvalidRequest(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Renders text as one complete audio buffer
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` to MP3 bytes
    ///
    /// # Errors
    ///
    /// `Status` on a non-success response, `Transport` if the request fails,
    /// `InvalidRequest` for empty text or out-of-range settings
    async fn synthesize(&self, text: &str, voice: &VoiceSettings)
    -> Result<Vec<u8>, SynthesisError>;
}

/// Request body for the ElevenLabs TTS API
#[derive(Debug, Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

/// Synthesizes speech via ElevenLabs
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    voice_id: String,
    model: String,
}

impl ElevenLabsSynthesizer {
    /// Create a new synthesizer
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_key: SecretString,
        base_url: &str,
        voice_id: String,
        model: String,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            voice_id,
            model,
        }
    }

    fn url(&self) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSettings,
    ) -> Result<Vec<u8>, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::InvalidRequest("empty text".to_string()));
        }
        voice.validate()?;

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            voice_settings: voice,
        };

        tracing::debug!(
            voice = %self.voice_id,
            text_len = text.len(),
            "sending TTS request to ElevenLabs"
        );

        let response = self
            .client
            .post(self.url())
            .header("xi-api-key", self.api_key.expose_secret())
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "ElevenLabs request failed");
                SynthesisError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "ElevenLabs TTS error");
            return Err(SynthesisError::Status {
                status_code: status.as_u16(),
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        tracing::debug!(bytes = audio.len(), "received TTS audio");
        Ok(audio.to_vec())
    }
}
