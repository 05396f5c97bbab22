//! Speech-to-text (STT) processing

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::audio::{AudioFormat, AudioFrame};
use crate::error::TranscriptionError;
use crate::session::Utterance;

/// Default OpenAI-compatible API base (Groq)
pub const DEFAULT_STT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default hosted Whisper model
pub const DEFAULT_STT_MODEL: &str = "whisper-large-v3";

/// Converts a fixed-format audio buffer into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Recognize the speech in `audio`
    ///
    /// # Errors
    ///
    /// `Format` when the audio does not match the session format,
    /// `Unrecognized` when nothing intelligible was said,
    /// `ServiceUnavailable` when the recognition service fails
    async fn transcribe(&self, audio: &AudioFrame) -> Result<Utterance, TranscriptionError>;

    /// Audio format this transcriber accepts
    fn format(&self) -> AudioFormat;
}

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes speech via an OpenAI-compatible Whisper endpoint
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    format: AudioFormat,
}

impl WhisperTranscriber {
    /// Create a new transcriber
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_key: SecretString,
        base_url: &str,
        model: String,
        format: AudioFormat,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            format,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &AudioFrame) -> Result<Utterance, TranscriptionError> {
        audio.check_format(&self.format)?;
        let wav = audio.to_wav()?;

        tracing::debug!(
            audio_bytes = wav.len(),
            duration_secs = audio.duration_secs(),
            model = %self.model,
            "starting Whisper transcription"
        );

        let file = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::Format(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                TranscriptionError::ServiceUnavailable(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(TranscriptionError::ServiceUnavailable(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            TranscriptionError::ServiceUnavailable(e.to_string())
        })?;

        let utterance = Utterance::new(result.text).ok_or(TranscriptionError::Unrecognized)?;
        tracing::info!(transcript = %utterance, "transcription complete");
        Ok(utterance)
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}
