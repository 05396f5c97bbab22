//! Turn pipeline
//!
//! One turn: transcribe (voice input only) → generate a reply → synthesize it
//! → append to the session log → render. Per-turn failures are rendered and
//! returned, never propagated past the turn; the log only ever receives
//! complete turns.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::config::Config;
use crate::error::{SynthesisError, TurnError};
use crate::llm::{ChatCompletionClient, GenerationParams, ResponseGenerator};
use crate::session::{ConversationTurn, Session, Utterance};
use crate::voice::{
    AudioFormat, AudioFrame, ElevenLabsSynthesizer, SpeechSynthesizer, Transcriber,
    VoiceSettings, WhisperTranscriber,
};
use crate::{Error, Result};

/// What the UI needs to draw after a turn
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    /// Conversation so far, oldest first
    pub turns: &'a [ConversationTurn],
    /// Message to surface to the user, if the last step failed
    pub error: Option<&'a str>,
    /// Reply audio to play (MP3), if synthesis succeeded
    pub audio: Option<&'a [u8]>,
}

/// Render callback invoked with the session state after each turn attempt
pub trait Render {
    fn render(&mut self, frame: &RenderFrame<'_>);
}

impl<F> Render for F
where
    F: FnMut(&RenderFrame<'_>),
{
    fn render(&mut self, frame: &RenderFrame<'_>) {
        self(frame);
    }
}

/// Result of a turn that made it into the log
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn: ConversationTurn,
    /// Synthesized reply, absent when synthesis failed
    pub audio: Option<Arc<[u8]>>,
    /// Why audio is absent
    pub synthesis_error: Option<SynthesisError>,
}

/// The voice-capture-to-response pipeline
pub struct Pipeline {
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ResponseGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    system_prompt: String,
    params: GenerationParams,
    voice: VoiceSettings,
}

impl Pipeline {
    /// Assemble a pipeline from collaborators
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            transcriber,
            generator,
            synthesizer,
            system_prompt: crate::llm::SYSTEM_PROMPT.to_string(),
            params: GenerationParams::default(),
            voice: VoiceSettings::default(),
        }
    }

    /// Override the system instruction
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Override sampling parameters
    #[must_use]
    pub const fn params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Override voice settings
    #[must_use]
    pub const fn voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    /// Build the hosted-service pipeline described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .connect_timeout(Duration::from_secs(config.http.connect_timeout_secs))
            .build()
            .map_err(Error::Http)?;

        let groq_key = || SecretString::from(config.secrets.groq.expose_secret().to_owned());

        let transcriber = WhisperTranscriber::new(
            client.clone(),
            groq_key(),
            &config.stt.base_url,
            config.stt.model.clone(),
            config.audio_format,
        );
        let generator = ChatCompletionClient::new(
            client.clone(),
            groq_key(),
            &config.llm.base_url,
            config.llm.model.clone(),
        );
        let synthesizer = ElevenLabsSynthesizer::new(
            client,
            SecretString::from(config.secrets.elevenlabs.expose_secret().to_owned()),
            &config.tts.base_url,
            config.tts.voice_id.clone(),
            config.tts.model.clone(),
        );

        tracing::debug!(
            llm_model = %config.llm.model,
            stt_model = %config.stt.model,
            tts_voice = %config.tts.voice_id,
            "pipeline configured"
        );

        Ok(Self::new(
            Arc::new(transcriber),
            Arc::new(generator),
            Arc::new(synthesizer),
        )
        .params(config.llm.params)
        .voice(config.tts.voice))
    }

    /// Audio format the transcriber accepts
    #[must_use]
    pub fn audio_format(&self) -> AudioFormat {
        self.transcriber.format()
    }

    /// Shared handle to the transcriber, for the streaming recognizer
    #[must_use]
    pub fn transcriber(&self) -> Arc<dyn Transcriber> {
        Arc::clone(&self.transcriber)
    }

    /// Push-to-talk turn: recognize `audio`, then respond
    ///
    /// Every transcription failure, unrecognized speech included, is rendered
    /// to the user since they explicitly asked to be heard.
    ///
    /// # Errors
    ///
    /// Returns the transcription or turn failure after rendering it
    pub async fn listen<R>(
        &self,
        session: &mut Session,
        audio: &AudioFrame,
        render: &mut R,
    ) -> std::result::Result<TurnOutcome, TurnError>
    where
        R: Render + ?Sized,
    {
        match self.transcriber.transcribe(audio).await {
            Ok(utterance) => self.respond(session, utterance, render).await,
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                let err = TurnError::from(e);
                Self::fail(session, &err, render);
                Err(err)
            }
        }
    }

    /// Answer one utterance and record the turn
    ///
    /// A synthesis failure is reported but does not fail the turn; the reply
    /// is logged without audio.
    ///
    /// # Errors
    ///
    /// Returns the generation failure after rendering it; nothing is logged
    pub async fn respond<R>(
        &self,
        session: &mut Session,
        utterance: Utterance,
        render: &mut R,
    ) -> std::result::Result<TurnOutcome, TurnError>
    where
        R: Render + ?Sized,
    {
        tracing::info!(
            session_id = %session.id(),
            utterance_len = utterance.as_str().len(),
            "processing turn"
        );
        tracing::debug!(utterance = %utterance, "turn input");

        let reply = match self
            .generator
            .generate(utterance.as_str(), &self.system_prompt, self.params)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "response generation failed");
                let err = TurnError::from(e);
                Self::fail(session, &err, render);
                return Err(err);
            }
        };

        let (audio, synthesis_error) = match self.synthesizer.synthesize(&reply, &self.voice).await
        {
            Ok(bytes) => (Some(Arc::<[u8]>::from(bytes)), None),
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed, skipping audio");
                (None, Some(e))
            }
        };

        let turn = ConversationTurn::new(utterance.into_inner(), reply);
        if let Err(e) = session.log_mut().append(turn.clone()) {
            let err = TurnError::from(e);
            Self::fail(session, &err, render);
            return Err(err);
        }

        session.set_audio(audio.clone());
        session.set_error(
            synthesis_error
                .as_ref()
                .map(|e| format!("Error generating speech: {e}")),
        );

        tracing::info!(
            session_id = %session.id(),
            turns = session.log().len(),
            has_audio = audio.is_some(),
            "turn complete"
        );

        render.render(&RenderFrame {
            turns: session.log().all(),
            error: session.last_error(),
            audio: audio.as_deref(),
        });

        Ok(TurnOutcome {
            turn,
            audio,
            synthesis_error,
        })
    }

    /// Respond to every utterance waiting in the session queue, in arrival order
    ///
    /// A failed turn is rendered and skipped; the rest of the batch still runs.
    pub async fn process_pending<R>(
        &self,
        session: &mut Session,
        render: &mut R,
    ) -> Vec<std::result::Result<TurnOutcome, TurnError>>
    where
        R: Render + ?Sized,
    {
        let pending = session.queue().drain();
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "draining pending transcripts");
        }

        let mut results = Vec::with_capacity(pending.len());
        for utterance in pending {
            results.push(self.respond(session, utterance, render).await);
        }
        results
    }

    fn fail<R>(session: &mut Session, err: &TurnError, render: &mut R)
    where
        R: Render + ?Sized,
    {
        session.set_error(Some(err.user_message()));
        render.render(&RenderFrame {
            turns: session.log().all(),
            error: session.last_error(),
            audio: None,
        });
    }
}
