//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley::llm::{GenerationParams, ResponseGenerator};
use parley::voice::{
    AudioFormat, AudioFrame, SAMPLE_RATE, SpeechSynthesizer, Transcriber, VoiceSettings,
};
use parley::{GenerationError, Pipeline, SynthesisError, TranscriptionError, Utterance};
use tokio::sync::Notify;

/// First bytes of an MPEG-1 Layer III frame
pub const MP3_BYTES: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

/// Transcriber returning a fixed result for audio in the expected format
pub struct FakeTranscriber {
    result: Result<String, TranscriptionError>,
    pub calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn hears(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn fails(err: TranscriptionError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &AudioFrame) -> Result<Utterance, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        audio.check_format(&self.format())?;
        let text = self.result.clone()?;
        Utterance::new(text).ok_or(TranscriptionError::Unrecognized)
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::default()
    }
}

/// Transcriber hearing a fixed sequence of phrases, one per utterance
pub struct ScriptedTranscriber {
    lines: Mutex<VecDeque<String>>,
}

impl ScriptedTranscriber {
    pub fn hears_in_order(lines: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            lines: Mutex::new(lines.iter().map(ToString::to_string).collect()),
        })
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, audio: &AudioFrame) -> Result<Utterance, TranscriptionError> {
        audio.check_format(&self.format())?;
        let line = self.lines.lock().unwrap().pop_front();
        line.and_then(Utterance::new).ok_or(TranscriptionError::Unrecognized)
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::default()
    }
}

/// Generator returning a fixed reply
pub struct FakeGenerator {
    result: Result<String, GenerationError>,
    pub calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn replies(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn fails(err: GenerationError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ResponseGenerator for FakeGenerator {
    async fn generate(
        &self,
        question: &str,
        _system_prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Lets a batch fail on one specific question
        if question == "fail" {
            return Err(GenerationError::EmptyResponse);
        }
        self.result.clone()
    }
}

/// Generator that holds each request until released
pub struct GatedGenerator {
    reply: String,
    /// Notified when a request arrives
    pub started: Notify,
    /// Notify to let the pending request finish
    pub release: Notify,
}

impl GatedGenerator {
    pub fn replies(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: text.to_string(),
            started: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl ResponseGenerator for GatedGenerator {
    async fn generate(
        &self,
        _question: &str,
        _system_prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, GenerationError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

/// Generator that echoes the question back
pub struct EchoGenerator;

#[async_trait]
impl ResponseGenerator for EchoGenerator {
    async fn generate(
        &self,
        question: &str,
        _system_prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, GenerationError> {
        if question == "fail" {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(format!("echo: {question}"))
    }
}

/// Synthesizer returning fixed audio
pub struct FakeSynthesizer {
    result: Result<Vec<u8>, SynthesisError>,
    pub calls: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn speaks() -> Arc<Self> {
        Arc::new(Self {
            result: Ok(MP3_BYTES.to_vec()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn fails(err: SynthesisError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _voice: &VoiceSettings,
    ) -> Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Pipeline whose collaborators all succeed
pub fn happy_pipeline(heard: &str, reply: &str) -> Pipeline {
    Pipeline::new(
        FakeTranscriber::hears(heard),
        FakeGenerator::replies(reply),
        FakeSynthesizer::speaks(),
    )
}

/// Generate sine wave audio samples
pub fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
pub fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// A spoken phrase as capture frames: one tone frame, one silence frame
pub fn spoken_phrase_frames() -> Vec<AudioFrame> {
    vec![
        AudioFrame::from_f32(AudioFormat::default(), &generate_sine_samples(440.0, 1.0, 0.5)),
        AudioFrame::from_f32(AudioFormat::default(), &generate_silence(0.6)),
    ]
}

/// A spoken phrase: tone followed by trailing silence
pub fn spoken_phrase() -> AudioFrame {
    let mut samples = generate_sine_samples(440.0, 1.0, 0.5);
    samples.extend(generate_silence(0.6));
    AudioFrame::from_f32(AudioFormat::default(), &samples)
}
