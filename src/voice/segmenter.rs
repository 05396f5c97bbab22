//! Utterance segmentation
//!
//! Splits a continuous stream of capture frames into complete utterances
//! using local energy detection: speech starts when a frame rises above the
//! energy threshold and ends after a run of trailing silence.

use std::time::Duration;

use tokio::sync::mpsc;

use super::audio::{AudioFormat, AudioFrame};
use crate::error::TranscriptionError;

/// Minimum audio energy threshold to consider speech
pub const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech duration for an utterance (seconds)
const MIN_SPEECH_SECS: f32 = 0.3;

/// Trailing silence that ends an utterance (seconds)
const SILENCE_SECS: f32 = 0.5;

/// Longest utterance before it is cut off (seconds)
const PHRASE_LIMIT_SECS: f32 = 15.0;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Accumulating an utterance
    Speaking,
}

/// Energy-based utterance segmenter
pub struct UtteranceSegmenter {
    format: AudioFormat,
    state: SegmenterState,
    speech_buffer: Vec<i16>,
    silence_counter: usize,
    min_speech_samples: usize,
    silence_samples: usize,
    phrase_limit_samples: usize,
}

impl UtteranceSegmenter {
    /// Create a segmenter for frames of the given format
    #[must_use]
    pub fn new(format: AudioFormat) -> Self {
        tracing::debug!(?format, "utterance segmenter initialized");

        Self {
            format,
            state: SegmenterState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
            min_speech_samples: format.samples_for(MIN_SPEECH_SECS),
            silence_samples: format.samples_for(SILENCE_SECS),
            phrase_limit_samples: format.samples_for(PHRASE_LIMIT_SECS),
        }
    }

    /// Feed one frame
    ///
    /// Returns the finished utterance once enough speech has been followed by
    /// silence, or once the phrase limit is reached.
    pub fn push(&mut self, frame: &AudioFrame) -> Option<AudioFrame> {
        if frame.format != self.format {
            tracing::warn!(
                got = ?frame.format,
                expected = ?self.format,
                "dropping frame with unexpected format"
            );
            return None;
        }

        let energy = frame.energy();
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(&frame.samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                }
            }
            SegmenterState::Speaking => {
                self.speech_buffer.extend_from_slice(&frame.samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += frame.samples.len();
                }

                tracing::trace!(
                    buffer_len = self.speech_buffer.len(),
                    silence = self.silence_counter,
                    is_speech,
                    energy,
                    "speaking"
                );

                let voiced = self.speech_buffer.len().saturating_sub(self.silence_counter);

                if self.silence_counter > self.silence_samples {
                    if voiced > self.min_speech_samples {
                        return Some(self.finish());
                    }
                    // Blip followed by silence
                    tracing::trace!("too short - resetting");
                    self.reset();
                } else if self.speech_buffer.len() >= self.phrase_limit_samples {
                    tracing::debug!("phrase limit reached");
                    return Some(self.finish());
                }
            }
        }

        None
    }

    fn finish(&mut self) -> AudioFrame {
        let samples = std::mem::take(&mut self.speech_buffer);
        tracing::debug!(samples = samples.len(), "utterance complete");
        self.reset();
        AudioFrame::new(self.format, samples)
    }

    /// Whether an utterance is being accumulated
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.state == SegmenterState::Speaking
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Get the accumulated speech buffer
    #[must_use]
    pub fn speech_buffer(&self) -> &[i16] {
        &self.speech_buffer
    }

    /// Reset to idle, discarding buffered audio
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }

    /// Format this segmenter accepts
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Wait for one complete utterance from a frame channel
///
/// `timeout` bounds how long to wait for speech to *start*; once someone is
/// speaking the utterance is allowed to run up to the phrase limit.
///
/// # Errors
///
/// Returns `Timeout` when no speech starts within `timeout`, or
/// `ServiceUnavailable` if the capture channel closes
pub async fn listen_for_utterance(
    frames: &mut mpsc::UnboundedReceiver<AudioFrame>,
    segmenter: &mut UtteranceSegmenter,
    timeout: Duration,
) -> Result<AudioFrame, TranscriptionError> {
    segmenter.reset();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let frame = if segmenter.is_speaking() {
            frames.recv().await
        } else {
            match tokio::time::timeout_at(deadline, frames.recv()).await {
                Ok(frame) => frame,
                Err(_) => {
                    tracing::debug!(timeout_secs = timeout.as_secs(), "listen timed out");
                    return Err(TranscriptionError::Timeout {
                        secs: timeout.as_secs(),
                    });
                }
            }
        };

        let Some(frame) = frame else {
            return Err(TranscriptionError::ServiceUnavailable(
                "audio capture stopped".to_string(),
            ));
        };

        if let Some(utterance) = segmenter.push(&frame) {
            return Ok(utterance);
        }
    }
}
