//! Voice processing module
//!
//! Audio capture, utterance segmentation, speech-to-text, text-to-speech and
//! playback. STT and TTS are remote services behind the [`Transcriber`] and
//! [`SpeechSynthesizer`] traits.

mod audio;
mod capture;
mod playback;
mod segmenter;
pub mod stt;
pub mod tts;

pub use audio::{AudioFormat, AudioFrame, SAMPLE_RATE};
pub use capture::{AudioCapture, DeviceList, list_devices};
pub use playback::{AudioPlayback, DecodedAudio, decode_mp3};
pub use segmenter::{ENERGY_THRESHOLD, SegmenterState, UtteranceSegmenter, listen_for_utterance};
pub use stt::{Transcriber, WhisperTranscriber};
pub use tts::{ElevenLabsSynthesizer, SpeechSynthesizer, VoiceSettings};
