//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::time::Duration;

use parley::TranscriptionError;
use parley::voice::{
    AudioFormat, AudioFrame, SegmenterState, UtteranceSegmenter, listen_for_utterance,
};
use tokio::sync::mpsc;

mod common;
use common::{generate_silence, generate_sine_samples};

fn frame(samples: &[f32]) -> AudioFrame {
    AudioFrame::from_f32(AudioFormat::default(), samples)
}

/// Split audio into capture-sized frames (~32ms, like a cpal callback)
fn chunked(samples: &[f32]) -> Vec<AudioFrame> {
    samples.chunks(512).map(frame).collect()
}

#[test]
fn test_segmenter_creation() {
    let segmenter = UtteranceSegmenter::new(AudioFormat::default());

    assert_eq!(segmenter.state(), SegmenterState::Idle);
    assert!(!segmenter.is_speaking());
    assert!(segmenter.speech_buffer().is_empty());
}

#[test]
fn test_speech_activity_detection() {
    let mut segmenter = UtteranceSegmenter::new(AudioFormat::default());

    // Silence should not trigger
    segmenter.push(&frame(&generate_silence(0.1)));
    assert!(!segmenter.is_speaking());

    // Loud sine wave should trigger
    segmenter.push(&frame(&generate_sine_samples(440.0, 0.1, 0.5)));
    assert!(segmenter.is_speaking());
}

#[test]
fn test_quiet_signal_below_threshold() {
    let mut segmenter = UtteranceSegmenter::new(AudioFormat::default());

    // RMS of a 0.02 sine is ~0.014
    segmenter.push(&frame(&generate_sine_samples(440.0, 0.5, 0.02)));
    assert!(!segmenter.is_speaking());
}

#[test]
fn test_utterance_complete_detection() {
    let mut segmenter = UtteranceSegmenter::new(AudioFormat::default());

    let mut audio = generate_sine_samples(440.0, 1.0, 0.5);
    audio.extend(generate_silence(0.8));

    let finished: Vec<AudioFrame> = chunked(&audio)
        .iter()
        .filter_map(|f| segmenter.push(f))
        .collect();

    assert_eq!(finished.len(), 1);
    let utterance = &finished[0];
    assert!(utterance.duration_secs() >= 1.0);
    assert!(utterance.duration_secs() < 1.8);
    assert_eq!(segmenter.state(), SegmenterState::Idle);
}

#[test]
fn test_pause_inside_utterance_does_not_split() {
    let mut segmenter = UtteranceSegmenter::new(AudioFormat::default());

    let mut audio = generate_sine_samples(440.0, 0.5, 0.5);
    audio.extend(generate_silence(0.2));
    audio.extend(generate_sine_samples(440.0, 0.5, 0.5));
    audio.extend(generate_silence(0.8));

    let finished: Vec<AudioFrame> = chunked(&audio)
        .iter()
        .filter_map(|f| segmenter.push(f))
        .collect();

    assert_eq!(finished.len(), 1);
    assert!(finished[0].duration_secs() >= 1.2);
}

#[test]
fn test_wav_roundtrip() {
    let original = frame(&generate_sine_samples(440.0, 0.25, 0.5));

    let wav = original.to_wav().unwrap();
    assert_eq!(&wav[..4], b"RIFF");

    let decoded = AudioFrame::from_wav(&wav).unwrap();
    assert_eq!(decoded, original);
}

#[tokio::test]
async fn test_listen_returns_first_utterance() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut segmenter = UtteranceSegmenter::new(AudioFormat::default());

    let mut audio = generate_silence(0.2);
    audio.extend(generate_sine_samples(440.0, 1.0, 0.5));
    audio.extend(generate_silence(0.8));
    for f in chunked(&audio) {
        tx.send(f).unwrap();
    }

    let utterance = listen_for_utterance(&mut rx, &mut segmenter, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(utterance.duration_secs() >= 1.0);
}

#[tokio::test]
async fn test_listen_times_out_without_speech() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut segmenter = UtteranceSegmenter::new(AudioFormat::default());

    tx.send(frame(&generate_silence(0.5))).unwrap();

    let result = listen_for_utterance(&mut rx, &mut segmenter, Duration::from_millis(50)).await;

    assert!(matches!(result, Err(TranscriptionError::Timeout { .. })));
    drop(tx);
}

#[tokio::test]
async fn test_listen_fails_when_capture_stops() {
    let (tx, mut rx) = mpsc::unbounded_channel::<AudioFrame>();
    let mut segmenter = UtteranceSegmenter::new(AudioFormat::default());
    drop(tx);

    let result = listen_for_utterance(&mut rx, &mut segmenter, Duration::from_secs(5)).await;

    assert!(matches!(
        result,
        Err(TranscriptionError::ServiceUnavailable(_))
    ));
}
