//! Real-time streaming recognition
//!
//! The capture thread feeds frames into a channel; a recognizer task segments
//! and transcribes them and is the only producer of the session's transcript
//! queue. The interaction loop drains that queue on a fixed tick and is its
//! only consumer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TranscriptionError;
use crate::pipeline::{Pipeline, Render};
use crate::session::{Session, TranscriptQueue};
use crate::voice::{AudioFrame, Transcriber, UtteranceSegmenter};

/// Interval between queue drains in the interaction loop
pub const DRAIN_TICK: Duration = Duration::from_millis(100);

/// Spawn the recognizer task
///
/// Runs until the frame channel closes; the capture side owns teardown.
#[must_use]
pub fn spawn_recognizer(
    mut frames: mpsc::UnboundedReceiver<AudioFrame>,
    transcriber: Arc<dyn Transcriber>,
    queue: TranscriptQueue,
    mut segmenter: UtteranceSegmenter,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!("recognizer started");

        while let Some(frame) = frames.recv().await {
            let Some(utterance_audio) = segmenter.push(&frame) else {
                continue;
            };

            tracing::debug!(
                duration_secs = utterance_audio.duration_secs(),
                "utterance captured"
            );

            match transcriber.transcribe(&utterance_audio).await {
                Ok(utterance) => {
                    tracing::info!(utterance_len = utterance.as_str().len(), "recognized");
                    tracing::debug!(utterance = %utterance, "recognized text");
                    queue.push(utterance);
                }
                // Background noise and mumbling are routine here
                Err(TranscriptionError::Unrecognized) => {
                    tracing::trace!("utterance not recognized, skipping");
                }
                Err(e) => tracing::warn!(error = %e, "transcription failed, skipping utterance"),
            }
        }

        tracing::debug!("frame channel closed, recognizer exiting");
    })
}

/// Drain the session queue on a fixed tick until shutdown
///
/// Also returns once the recognizer has exited and nothing is left to drain.
#[allow(clippy::future_not_send)]
pub async fn run_interaction_loop<R>(
    pipeline: &Pipeline,
    session: &mut Session,
    render: &mut R,
    recognizer: &JoinHandle<()>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) where
    R: Render + ?Sized,
{
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("shutdown requested");
                break;
            }
            () = tokio::time::sleep(DRAIN_TICK) => {
                // Failures are already rendered per turn
                let _ = pipeline.process_pending(session, render).await;

                if recognizer.is_finished() && session.queue().is_empty() {
                    tracing::info!("recognizer stopped, ending interaction loop");
                    break;
                }
            }
        }
    }
}
