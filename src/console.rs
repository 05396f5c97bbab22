//! Terminal rendering for the CLI modes

use std::io::Write;
use std::path::PathBuf;

use crate::pipeline::{Render, RenderFrame};
use crate::voice::AudioPlayback;

/// File the latest reply audio is written to
pub const RESPONSE_AUDIO_FILE: &str = "response.mp3";

/// Prints new turns and errors to a writer, saves and optionally plays audio
pub struct ConsoleRenderer<W = std::io::Stdout> {
    out: W,
    playback: Option<AudioPlayback>,
    audio_path: Option<PathBuf>,
    shown: usize,
}

impl ConsoleRenderer {
    /// Render to stdout
    #[must_use]
    pub fn stdout(playback: Option<AudioPlayback>) -> Self {
        Self::new(std::io::stdout(), playback)
    }
}

impl<W: Write> ConsoleRenderer<W> {
    #[must_use]
    pub fn new(out: W, playback: Option<AudioPlayback>) -> Self {
        Self {
            out,
            playback,
            audio_path: Some(PathBuf::from(RESPONSE_AUDIO_FILE)),
            shown: 0,
        }
    }

    /// Where reply audio is saved; `None` disables saving
    #[must_use]
    pub fn audio_path(mut self, path: Option<PathBuf>) -> Self {
        self.audio_path = path;
        self
    }

    /// Consume the renderer, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self, frame: &RenderFrame<'_>) -> std::io::Result<()> {
        for turn in frame.turns.iter().skip(self.shown) {
            writeln!(self.out, "You: {}", turn.user)?;
            writeln!(self.out, "Assistant: {}", turn.assistant)?;
            writeln!(self.out)?;
        }
        self.shown = frame.turns.len();

        if let Some(error) = frame.error {
            writeln!(self.out, "! {error}")?;
        }
        self.out.flush()
    }

    fn handle_audio(&self, audio: &[u8]) {
        if let Some(path) = &self.audio_path {
            if let Err(e) = std::fs::write(path, audio) {
                tracing::warn!(path = %path.display(), error = %e, "failed to save reply audio");
            } else {
                tracing::debug!(path = %path.display(), bytes = audio.len(), "reply audio saved");
            }
        }

        if let Some(playback) = &self.playback {
            if let Err(e) = run_blocking(|| playback.play_mp3(audio)) {
                tracing::warn!(error = %e, "playback failed");
            }
        }
    }
}

/// Run a blocking call from render context without stalling other tasks
///
/// On a multi-threaded runtime the worker hands its queued tasks off first.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

impl<W: Write> Render for ConsoleRenderer<W> {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        if let Err(e) = self.write_frame(frame) {
            tracing::warn!(error = %e, "failed to write to console");
        }

        if let Some(audio) = frame.audio {
            self.handle_audio(audio);
        }
    }
}
