//! PCM audio frames and WAV encoding

use std::io::Cursor;

use crate::error::TranscriptionError;

/// Sample rate for speech capture (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// Fixed PCM layout negotiated for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Bytes per sample
    pub sample_width: u16,
    /// Interleaved channel count
    pub channels: u16,
}

impl AudioFormat {
    /// 16-bit mono PCM at the given rate
    #[must_use]
    pub const fn mono_16bit(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            sample_width: 2,
            channels: 1,
        }
    }

    /// Number of interleaved samples covering `secs` seconds
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn samples_for(&self, secs: f32) -> usize {
        (self.sample_rate as f32 * secs) as usize * usize::from(self.channels)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::mono_16bit(SAMPLE_RATE)
    }
}

/// A buffer of interleaved 16-bit PCM samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub format: AudioFormat,
    pub samples: Vec<i16>,
}

impl AudioFrame {
    #[must_use]
    pub const fn new(format: AudioFormat, samples: Vec<i16>) -> Self {
        Self { format, samples }
    }

    /// Build a frame from f32 samples in `[-1.0, 1.0]`
    #[must_use]
    pub fn from_f32(format: AudioFormat, samples: &[f32]) -> Self {
        Self {
            format,
            samples: samples.iter().map(|&s| f32_to_i16(s)).collect(),
        }
    }

    /// Duration in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f32 {
        let per_second = self.format.sample_rate as usize * usize::from(self.format.channels);
        if per_second == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / per_second as f32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check the frame against the session's negotiated format
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionError::Format` on any mismatch or an empty buffer
    pub fn check_format(&self, expected: &AudioFormat) -> Result<(), TranscriptionError> {
        if self.format.sample_rate != expected.sample_rate {
            return Err(TranscriptionError::Format(format!(
                "sample rate {} Hz, expected {} Hz",
                self.format.sample_rate, expected.sample_rate
            )));
        }
        if self.format.sample_width != expected.sample_width {
            return Err(TranscriptionError::Format(format!(
                "sample width {} bytes, expected {} bytes",
                self.format.sample_width, expected.sample_width
            )));
        }
        if self.format.channels != expected.channels {
            return Err(TranscriptionError::Format(format!(
                "{} channels, expected {}",
                self.format.channels, expected.channels
            )));
        }
        if self.samples.is_empty() {
            return Err(TranscriptionError::Format("empty audio buffer".to_string()));
        }
        if self.samples.len() % usize::from(self.format.channels.max(1)) != 0 {
            return Err(TranscriptionError::Format(
                "buffer does not hold whole frames".to_string(),
            ));
        }
        Ok(())
    }

    /// RMS energy normalized to `[0.0, 1.0]`
    #[must_use]
    pub fn energy(&self) -> f32 {
        rms(&self.samples)
    }

    /// Encode as WAV bytes for STT APIs
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn to_wav(&self) -> Result<Vec<u8>, TranscriptionError> {
        let spec = hound::WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate,
            bits_per_sample: self.format.sample_width * 8,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| TranscriptionError::Format(e.to_string()))?;

            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| TranscriptionError::Format(e.to_string()))?;
            }

            writer
                .finalize()
                .map_err(|e| TranscriptionError::Format(e.to_string()))?;
        }

        Ok(cursor.into_inner())
    }

    /// Decode a 16-bit integer PCM WAV
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionError::Format` for malformed or non 16-bit WAV data
    pub fn from_wav(bytes: &[u8]) -> Result<Self, TranscriptionError> {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| TranscriptionError::Format(format!("invalid WAV data: {e}")))?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(TranscriptionError::Format(format!(
                "unsupported WAV encoding: {:?} {} bits",
                spec.sample_format, spec.bits_per_sample
            )));
        }

        let samples = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TranscriptionError::Format(format!("invalid WAV samples: {e}")))?;

        Ok(Self {
            format: AudioFormat {
                sample_rate: spec.sample_rate,
                sample_width: 2,
                channels: spec.channels,
            },
            samples,
        })
    }
}

/// Convert an f32 sample in `[-1.0, 1.0]` to i16
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// RMS energy of i16 samples, normalized to full scale
#[allow(clippy::cast_precision_loss)]
pub(crate) fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples
        .iter()
        .map(|&s| {
            let v = f32::from(s) / 32768.0;
            v * v
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}
