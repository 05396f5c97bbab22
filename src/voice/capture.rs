//! Audio capture from microphone
//!
//! The cpal callback runs on the media thread and hands each buffer to an
//! unbounded channel as an [`AudioFrame`]; nothing else crosses that thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use tokio::sync::mpsc;

use super::audio::{AudioFormat, AudioFrame};
use crate::{Error, Result};

/// Audio devices available on the default host
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Enumerate input and output device names
///
/// # Errors
///
/// Returns error if the audio host cannot enumerate devices
pub fn list_devices() -> Result<DeviceList> {
    let host = cpal::default_host();

    let inputs = host
        .input_devices()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter_map(|d| d.name().ok())
        .collect();
    let outputs = host
        .output_devices()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter_map(|d| d.name().ok())
        .collect();

    Ok(DeviceList { inputs, outputs })
}

/// Find an input device by name, or the default input device
pub(crate) fn input_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .input_devices()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .ok_or_else(|| Error::Audio(format!("input device not found: {name}"))),
        None => host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string())),
    }
}

/// Captures audio from an input device
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    format: AudioFormat,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open an input device for the given session format
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened or does not support the format
    pub fn new(device_name: Option<&str>, format: AudioFormat) -> Result<Self> {
        let device = input_device(device_name)?;
        let rate = SampleRate(format.sample_rate);

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == format.channels
                    && c.sample_format() == cpal::SampleFormat::F32
                    && c.min_sample_rate() <= rate
                    && c.max_sample_rate() >= rate
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config.with_sample_rate(rate).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = format.sample_rate,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            format,
            stream: None,
        })
    }

    /// Start capturing, delivering frames to `frames`
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be built or started
    pub fn start(&mut self, frames: mpsc::UnboundedSender<AudioFrame>) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let format = self.format;
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Receiver gone means the session ended
                    let _ = frames.send(AudioFrame::from_f32(format, data));
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Session format of delivered frames
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
