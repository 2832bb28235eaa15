//! Microphone capture using CPAL.

use crate::audio::source::CaptureSource;
use crate::audio::transcode::resample;
use crate::defaults;
use crate::error::{PolyvoxError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only accessed from one thread at a time; the
/// capture source is `&mut self` throughout and the stream is never shared.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// List available audio input device names.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| PolyvoxError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

fn find_device(device_name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match device_name {
        Some(name) => {
            let devices = host
                .input_devices()
                .map_err(|e| PolyvoxError::AudioCapture {
                    message: format!("Failed to enumerate input devices: {}", e),
                })?;
            for device in devices {
                if device.name().is_ok_and(|n| n == name) {
                    return Ok(device);
                }
            }
            Err(PolyvoxError::AudioDeviceNotFound {
                device: name.to_string(),
            })
        }
        None => host
            .default_input_device()
            .ok_or_else(|| PolyvoxError::AudioDeviceNotFound {
                device: "default".to_string(),
            }),
    }
}

/// Microphone capture source.
///
/// Records in the device's native format, downmixing to mono in the stream
/// callback and resampling to the canonical 16kHz on read. A live microphone
/// never reports end of stream; recording stops when the utterance
/// end-pointer decides it has heard enough.
pub struct MicrophoneSource {
    device: cpal::Device,
    stream: Option<SendableStream>,
    buffer: Arc<Mutex<Vec<i16>>>,
    native_rate: u32,
    target_rate: u32,
}

impl MicrophoneSource {
    /// Open a microphone. `device_name` of `None` selects the system
    /// default input.
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let device = find_device(device_name)?;
        tracing::debug!(
            device = device.name().unwrap_or_else(|_| "<unnamed>".to_string()),
            "microphone selected"
        );
        Ok(Self {
            device,
            stream: None,
            buffer: Arc::new(Mutex::new(Vec::new())),
            native_rate: defaults::SAMPLE_RATE,
            target_rate: defaults::SAMPLE_RATE,
        })
    }

    fn build_stream(&mut self) -> Result<SendableStream> {
        let supported =
            self.device
                .default_input_config()
                .map_err(|e| PolyvoxError::AudioCapture {
                    message: format!("No supported input config: {}", e),
                })?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;
        self.native_rate = config.sample_rate.0;

        let buffer = Arc::clone(&self.buffer);
        let err_fn = |e| tracing::warn!(error = %e, "capture stream error");

        let stream = match sample_format {
            cpal::SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &config,
                    move |data: &[i16], _| {
                        let mut buffer = match buffer.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        for frame in data.chunks_exact(channels) {
                            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                            buffer.push((sum / channels as i32) as i16);
                        }
                    },
                    err_fn,
                    None,
                ),
            cpal::SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _| {
                        let mut buffer = match buffer.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        for frame in data.chunks_exact(channels) {
                            let sum: f32 = frame.iter().sum();
                            let avg = sum / channels as f32;
                            buffer.push((avg.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16);
                        }
                    },
                    err_fn,
                    None,
                ),
            other => {
                return Err(PolyvoxError::AudioCapture {
                    message: format!("Unsupported sample format: {:?}", other),
                });
            }
        }
        .map_err(|e| PolyvoxError::AudioCapture {
            message: format!("Failed to build input stream: {}", e),
        })?;

        Ok(SendableStream(stream))
    }
}

impl CaptureSource for MicrophoneSource {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = self.build_stream()?;
        stream.0.play().map_err(|e| PolyvoxError::AudioCapture {
            message: format!("Failed to start capture: {}", e),
        })?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            let _ = stream.0.pause();
        }
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<i16>>> {
        let drained: Vec<i16> = {
            let mut buffer = match self.buffer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *buffer)
        };
        if drained.is_empty() {
            // Live source: empty means "nothing buffered yet", never EOF
            return Ok(Some(Vec::new()));
        }
        if self.native_rate != self.target_rate {
            Ok(Some(resample(&drained, self.native_rate, self.target_rate)))
        } else {
            Ok(Some(drained))
        }
    }
}
