//! Microphone capture using CPAL
//!
//! Delivers fixed-size mono chunks to a channel; the capture stream lives as long
//! as the returned `Stream` handle.

use crate::error::{VoiceError, VoiceResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Audio configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 16000)
    pub sample_rate: u32,

    /// Number of channels (default: 1 for mono)
    pub channels: u16,

    /// Buffer size in samples (default: 480 for 30ms at 16kHz)
    pub buffer_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_size: 480, // 30ms at 16kHz
        }
    }
}

impl AudioConfig {
    /// Duration of one chunk in milliseconds.
    pub fn chunk_ms(&self) -> u64 {
        (self.buffer_size as u64 * 1000) / self.sample_rate.max(1) as u64
    }
}

/// Audio chunk sent from the capture callback
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Audio samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,

    /// Timestamp when captured
    pub timestamp: std::time::Instant,
}

/// Root-mean-square level of a block of samples (0.0 for an empty block).
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Audio capture system using CPAL
pub struct AudioCapture {
    config: AudioConfig,
    device: Device,
    stream_config: StreamConfig,
}

impl AudioCapture {
    /// Open the default input device with the given configuration
    pub fn new(config: AudioConfig) -> VoiceResult<Self> {
        let device = cpal::default_host().default_input_device()
            .ok_or_else(|| VoiceError::AudioDevice("No input device available".to_string()))?;

        debug!(target: "herald::audio",
               "Input device: {} ({}Hz, {} channels)",
               device.name().unwrap_or_else(|_| "Unknown".to_string()),
               config.sample_rate, config.channels);

        // Fails early when the device has no usable input configuration at all
        device.default_input_config()?;

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            config,
            device,
            stream_config,
        })
    }

    /// Start capturing audio and send `buffer_size` chunks to the provided channel
    pub fn start_capture(
        self,
        chunk_tx: mpsc::UnboundedSender<AudioChunk>,
    ) -> VoiceResult<Stream> {
        let buffer_size = self.config.buffer_size;
        let mut sample_buffer = Vec::with_capacity(buffer_size);

        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    sample_buffer.push(sample);

                    if sample_buffer.len() >= buffer_size {
                        let chunk = AudioChunk {
                            samples: std::mem::replace(
                                &mut sample_buffer,
                                Vec::with_capacity(buffer_size),
                            ),
                            timestamp: std::time::Instant::now(),
                        };

                        // Receiver gone means the listener finished; drop the rest.
                        if chunk_tx.send(chunk).is_err() {
                            return;
                        }
                    }
                }
            },
            move |err| {
                warn!(target: "herald::audio", "Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;

        info!(target: "herald::audio", "Audio capture started");

        Ok(stream)
    }

    /// List available input devices
    pub fn list_input_devices() -> VoiceResult<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;

        let mut device_names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                device_names.push(name);
            }
        }

        Ok(device_names)
    }
}
