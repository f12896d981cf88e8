//! Sample sources: the cpal-backed microphone adapter

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, Host, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfig,
    SupportedStreamConfigRange,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::config::AudioConfig;
use crate::error::{AudioError, Result};

/// One read cycle's worth of interleaved 16-bit samples
/// (`chunk_frames * channels` per chunk)
pub type SampleChunk = Vec<i16>;

/// A device that produces fixed-size chunks of signed 16-bit samples.
///
/// `open` acquires the device and hands back the receiving end of a bounded
/// channel the capture loop reads from. A disconnected channel signals a
/// fatal device error; a receive timeout is a transient hiccup. `close`
/// releases the device and must be idempotent.
pub trait SampleSource {
    fn open(&mut self) -> Result<Receiver<SampleChunk>>;
    fn close(&mut self);
}

/// Microphone input via cpal
pub struct CpalSampleSource {
    config: AudioConfig,
    host: Host,
    stream: Option<Stream>,
    actual_sample_rate: u32,
    actual_channels: u16,
}

impl CpalSampleSource {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            host: cpal::default_host(),
            stream: None,
            actual_sample_rate: 0,
            actual_channels: 0,
        }
    }

    /// List available audio input devices
    pub fn list_devices(&self) -> Result<Vec<String>> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Sample rate the device actually opened with (0 before `open`).
    ///
    /// Negotiation may land on a different rate than requested; persisted
    /// artifacts must be stamped with this value, not the requested one.
    pub fn actual_sample_rate(&self) -> u32 {
        self.actual_sample_rate
    }

    /// Channel count the device actually opened with (0 before `open`)
    pub fn actual_channels(&self) -> u16 {
        self.actual_channels
    }

    fn find_device(&self) -> Result<Device> {
        if let Some(ref name) = self.config.device {
            let devices = self
                .host
                .input_devices()
                .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

            for device in devices {
                if let Ok(device_name) = device.name() {
                    if device_name.contains(name) {
                        return Ok(device);
                    }
                }
            }
            Err(AudioError::DeviceNotFound(name.clone()).into())
        } else {
            Ok(self
                .host
                .default_input_device()
                .ok_or(AudioError::NoInputDevice)?)
        }
    }
}

/// Pick the best supported configuration for the requested channel count
/// and sample rate. Prefers an exact channels-and-rate match (native i16
/// over formats needing conversion), then falls back to whatever the
/// device offers; the caller must read the negotiated values back rather
/// than assume the request was honored.
fn pick_best_config(
    requested: &AudioConfig,
    supported: impl Iterator<Item = SupportedStreamConfigRange>,
) -> Option<SupportedStreamConfig> {
    let target_rate = SampleRate(requested.sample_rate);
    let mut best_config = None;

    for cfg in supported {
        debug!(
            "Supported config: channels={}, sample_rate={:?}-{:?}, format={:?}",
            cfg.channels(),
            cfg.min_sample_rate(),
            cfg.max_sample_rate(),
            cfg.sample_format()
        );

        if cfg.channels() == requested.channels {
            if cfg.min_sample_rate() <= target_rate && target_rate <= cfg.max_sample_rate() {
                best_config = Some(cfg.with_sample_rate(target_rate));
                // Native i16 needs no conversion; keep scanning for it
                if best_config.as_ref().map(|c| c.sample_format()) == Some(SampleFormat::I16) {
                    break;
                }
            } else if best_config.is_none() {
                best_config = Some(cfg.with_max_sample_rate());
            }
        } else if best_config.is_none() {
            best_config = Some(cfg.with_max_sample_rate());
        }
    }

    best_config
}

impl SampleSource for CpalSampleSource {
    fn open(&mut self) -> Result<Receiver<SampleChunk>> {
        // Exclusive ownership: re-opening releases any previous stream first
        self.close();

        let device = self.find_device()?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio input device: {}", device_name);

        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;
        let supported = pick_best_config(&self.config, supported_configs).ok_or_else(|| {
            AudioError::DeviceConfig("No suitable audio configuration found".to_string())
        })?;

        let sample_format = supported.sample_format();
        self.actual_sample_rate = supported.sample_rate().0;
        self.actual_channels = supported.channels();
        info!(
            "Audio config: {} channels @ {} Hz, {:?} (target: {} Hz)",
            self.actual_channels, self.actual_sample_rate, sample_format, self.config.sample_rate
        );
        if self.actual_sample_rate != self.config.sample_rate
            || self.actual_channels != self.config.channels
        {
            warn!(
                "Device does not support {} channels @ {} Hz; capturing {} channels @ {} Hz instead",
                self.config.channels,
                self.config.sample_rate,
                self.actual_channels,
                self.actual_sample_rate
            );
        }

        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let chunk_len = self.config.chunk_frames as usize * supported.channels() as usize;
        let (sender, receiver) = bounded(100); // Buffer up to 100 chunks

        let err_fn = |err| {
            error!("Audio stream error: {}", err);
        };

        let stream = match sample_format {
            SampleFormat::I16 => device
                .build_input_stream(
                    &stream_config,
                    chunking_callback(sender, chunk_len, |s: i16| s),
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamBuild(e.to_string()))?,
            SampleFormat::F32 => device
                .build_input_stream(
                    &stream_config,
                    chunking_callback(sender, chunk_len, |s: f32| {
                        (s * 32768.0).clamp(-32768.0, 32767.0) as i16
                    }),
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamBuild(e.to_string()))?,
            other => {
                return Err(AudioError::UnsupportedFormat(format!("{:?}", other)).into());
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        self.stream = Some(stream);
        info!("Audio capture started");
        Ok(receiver)
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Audio capture stopped");
        }
    }
}

impl Drop for CpalSampleSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build a cpal data callback that re-chunks driver buffers into fixed-size
/// chunks and pushes them into the bounded channel, dropping on overflow.
fn chunking_callback<T: Copy>(
    sender: Sender<SampleChunk>,
    chunk_len: usize,
    convert: impl Fn(T) -> i16 + Send + 'static,
) -> impl FnMut(&[T], &cpal::InputCallbackInfo) + Send + 'static {
    let mut pending: Vec<i16> = Vec::with_capacity(chunk_len * 2);
    move |data: &[T], _: &cpal::InputCallbackInfo| {
        pending.extend(data.iter().map(|&s| convert(s)));
        while pending.len() >= chunk_len {
            let chunk: SampleChunk = pending.drain(..chunk_len).collect();
            if sender.try_send(chunk).is_err() {
                warn!("Audio buffer overflow - dropping chunk");
            }
        }
    }
}
