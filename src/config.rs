//! Configuration structures for voxclip

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub capture: CaptureConfig,
    pub preprocess: PreprocessConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, crate::error::ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| {
            crate::error::ConfigError::FileNotFound(path.display().to_string())
        })?;

        toml::from_str(&content).map_err(|e| crate::error::ConfigError::Parse(e.to_string()))
    }
}

/// Audio device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frames per captured chunk
    pub chunk_frames: u32,
    /// Audio device name (None = default device)
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_frames: 1024,
            device: None,
        }
    }
}

/// Capture session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// RMS energy threshold below which a chunk is silent (0.0 - 1.0)
    pub silence_threshold: f32,
    /// Stop after this many seconds of trailing silence (None = manual stop)
    pub auto_stop_silence_secs: Option<f32>,
    /// Bounded wait per chunk read (milliseconds)
    pub read_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.01,
            auto_stop_silence_secs: Some(2.0),
            read_timeout_ms: 100,
        }
    }
}

/// Preprocessing stage identifiers, in canonical pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normalize,
    RemoveDc,
    BandPass,
    Denoise,
    Trim,
}

impl Stage {
    /// Fixed relative order stages run in, independent of how they were enabled
    pub const CANONICAL_ORDER: [Stage; 5] = [
        Stage::Normalize,
        Stage::RemoveDc,
        Stage::BandPass,
        Stage::Denoise,
        Stage::Trim,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Normalize => write!(f, "normalize"),
            Stage::RemoveDc => write!(f, "remove_dc"),
            Stage::BandPass => write!(f, "band_pass"),
            Stage::Denoise => write!(f, "denoise"),
            Stage::Trim => write!(f, "trim"),
        }
    }
}

/// Signal preprocessing configuration.
///
/// Fully determines the pipeline output for a given input; no hidden state.
/// With no stages enabled the float path ([`process`]) is the identity.
/// Integer input always enters the float domain scaled by 1/32768, even
/// with `normalize` disabled, so the identity property holds for
/// [`process_i16`] only up to that fixed scaling.
///
/// [`process`]: crate::SignalPreprocessor::process
/// [`process_i16`]: crate::SignalPreprocessor::process_i16
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Enabled stages; applied in [`Stage::CANONICAL_ORDER`]
    pub stages: Vec<Stage>,
    /// Sample rate of the buffers being processed (Hz)
    pub sample_rate: u32,
    /// Band-pass low cutoff frequency (Hz)
    pub band_low_hz: f32,
    /// Band-pass high cutoff frequency (Hz)
    pub band_high_hz: f32,
    /// Number of cascaded biquad sections per band edge
    pub band_order: u32,
    /// Length of the default noise profile (seconds of buffer head)
    pub noise_profile_secs: f32,
    /// Frame energy threshold for silence trimming
    pub trim_threshold: f32,
    /// Trim analysis frame length (samples)
    pub trim_frame_len: usize,
    /// Trim hop size between frames (samples)
    pub trim_hop_len: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            stages: vec![Stage::Normalize, Stage::RemoveDc, Stage::BandPass],
            sample_rate: 16000,
            band_low_hz: 80.0,
            band_high_hz: 8000.0,
            band_order: 5,
            noise_profile_secs: 0.5,
            trim_threshold: 0.01,
            trim_frame_len: 2048,
            trim_hop_len: 512,
        }
    }
}

impl PreprocessConfig {
    /// Check whether a stage is enabled
    pub fn has_stage(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to write the unprocessed capture (None = skip)
    pub raw_path: Option<PathBuf>,
    /// Where to write the processed clip
    pub processed_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_path: None,
            processed_path: PathBuf::from("clip.wav"),
        }
    }
}
