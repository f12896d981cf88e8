//! Custom error types for voxclip

use thiserror::Error;

/// Main error type for voxclip
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("DSP error: {0}")]
    Dsp(#[from] DspError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Audio capture errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to get device configuration: {0}")]
    DeviceConfig(String),

    #[error("Failed to build audio stream: {0}")]
    StreamBuild(String),

    #[error("Stream playback error: {0}")]
    StreamPlay(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// DSP stage errors, raised only on malformed input; no stage performs I/O
#[derive(Error, Debug)]
pub enum DspError {
    #[error("{stage}: input buffer is empty")]
    EmptyInput { stage: &'static str },

    #[error("denoise: noise profile is empty")]
    EmptyNoiseProfile,

    #[error("band_pass: invalid band {low_hz}-{high_hz} Hz at {sample_rate} Hz")]
    InvalidBand {
        low_hz: f32,
        high_hz: f32,
        sample_rate: u32,
    },

    #[error("band_pass: filter construction failed: {0}")]
    FilterDesign(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, ClipError>;
