//! Microphone capture and signal conditioning for voice clips
//!
//! voxclip turns live speech into a clean, bounded audio clip: continuous
//! background capture of 16-bit PCM chunks, energy-based silence detection
//! with auto-stop, and an offline DSP pipeline applied to the captured
//! buffer before it is written out.
//!
//! # Architecture
//!
//! - `audio::capture`: the `SampleSource` trait and the cpal-backed
//!   microphone adapter
//! - `audio::session`: the capture session state machine and background loop
//! - `audio::silence`: pointwise RMS silence classification
//! - `audio::preprocessing`: normalize, DC removal, band-pass, spectral-
//!   subtraction denoise, silence trim
//! - `output`: WAV persistence
//! - `config`: configuration structures
//! - `error`: error types
//!
//! # Example
//!
//! ```no_run
//! use voxclip::{
//!     CaptureOptions, CaptureSession, Config, CpalSampleSource, SignalPreprocessor,
//! };
//!
//! let config = Config::default();
//!
//! let source = CpalSampleSource::new(config.audio.clone());
//! let mut session = CaptureSession::new(source, &config.capture);
//! session.start_recording(CaptureOptions::from_config(&config.capture)).unwrap();
//!
//! while session.is_recording() {
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! let raw = session.stop_recording();
//!
//! let preprocessor = SignalPreprocessor::new(config.preprocess.clone());
//! let clip = preprocessor.process_i16(&raw).unwrap();
//! voxclip::output::write_wav_f32(
//!     std::path::Path::new("clip.wav"),
//!     config.audio.sample_rate,
//!     config.audio.channels,
//!     &clip,
//! )
//! .unwrap();
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod output;

// Re-exports for convenience
pub use audio::{
    samples_to_f32, CaptureOptions, CaptureSession, CaptureState, ChunkSink, CpalSampleSource,
    SampleChunk, SampleSource, SignalPreprocessor, SilenceDetector,
};
pub use config::{AudioConfig, CaptureConfig, Config, OutputConfig, PreprocessConfig, Stage};
pub use error::{AudioError, ClipError, ConfigError, DspError, Result};
pub use output::{read_wav, write_wav_f32, write_wav_i16, WavInfo};
