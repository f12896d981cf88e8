//! Audio capture and processing modules

pub mod capture;
pub mod preprocessing;
pub mod session;
pub mod silence;

pub use capture::{CpalSampleSource, SampleChunk, SampleSource};
pub use preprocessing::{samples_to_f32, SignalPreprocessor};
pub use session::{CaptureOptions, CaptureSession, CaptureState, ChunkSink};
pub use silence::SilenceDetector;
