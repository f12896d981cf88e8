//! Capture session: background capture loop and auto-stop state machine

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{error, info, warn};

use crate::audio::capture::{SampleChunk, SampleSource};
use crate::audio::silence::SilenceDetector;
use crate::config::CaptureConfig;
use crate::error::Result;

/// Per-chunk observer invoked synchronously on the capture thread.
///
/// Contract: implementations must not block (capture stalls) and must not
/// panic (a panicking sink aborts the capture loop). Heavier consumers
/// should hand chunks off to their own task via a bounded queue.
pub trait ChunkSink: Send {
    fn on_chunk(&mut self, chunk: &[i16], is_silent: bool);
}

impl<F> ChunkSink for F
where
    F: FnMut(&[i16], bool) + Send,
{
    fn on_chunk(&mut self, chunk: &[i16], is_silent: bool) {
        self(chunk, is_silent)
    }
}

/// Session lifecycle; `Stopped` is terminal, construct a new session
/// to record again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopped,
}

/// Options consumed at `start_recording`
pub struct CaptureOptions {
    /// Optional per-chunk observer
    pub observer: Option<Box<dyn ChunkSink>>,
    /// Stop after this much trailing silence; `None` disables auto-stop
    pub auto_stop_silence_secs: Option<f32>,
    /// RMS threshold below which a chunk is silent
    pub silence_threshold: f32,
}

impl CaptureOptions {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            observer: None,
            auto_stop_silence_secs: config.auto_stop_silence_secs,
            silence_threshold: config.silence_threshold,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn ChunkSink>) -> Self {
        self.observer = Some(observer);
        self
    }
}

/// Auto-stop bookkeeping carried across loop iterations.
///
/// `accumulated_silence_secs` only advances once `has_detected_sound` is
/// true (pre-speech silence never counts toward auto-stop) and resets to
/// zero the instant a non-silent chunk arrives.
struct SilenceState {
    has_detected_sound: bool,
    accumulated_silence_secs: f32,
    last_chunk: Instant,
}

/// Owns the background capture loop for one recording.
///
/// The loop thread exclusively owns the sample buffer; the only cross-thread
/// communication is the atomic recording flag and the join inside
/// [`stop_recording`](CaptureSession::stop_recording), which transfers the
/// buffer back to the caller.
pub struct CaptureSession<S: SampleSource> {
    source: S,
    state: CaptureState,
    recording: Arc<AtomicBool>,
    handle: Option<JoinHandle<Vec<i16>>>,
    read_timeout: Duration,
}

impl<S: SampleSource> CaptureSession<S> {
    pub fn new(source: S, config: &CaptureConfig) -> Self {
        Self {
            source,
            state: CaptureState::Idle,
            recording: Arc::new(AtomicBool::new(false)),
            handle: None,
            read_timeout: Duration::from_millis(config.read_timeout_ms),
        }
    }

    /// Open the device and spawn the capture loop.
    ///
    /// No-op (with a warning) when already recording or already stopped.
    /// On a device-open failure the session stays `Idle` and the error is
    /// returned; no loop is started.
    pub fn start_recording(&mut self, opts: CaptureOptions) -> Result<()> {
        match self.state {
            CaptureState::Recording => {
                warn!("Already recording");
                return Ok(());
            }
            CaptureState::Stopped => {
                warn!("Session already stopped; construct a new session to record again");
                return Ok(());
            }
            CaptureState::Idle => {}
        }

        let receiver = self.source.open()?;

        let detector = SilenceDetector::new(opts.silence_threshold);
        let recording = Arc::clone(&self.recording);
        recording.store(true, Ordering::Relaxed);

        let auto_stop = opts.auto_stop_silence_secs;
        let observer = opts.observer;
        let read_timeout = self.read_timeout;

        self.handle = Some(std::thread::spawn(move || {
            capture_loop(receiver, recording, detector, auto_stop, observer, read_timeout)
        }));
        self.state = CaptureState::Recording;

        match auto_stop {
            Some(secs) => info!("Recording started (auto-stop after {:.1}s of silence)", secs),
            None => info!("Recording started"),
        }
        Ok(())
    }

    /// Stop the loop and return everything captured this session.
    ///
    /// Blocks until the loop thread has exited and the device is closed.
    /// Never panics: called without an active loop (never started, or a
    /// second time) it logs and returns an empty buffer.
    pub fn stop_recording(&mut self) -> Vec<i16> {
        let Some(handle) = self.handle.take() else {
            warn!("Not currently recording");
            return Vec::new();
        };

        self.recording.store(false, Ordering::Relaxed);
        let buffer = match handle.join() {
            Ok(buffer) => buffer,
            Err(_) => {
                error!("Capture loop panicked (misbehaving observer?); buffer lost");
                Vec::new()
            }
        };

        self.source.close();
        self.state = CaptureState::Stopped;
        info!(
            "Recording stopped ({} samples captured)",
            buffer.len()
        );
        buffer
    }

    /// Whether the capture loop is live. Goes false on its own when
    /// auto-stop fires or the device fails, so callers can poll while
    /// waiting for the recording to finish.
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The underlying source, for querying negotiated device parameters
    /// after `start_recording`
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Idempotent teardown: stops first if still recording (discarding the
    /// buffer), then releases the device. Safe to call repeatedly and on a
    /// session that never opened a device.
    pub fn cleanup(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop_recording();
        }
        self.source.close();
    }
}

impl<S: SampleSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// The capture loop. Runs on the background thread and exclusively owns the
/// growing sample buffer, returning it on exit.
///
/// Per chunk: append to the buffer, classify, update the auto-stop
/// accounting, then invoke the observer, all within the iteration in
/// device-read order. Silence accumulates by wall-clock deltas between
/// chunk arrivals, which tolerates scheduling jitter better than a fixed
/// chunk-duration constant.
fn capture_loop(
    receiver: Receiver<SampleChunk>,
    recording: Arc<AtomicBool>,
    detector: SilenceDetector,
    auto_stop: Option<f32>,
    mut observer: Option<Box<dyn ChunkSink>>,
    read_timeout: Duration,
) -> Vec<i16> {
    let mut buffer: Vec<i16> = Vec::new();
    let mut silence = SilenceState {
        has_detected_sound: false,
        accumulated_silence_secs: 0.0,
        last_chunk: Instant::now(),
    };

    while recording.load(Ordering::Relaxed) {
        let chunk = match receiver.recv_timeout(read_timeout) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => continue, // transient: drop the cycle
            Err(RecvTimeoutError::Disconnected) => {
                error!("Audio source disconnected; stopping capture");
                recording.store(false, Ordering::Relaxed);
                break;
            }
        };

        let now = Instant::now();
        buffer.extend_from_slice(&chunk);

        let is_silent = detector.is_silent(&chunk);
        if let Some(max_silence) = auto_stop {
            if !is_silent {
                silence.has_detected_sound = true;
                silence.accumulated_silence_secs = 0.0;
            } else if silence.has_detected_sound {
                silence.accumulated_silence_secs += (now - silence.last_chunk).as_secs_f32();
                if silence.accumulated_silence_secs >= max_silence {
                    info!(
                        "Silence for {:.1}s; stopping capture",
                        silence.accumulated_silence_secs
                    );
                    recording.store(false, Ordering::Relaxed);
                }
            }
        }
        silence.last_chunk = now;

        if let Some(ref mut sink) = observer {
            sink.on_chunk(&chunk, is_silent);
        }
    }

    buffer
}
