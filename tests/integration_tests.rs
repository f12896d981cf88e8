//! Integration tests for voxclip

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use voxclip::{
    samples_to_f32, CaptureConfig, CaptureOptions, CaptureSession, Config, PreprocessConfig,
    Result, SampleChunk, SampleSource, SignalPreprocessor, Stage,
};

/// In-memory source that feeds scripted chunks at a fixed interval,
/// standing in for the microphone
struct ScriptedSource {
    chunks: Vec<SampleChunk>,
    interval: Duration,
    sender: Option<Sender<SampleChunk>>,
}

impl ScriptedSource {
    fn new(chunks: Vec<SampleChunk>, interval: Duration) -> Self {
        Self {
            chunks,
            interval,
            sender: None,
        }
    }
}

impl SampleSource for ScriptedSource {
    fn open(&mut self) -> Result<Receiver<SampleChunk>> {
        let (tx, rx) = bounded(32);
        // Keep one sender alive until close() so exhausting the script
        // does not read as a device failure
        self.sender = Some(tx.clone());
        let chunks = self.chunks.clone();
        let interval = self.interval;
        std::thread::spawn(move || {
            for chunk in chunks {
                if tx.send(chunk).is_err() {
                    break;
                }
                std::thread::sleep(interval);
            }
        });
        Ok(rx)
    }

    fn close(&mut self) {
        self.sender = None;
    }
}

/// Synthetic speech-like chunk: mixed formant sines, well above threshold
fn loud_chunk(len: usize) -> SampleChunk {
    (0..len)
        .map(|i| {
            let t = i as f32 / 16000.0;
            let s = 0.3 * (2.0 * std::f32::consts::PI * 300.0 * t).sin()
                + 0.2 * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
            (s * 32767.0) as i16
        })
        .collect()
}

fn silent_chunk(len: usize) -> SampleChunk {
    vec![3; len]
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn options(auto_stop: Option<f32>) -> CaptureOptions {
    CaptureOptions {
        observer: None,
        auto_stop_silence_secs: auto_stop,
        silence_threshold: 0.01,
    }
}

#[test]
fn test_auto_stop_scenario_loud_loud_silent_silent_silent() {
    // The canonical auto-stop scenario, scaled to 100ms chunk intervals:
    // two loud chunks then silence, with the window set to two inter-chunk
    // gaps. Accumulated silence reaches the window during the 4th chunk's
    // iteration, so the 5th chunk is never consumed.
    let chunk_len = 1600;
    let chunks = vec![
        loud_chunk(chunk_len),
        loud_chunk(chunk_len),
        silent_chunk(chunk_len),
        silent_chunk(chunk_len),
        silent_chunk(chunk_len),
    ];
    let source = ScriptedSource::new(chunks, Duration::from_millis(100));
    let mut session = CaptureSession::new(source, &CaptureConfig::default());
    session.start_recording(options(Some(0.15))).unwrap();

    let deadline = Instant::now() + Duration::from_secs(3);
    while session.is_recording() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!session.is_recording(), "auto-stop never fired");

    let buffer = session.stop_recording();
    assert_eq!(
        buffer.len(),
        4 * chunk_len,
        "buffer should hold exactly the chunks processed before auto-stop"
    );
}

#[test]
fn test_stop_recording_without_start() {
    let source = ScriptedSource::new(vec![], Duration::from_millis(10));
    let mut session = CaptureSession::new(source, &CaptureConfig::default());
    let buffer = session.stop_recording();
    assert!(buffer.is_empty());
}

#[test]
fn test_manual_stop_without_auto_stop() {
    let chunk_len = 320;
    let source = ScriptedSource::new(
        vec![loud_chunk(chunk_len); 3],
        Duration::from_millis(20),
    );
    let mut session = CaptureSession::new(source, &CaptureConfig::default());
    session.start_recording(options(None)).unwrap();

    std::thread::sleep(Duration::from_millis(200));
    assert!(session.is_recording(), "manual session stopped on its own");

    let buffer = session.stop_recording();
    assert_eq!(buffer.len(), 3 * chunk_len);
}

#[test]
fn test_observer_receives_every_chunk_with_classification() {
    use std::sync::{Arc, Mutex};

    let chunk_len = 320;
    let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let observer = Box::new(move |_chunk: &[i16], is_silent: bool| {
        seen_clone.lock().unwrap().push(is_silent);
    });

    let chunks = vec![
        loud_chunk(chunk_len),
        silent_chunk(chunk_len),
        loud_chunk(chunk_len),
    ];
    let source = ScriptedSource::new(chunks, Duration::from_millis(20));
    let mut session = CaptureSession::new(source, &CaptureConfig::default());
    session
        .start_recording(options(None).with_observer(observer))
        .unwrap();

    std::thread::sleep(Duration::from_millis(200));
    let _ = session.stop_recording();

    assert_eq!(seen.lock().unwrap().as_slice(), &[false, true, false]);
}

#[test]
fn test_capture_then_preprocess_then_persist() {
    // End to end: scripted capture, full pipeline, WAV round trip
    let chunk_len = 1600;
    let source = ScriptedSource::new(
        vec![loud_chunk(chunk_len); 4],
        Duration::from_millis(10),
    );
    let mut session = CaptureSession::new(source, &CaptureConfig::default());
    session.start_recording(options(None)).unwrap();
    std::thread::sleep(Duration::from_millis(150));
    let raw = session.stop_recording();
    assert_eq!(raw.len(), 4 * chunk_len);

    let preprocessor = SignalPreprocessor::new(PreprocessConfig::default());
    let clip = preprocessor.process_i16(&raw).unwrap();
    assert!(!clip.is_empty());
    assert!(clip.iter().all(|s| s.is_finite()));

    let path = std::env::temp_dir().join(format!("voxclip-e2e-{}.wav", std::process::id()));
    voxclip::write_wav_f32(&path, 16000, 1, &clip).unwrap();
    let (info, read) = voxclip::read_wav(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(info.sample_rate, 16000);
    assert_eq!(info.channels, 1);
    assert_eq!(read, clip);
}

#[test]
fn test_normalize_and_remove_dc_yield_zero_for_constant_input() {
    let config = PreprocessConfig {
        stages: vec![Stage::Normalize, Stage::RemoveDc],
        ..Default::default()
    };
    let preprocessor = SignalPreprocessor::new(config);
    let out = preprocessor.process(&[0.5, 0.5, 0.5]).unwrap();
    assert!(out.iter().all(|s| s.abs() < 1e-6));
}

#[test]
fn test_all_stages_disabled_returns_input_unchanged() {
    let config = PreprocessConfig {
        stages: vec![],
        ..Default::default()
    };
    let preprocessor = SignalPreprocessor::new(config);
    let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.07).sin()).collect();
    assert_eq!(preprocessor.process(&input).unwrap(), input);
}

#[test]
fn test_full_pipeline_on_synthetic_speech() {
    let config = PreprocessConfig {
        stages: vec![
            Stage::Normalize,
            Stage::RemoveDc,
            Stage::BandPass,
            Stage::Denoise,
            Stage::Trim,
        ],
        trim_threshold: 0.5,
        trim_frame_len: 512,
        trim_hop_len: 128,
        ..Default::default()
    };
    let preprocessor = SignalPreprocessor::new(config);

    // Half a second of near-silence, one second of speech, half of silence
    let mut input: Vec<f32> = vec![0.0001; 8000];
    input.extend(samples_to_f32(&loud_chunk(16000)));
    input.extend(vec![0.0001; 8000]);

    let out = preprocessor.process(&input).unwrap();
    assert!(!out.is_empty());
    assert!(out.len() < input.len(), "trim should have shortened the clip");
    assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.5));
    assert!(rms(&out) > 0.0);
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
        [audio]
        sample_rate = 48000

        [capture]
        silence_threshold = 0.02
        auto_stop_silence_secs = 3.0

        [preprocess]
        stages = ["normalize", "band_pass", "trim"]
        band_low_hz = 100.0
    "#;

    let config: Config = toml::from_str(toml_str).expect("Failed to parse TOML");
    assert_eq!(config.audio.sample_rate, 48000);
    assert_eq!(config.capture.auto_stop_silence_secs, Some(3.0));
    assert_eq!(
        config.preprocess.stages,
        vec![Stage::Normalize, Stage::BandPass, Stage::Trim]
    );
    assert_eq!(config.preprocess.band_low_hz, 100.0);
}
