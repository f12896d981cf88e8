//! voxclip CLI: record voice clips and run the conditioning pipeline

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use voxclip::audio::silence::rms;
use voxclip::{
    CaptureOptions, CaptureSession, Config, CpalSampleSource, SignalPreprocessor, Stage,
};

/// Microphone capture and signal conditioning for voice clips
#[derive(Parser)]
#[command(name = "voxclip")]
#[command(about = "Record speech and condition it into a clean clip", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Record from the microphone, auto-stopping on silence
    Record {
        /// Processed output WAV path
        #[arg(short, long, default_value = "clip.wav")]
        output: PathBuf,

        /// Also save the unprocessed capture to this path
        #[arg(long)]
        raw: Option<PathBuf>,

        /// Audio input device name (uses default if not specified)
        #[arg(short, long)]
        device: Option<String>,

        /// Auto-stop after this many seconds of silence (0 = manual stop only)
        #[arg(short = 's', long, default_value = "2.0")]
        auto_stop: f32,

        /// Silence RMS threshold (linear, 0.0 - 1.0)
        #[arg(short = 't', long, default_value = "0.01")]
        threshold: f32,

        /// Disable peak normalization
        #[arg(long)]
        no_normalize: bool,

        /// Disable DC offset removal
        #[arg(long)]
        no_remove_dc: bool,

        /// Disable the band-pass filter
        #[arg(long)]
        no_bandpass: bool,

        /// Enable spectral-subtraction denoising
        #[arg(long)]
        denoise: bool,

        /// Enable head/tail silence trimming
        #[arg(long)]
        trim: bool,

        /// Hide the live level meter
        #[arg(long)]
        no_meter: bool,
    },

    /// Run the conditioning pipeline over an existing WAV file
    Process {
        /// Input WAV file path
        input: PathBuf,

        /// Output WAV file path
        #[arg(short, long, default_value = "processed.wav")]
        output: PathBuf,

        /// Disable peak normalization
        #[arg(long)]
        no_normalize: bool,

        /// Disable DC offset removal
        #[arg(long)]
        no_remove_dc: bool,

        /// Disable the band-pass filter
        #[arg(long)]
        no_bandpass: bool,

        /// Enable spectral-subtraction denoising
        #[arg(long)]
        denoise: bool,

        /// Enable head/tail silence trimming
        #[arg(long)]
        trim: bool,
    },

    /// List available audio input devices
    Devices,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Quiet by default, use -v for more
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Record {
            output,
            raw,
            device,
            auto_stop,
            threshold,
            no_normalize,
            no_remove_dc,
            no_bandpass,
            denoise,
            trim,
            no_meter,
        } => {
            if let Some(device) = device {
                config.audio.device = Some(device);
            }
            config.capture.silence_threshold = threshold;
            config.capture.auto_stop_silence_secs = if auto_stop > 0.0 {
                Some(auto_stop)
            } else {
                None
            };
            config.output.processed_path = output;
            config.output.raw_path = raw;
            apply_stage_flags(
                &mut config,
                no_normalize,
                no_remove_dc,
                no_bandpass,
                denoise,
                trim,
            );

            record(config, no_meter)
        }
        Commands::Process {
            input,
            output,
            no_normalize,
            no_remove_dc,
            no_bandpass,
            denoise,
            trim,
        } => {
            apply_stage_flags(
                &mut config,
                no_normalize,
                no_remove_dc,
                no_bandpass,
                denoise,
                trim,
            );
            process_file(config, input, output)
        }
        Commands::Devices => list_devices(config),
    }
}

fn apply_stage_flags(
    config: &mut Config,
    no_normalize: bool,
    no_remove_dc: bool,
    no_bandpass: bool,
    denoise: bool,
    trim: bool,
) {
    let stages = &mut config.preprocess.stages;
    if no_normalize {
        stages.retain(|&s| s != Stage::Normalize);
    }
    if no_remove_dc {
        stages.retain(|&s| s != Stage::RemoveDc);
    }
    if no_bandpass {
        stages.retain(|&s| s != Stage::BandPass);
    }
    if denoise && !stages.contains(&Stage::Denoise) {
        stages.push(Stage::Denoise);
    }
    if trim && !stages.contains(&Stage::Trim) {
        stages.push(Stage::Trim);
    }
}

/// Live console level meter, run on the capture thread (kept cheap)
fn level_meter(chunk: &[i16], is_silent: bool) {
    let energy = rms(chunk);
    let status = if is_silent { "[SILENT]  " } else { "[SPEAKING]" };
    let bar_len = ((energy * 500.0).min(50.0)) as usize;
    let bar: String = "=".repeat(bar_len);
    print!("\r{} {:<50} {:.4}", status, bar, energy);
    let _ = std::io::stdout().flush();
}

fn record(config: Config, no_meter: bool) -> Result<()> {
    // Ctrl-C is an alternate stop path, not a bypass: the partial buffer
    // is still returned and persisted
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let source = CpalSampleSource::new(config.audio.clone());
    let mut session = CaptureSession::new(source, &config.capture);

    let mut opts = CaptureOptions::from_config(&config.capture);
    if !no_meter {
        opts = opts.with_observer(Box::new(level_meter));
    }

    match config.capture.auto_stop_silence_secs {
        Some(secs) => println!(
            "Recording at {} Hz... will stop after {:.1}s of silence (Ctrl+C to stop early)",
            config.audio.sample_rate, secs
        ),
        None => println!(
            "Recording at {} Hz... press Ctrl+C to stop",
            config.audio.sample_rate
        ),
    }

    session
        .start_recording(opts)
        .context("Failed to start recording")?;

    // The device may have opened at a different rate or channel count
    // than requested; everything downstream (pipeline, WAV headers) must
    // use the negotiated values or the artifact gets mislabeled
    let sample_rate = session.source().actual_sample_rate();
    let channels = session.source().actual_channels();
    if sample_rate != config.audio.sample_rate || channels != config.audio.channels {
        println!(
            "Note: device opened at {} Hz / {} ch (requested {} Hz / {} ch)",
            sample_rate, channels, config.audio.sample_rate, config.audio.channels
        );
    }

    while session.is_recording() && running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    let raw = session.stop_recording();
    println!();

    if raw.is_empty() {
        warn!("No audio captured");
        println!("No audio recorded.");
        return Ok(());
    }

    println!(
        "Captured {} samples ({:.2}s)",
        raw.len(),
        raw.len() as f32 / (sample_rate as f32 * channels as f32)
    );

    if let Some(ref raw_path) = config.output.raw_path {
        voxclip::write_wav_i16(raw_path, sample_rate, channels, &raw)
            .with_context(|| format!("Failed to write {}", raw_path.display()))?;
        println!("Raw capture saved to {}", raw_path.display());
    }

    let mut preprocess = config.preprocess.clone();
    preprocess.sample_rate = sample_rate;
    let preprocessor = SignalPreprocessor::new(preprocess);
    let clip = preprocessor
        .process_i16(&raw)
        .context("Preprocessing failed")?;

    let ints: Vec<i16> = clip
        .iter()
        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
        .collect();
    voxclip::write_wav_i16(&config.output.processed_path, sample_rate, channels, &ints)
        .with_context(|| {
            format!("Failed to write {}", config.output.processed_path.display())
        })?;

    println!(
        "Processed clip saved to {} ({} samples, {:.2}s)",
        config.output.processed_path.display(),
        clip.len(),
        clip.len() as f32 / (sample_rate as f32 * channels as f32)
    );

    Ok(())
}

fn process_file(mut config: Config, input: PathBuf, output: PathBuf) -> Result<()> {
    let (info, samples) =
        voxclip::read_wav(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    info!(
        "WAV format: {} channels, {} Hz, {} bits",
        info.channels, info.sample_rate, info.bits_per_sample
    );

    config.preprocess.sample_rate = info.sample_rate;
    let preprocessor = SignalPreprocessor::new(config.preprocess.clone());
    let processed = preprocessor
        .process(&samples)
        .context("Preprocessing failed")?;

    let ints: Vec<i16> = processed
        .iter()
        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
        .collect();
    voxclip::write_wav_i16(&output, info.sample_rate, info.channels, &ints)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Processed {} samples -> {} samples, saved to {}",
        samples.len(),
        processed.len(),
        output.display()
    );
    Ok(())
}

fn list_devices(config: Config) -> Result<()> {
    let source = CpalSampleSource::new(config.audio);
    let devices = source.list_devices()?;

    if devices.is_empty() {
        println!("No audio input devices found");
    } else {
        println!("Available audio input devices:");
        for (i, name) in devices.iter().enumerate() {
            println!("  {}. {}", i + 1, name);
        }
    }

    Ok(())
}
