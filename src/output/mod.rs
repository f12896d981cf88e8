//! WAV file persistence

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::error::Result;

/// Header fields of a WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// Write interleaved 16-bit samples as an uncompressed WAV file,
/// overwriting any existing file at `path`
pub fn write_wav_i16(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    samples: &[i16],
) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    info!("Audio saved to {}", path.display());
    Ok(())
}

/// Write interleaved float samples as a 32-bit float WAV file
pub fn write_wav_f32(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    samples: &[f32],
) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    info!("Audio saved to {}", path.display());
    Ok(())
}

/// Read a WAV file into normalized f32 samples (interleaved).
/// Integer formats are scaled by their maximum magnitude.
pub fn read_wav(path: &Path) -> Result<(WavInfo, Vec<f32>)> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let info = WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
    };
    Ok((info, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("voxclip-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_round_trip_i16() {
        let path = temp_path("rt-i16.wav");
        let samples: Vec<i16> = (0..1024).map(|i| ((i * 37) % 20000) as i16 - 10000).collect();

        write_wav_i16(&path, 16000, 1, &samples).unwrap();
        let (info, read) = read_wav(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        // i16 / 32768 is exact in f32
        let expected = crate::audio::preprocessing::samples_to_f32(&samples);
        assert_eq!(read, expected);
    }

    #[test]
    fn test_round_trip_f32() {
        let path = temp_path("rt-f32.wav");
        let samples: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();

        write_wav_f32(&path, 44100, 2, &samples).unwrap();
        let (info, read) = read_wav(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(read, samples);
    }

    #[test]
    fn test_overwrite_existing_file() {
        let path = temp_path("overwrite.wav");
        write_wav_i16(&path, 16000, 1, &[1, 2, 3]).unwrap();
        write_wav_i16(&path, 8000, 1, &[9, 8]).unwrap();

        let (info, read) = read_wav(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(info.sample_rate, 8000);
        assert_eq!(read.len(), 2);
    }

    #[test]
    fn test_unwritable_path_errors() {
        let path = PathBuf::from("/nonexistent-dir/voxclip.wav");
        assert!(write_wav_i16(&path, 16000, 1, &[0]).is_err());
    }
}
