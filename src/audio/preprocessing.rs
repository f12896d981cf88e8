//! Signal preprocessing: batch pipeline of composable transforms.
//!
//! Every stage is a pure `&[f32] -> Vec<f32>` over the whole buffer; enabled
//! stages run in the canonical order normalize → remove_dc → band_pass →
//! denoise → trim no matter how they were enabled. A disabled stage is
//! absent from the pipeline, not an identity pass. Stages raise only on
//! malformed input and perform no I/O.

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type, Q_BUTTERWORTH_F32};
use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

use crate::config::{PreprocessConfig, Stage};
use crate::error::{DspError, Result};

/// Scale 16-bit samples into [-1, 1].
///
/// This is the integer half of the normalize contract: integer buffers
/// enter the float domain by dividing by the encoding's maximum magnitude.
pub fn samples_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Offline preprocessor applied to a complete captured buffer
pub struct SignalPreprocessor {
    config: PreprocessConfig,
}

impl SignalPreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Run the enabled stages over a float buffer
    pub fn process(&self, samples: &[f32]) -> Result<Vec<f32>> {
        self.run_stages(samples.to_vec(), &Stage::CANONICAL_ORDER)
    }

    /// Run the enabled stages over a raw captured buffer.
    ///
    /// The 1/32768 scaling performed here *is* the normalize stage for
    /// integer input, so the float-path normalize is skipped.
    pub fn process_i16(&self, samples: &[i16]) -> Result<Vec<f32>> {
        let floats = samples_to_f32(samples);
        let order: Vec<Stage> = Stage::CANONICAL_ORDER
            .iter()
            .copied()
            .filter(|&s| s != Stage::Normalize)
            .collect();
        self.run_stages(floats, &order)
    }

    fn run_stages(&self, mut samples: Vec<f32>, order: &[Stage]) -> Result<Vec<f32>> {
        for &stage in order {
            if !self.config.has_stage(stage) {
                continue;
            }
            debug!("Applying stage: {}", stage);
            samples = match stage {
                Stage::Normalize => self.normalize(&samples),
                Stage::RemoveDc => self.remove_dc_offset(&samples),
                Stage::BandPass => self.band_pass(&samples)?,
                Stage::Denoise => self.denoise(&samples, None)?,
                Stage::Trim => self.trim_silence(&samples),
            };
        }
        Ok(samples)
    }

    /// Peak-normalize a float buffer by its maximum absolute value.
    /// No-op when the buffer is all zero, and hence idempotent once the
    /// peak is already 1.0.
    pub fn normalize(&self, samples: &[f32]) -> Vec<f32> {
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        if peak == 0.0 {
            return samples.to_vec();
        }
        samples.iter().map(|s| s / peak).collect()
    }

    /// Subtract the arithmetic mean from every sample
    pub fn remove_dc_offset(&self, samples: &[f32]) -> Vec<f32> {
        if samples.is_empty() {
            return Vec::new();
        }
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        samples.iter().map(|s| s - mean).collect()
    }

    /// Band-pass: cascaded Butterworth biquad sections, a high-pass at the
    /// low cutoff and a low-pass at the high cutoff per cascade
    pub fn band_pass(&self, samples: &[f32]) -> Result<Vec<f32>> {
        if samples.is_empty() {
            return Err(DspError::EmptyInput { stage: "band_pass" }.into());
        }

        let nyquist = self.config.sample_rate as f32 / 2.0;
        let low = self.config.band_low_hz;
        let high = self.config.band_high_hz;
        if !(0.0 < low && low < high && high < nyquist) {
            return Err(DspError::InvalidBand {
                low_hz: low,
                high_hz: high,
                sample_rate: self.config.sample_rate,
            }
            .into());
        }

        let fs = self.config.sample_rate.hz();
        let mut sections: Vec<DirectForm1<f32>> = Vec::new();
        for _ in 0..self.config.band_order.max(1) {
            let hp = Coefficients::<f32>::from_params(Type::HighPass, fs, low.hz(), Q_BUTTERWORTH_F32)
                .map_err(|e| DspError::FilterDesign(format!("{:?}", e)))?;
            let lp = Coefficients::<f32>::from_params(Type::LowPass, fs, high.hz(), Q_BUTTERWORTH_F32)
                .map_err(|e| DspError::FilterDesign(format!("{:?}", e)))?;
            sections.push(DirectForm1::<f32>::new(hp));
            sections.push(DirectForm1::<f32>::new(lp));
        }

        let mut output = samples.to_vec();
        for section in sections.iter_mut() {
            for sample in output.iter_mut() {
                *sample = section.run(*sample);
            }
        }
        Ok(output)
    }

    /// Spectral-subtraction noise reduction.
    ///
    /// The noise power spectrum comes from `noise_profile` or, by default,
    /// the first `noise_profile_secs` of the buffer. The buffer is
    /// processed in chunks of the profile length (zero-padding the final
    /// short chunk): per chunk, subtract the noise power clipped at zero,
    /// take the square root to recover magnitude, and recombine with the
    /// chunk's original phase. Lossy on very short or non-stationary
    /// profiles.
    pub fn denoise(&self, samples: &[f32], noise_profile: Option<&[f32]>) -> Result<Vec<f32>> {
        if samples.is_empty() {
            return Err(DspError::EmptyInput { stage: "denoise" }.into());
        }

        let default_len =
            ((self.config.noise_profile_secs * self.config.sample_rate as f32) as usize)
                .min(samples.len());
        let profile = match noise_profile {
            Some(p) => p,
            None => &samples[..default_len],
        };
        if profile.is_empty() {
            return Err(DspError::EmptyNoiseProfile.into());
        }

        let n = profile.len();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let ifft = planner.plan_fft_inverse(n);

        let mut noise_buf: Vec<Complex<f32>> =
            profile.iter().map(|&s| Complex::new(s, 0.0)).collect();
        fft.process(&mut noise_buf);
        let noise_power: Vec<f32> = noise_buf.iter().map(|c| c.norm_sqr()).collect();

        let mut output = Vec::with_capacity(samples.len());
        for start in (0..samples.len()).step_by(n) {
            let chunk = &samples[start..(start + n).min(samples.len())];

            let mut buf: Vec<Complex<f32>> =
                chunk.iter().map(|&s| Complex::new(s, 0.0)).collect();
            buf.resize(n, Complex::new(0.0, 0.0)); // zero-pad the tail chunk
            fft.process(&mut buf);

            for (bin, &np) in buf.iter_mut().zip(noise_power.iter()) {
                let power = bin.norm_sqr();
                if power > 0.0 {
                    let clean_power = (power - np).max(0.0);
                    // sqrt of the power ratio rescales magnitude, phase intact
                    *bin *= (clean_power / power).sqrt();
                } else {
                    *bin = Complex::new(0.0, 0.0);
                }
            }

            ifft.process(&mut buf);
            let scale = 1.0 / n as f32;
            output.extend(buf.iter().take(chunk.len()).map(|c| c.re * scale));
        }

        Ok(output)
    }

    /// Trim leading and trailing silence.
    ///
    /// Frame energy (sum of squares) over sliding frames; the result spans
    /// the first to last frame whose energy exceeds the threshold, with the
    /// end boundary extended by one full frame length. When every frame is
    /// silent, or the buffer is shorter than one frame, the input comes
    /// back unchanged, never an empty buffer.
    pub fn trim_silence(&self, samples: &[f32]) -> Vec<f32> {
        let frame_len = self.config.trim_frame_len;
        let hop = self.config.trim_hop_len.max(1);
        if samples.len() < frame_len || frame_len == 0 {
            return samples.to_vec();
        }

        let energies: Vec<f32> = (0..=samples.len() - frame_len)
            .step_by(hop)
            .map(|start| samples[start..start + frame_len].iter().map(|s| s * s).sum())
            .collect();

        let threshold = self.config.trim_threshold;
        let first = energies.iter().position(|&e| e > threshold);
        let last = energies.iter().rposition(|&e| e > threshold);

        match (first, last) {
            (Some(first), Some(last)) => {
                let start = first * hop;
                let end = (last * hop + frame_len).min(samples.len());
                samples[start..end].to_vec()
            }
            _ => samples.to_vec(),
        }
    }
}
