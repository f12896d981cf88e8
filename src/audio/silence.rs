//! Pointwise silence classification

/// Energy-based silence classifier.
///
/// A pure per-chunk judgment: RMS energy of the chunk against a fixed
/// threshold. Carries no temporal state; accumulated-silence and
/// has-spoken bookkeeping belong to the capture session, so the same
/// classifier can also drive a live level meter.
#[derive(Debug, Clone, Copy)]
pub struct SilenceDetector {
    threshold: f32,
}

impl SilenceDetector {
    /// Create a detector with the given RMS threshold (linear, 0.0 - 1.0)
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Classify one chunk: `true` when RMS energy is below the threshold.
    ///
    /// Samples are scaled by 1/32768 into [-1, 1] before the energy
    /// computation. An empty chunk has zero energy and classifies as silent.
    pub fn is_silent(&self, chunk: &[i16]) -> bool {
        rms(chunk) < self.threshold
    }

    /// The configured threshold
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// RMS energy of a chunk in the normalized [-1, 1] range
pub fn rms(chunk: &[i16]) -> f32 {
    if chunk.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = chunk
        .iter()
        .map(|&s| {
            let x = s as f32 / 32768.0;
            x * x
        })
        .sum();
    (sum_squares / chunk.len() as f32).sqrt()
}
