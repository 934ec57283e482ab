//! Per-frame pitch tracking.
//!
//! Candidates are spectral peaks inside `[fmin, fmax)` that reach a fraction
//! of the frame's loudest bin. Each peak's frequency and magnitude are refined
//! by parabolic interpolation over its neighbours.

/// Dominant pitch of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchPeak {
    /// Interpolated frequency in Hz.
    pub frequency: f32,
    /// Interpolated magnitude, scaled so a full-scale sine reads about 1.0.
    pub magnitude: f32,
}

impl PitchPeak {
    /// Truncated MIDI note number, or `None` for non-positive frequencies.
    pub fn midi(&self) -> Option<i32> {
        hz_to_midi(self.frequency)
    }

    /// Magnitude clamped to [0, 1].
    pub fn volume(&self) -> f64 {
        (self.magnitude as f64).clamp(0.0, 1.0)
    }
}

/// Converts a frequency to a MIDI note number, truncated toward zero.
pub fn hz_to_midi(frequency: f32) -> Option<i32> {
    if !(frequency > 0.0) {
        return None;
    }
    let midi = 69.0 + 12.0 * (frequency / 440.0).log2();
    Some(midi as i32)
}

/// Pitch tracker for one STFT geometry.
#[derive(Debug, Clone)]
pub struct PitchTracker {
    sample_rate: f32,
    n_fft: usize,
    fmin: f32,
    fmax: f32,
    threshold: f32,
    magnitude_scale: f32,
}

impl PitchTracker {
    /// Creates a tracker for frames of `n_fft` samples at `sample_rate`.
    pub fn new(sample_rate: u32, n_fft: usize, fmin: f32, fmax: f32, threshold: f32) -> Self {
        let sample_rate = sample_rate as f32;
        // Hann window sum is n_fft / 2; a sine of amplitude A peaks at A * n_fft / 4.
        let magnitude_scale = 4.0 / n_fft as f32;
        Self {
            sample_rate,
            n_fft,
            fmin: fmin.max(0.0),
            fmax: fmax.min(sample_rate / 2.0),
            threshold,
            magnitude_scale,
        }
    }

    fn bin_frequency(&self, bin: f32) -> f32 {
        bin * self.sample_rate / self.n_fft as f32
    }

    /// Returns the strongest pitch candidate in a magnitude frame.
    pub fn dominant(&self, frame: &[f32]) -> Option<PitchPeak> {
        if frame.len() < 3 {
            return None;
        }
        let frame_max = frame.iter().copied().fold(0.0f32, f32::max);
        if frame_max <= 0.0 {
            return None;
        }
        let reference = self.threshold * frame_max;
        let gated = |i: usize| if frame[i] > reference { frame[i] } else { 0.0 };

        let mut best: Option<PitchPeak> = None;
        for i in 1..frame.len() - 1 {
            let freq = self.bin_frequency(i as f32);
            if freq < self.fmin || freq >= self.fmax {
                continue;
            }
            let (prev, cur, next) = (gated(i - 1), gated(i), gated(i + 1));
            if !(cur > prev && cur >= next) {
                continue;
            }

            let avg = 0.5 * (frame[i + 1] - frame[i - 1]);
            let curvature = 2.0 * frame[i] - frame[i + 1] - frame[i - 1];
            let shift = if curvature.abs() < f32::EPSILON {
                0.0
            } else {
                avg / curvature
            };
            let magnitude = (frame[i] + 0.5 * avg * shift) * self.magnitude_scale;
            let candidate = PitchPeak {
                frequency: self.bin_frequency(i as f32 + shift),
                magnitude,
            };
            if best.map_or(true, |b| candidate.magnitude > b.magnitude) {
                best = Some(candidate);
            }
        }

        best.filter(|peak| peak.magnitude > 0.0)
    }
}
