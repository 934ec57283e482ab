//! Analysis configuration.

use crate::error::{AnalysisError, AnalysisResult};

/// Sample rate every input is resampled to before analysis.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Default cap on the number of onsets returned.
pub const DEFAULT_MAX_ONSETS: usize = 400;

/// Parameters of the feature extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Sample rate of the analyzed signal in Hz.
    pub sample_rate: u32,
    /// FFT size for every STFT.
    pub n_fft: usize,
    /// Hop between STFT frames.
    pub hop_length: usize,
    /// Speed ratio applied before onset detection, in (0, 1]. 1.0 leaves the signal as is.
    pub slow_rate: f64,
    /// Maximum number of onsets returned.
    pub max_onsets: usize,
    /// Lowest frequency considered by the pitch tracker (Hz).
    pub fmin: f32,
    /// Highest frequency considered by the pitch tracker (Hz).
    pub fmax: f32,
    /// Fraction of a frame's peak magnitude a pitch candidate must reach.
    pub pitch_threshold: f32,
    /// Minimum rise above the local mean for an onset peak (normalized envelope units).
    pub onset_delta: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: ANALYSIS_SAMPLE_RATE,
            n_fft: 2048,
            hop_length: 512,
            slow_rate: 1.0,
            max_onsets: DEFAULT_MAX_ONSETS,
            fmin: 150.0,
            fmax: 4000.0,
            pitch_threshold: 0.1,
            onset_delta: 0.07,
        }
    }
}

impl AnalysisConfig {
    /// Builder method to set the slow rate.
    pub fn with_slow_rate(mut self, slow_rate: f64) -> Self {
        self.slow_rate = slow_rate;
        self
    }

    /// Builder method to set the onset cap.
    pub fn with_max_onsets(mut self, max_onsets: usize) -> Self {
        self.max_onsets = max_onsets;
        self
    }

    /// Frames per second of every STFT.
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.hop_length as f64
    }

    /// Converts a frame index to seconds.
    pub fn frame_to_time(&self, frame: usize) -> f64 {
        (frame * self.hop_length) as f64 / self.sample_rate as f64
    }

    /// Returns true if onset detection runs on a time-stretched signal.
    pub fn is_stretched(&self) -> bool {
        (self.slow_rate - 1.0).abs() > f64::EPSILON
    }

    /// Checks that every parameter is usable.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::invalid_param("sample_rate", "must be positive"));
        }
        if self.n_fft < 4 || !self.n_fft.is_power_of_two() {
            return Err(AnalysisError::invalid_param(
                "n_fft",
                format!("{} is not a power of two >= 4", self.n_fft),
            ));
        }
        if self.hop_length == 0 || self.hop_length > self.n_fft {
            return Err(AnalysisError::invalid_param(
                "hop_length",
                format!("{} must be in 1..={}", self.hop_length, self.n_fft),
            ));
        }
        if !(self.slow_rate > 0.0 && self.slow_rate <= 1.0) {
            return Err(AnalysisError::invalid_param(
                "slow_rate",
                format!("{} must be in (0, 1]", self.slow_rate),
            ));
        }
        if !(self.fmin >= 0.0 && self.fmin < self.fmax) {
            return Err(AnalysisError::invalid_param(
                "fmin",
                format!("{} must be below fmax {}", self.fmin, self.fmax),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_stretched());
    }

    #[test]
    fn test_slow_rate_bounds() {
        assert!(AnalysisConfig::default().with_slow_rate(0.5).validate().is_ok());
        assert!(AnalysisConfig::default().with_slow_rate(1.0).validate().is_ok());
        assert!(AnalysisConfig::default().with_slow_rate(0.0).validate().is_err());
        assert!(AnalysisConfig::default().with_slow_rate(1.5).validate().is_err());
        assert!(AnalysisConfig::default()
            .with_slow_rate(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_frame_to_time() {
        let config = AnalysisConfig::default();
        let t = config.frame_to_time(43);
        assert!((t - 43.0 * 512.0 / 22050.0).abs() < 1e-12);
    }
}
