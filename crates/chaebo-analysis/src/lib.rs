//! Chaebo Feature Extractor
//!
//! Turns decoded audio into an [`AudioSummary`]: a global tempo estimate and a
//! time-ordered list of onsets, each carrying a pitch and a loudness.
//!
//! # Pipeline
//!
//! 1. Decode and downmix to mono, resample to 22.05 kHz ([`decode`])
//! 2. Estimate tempo on the unmodified signal ([`tempo`])
//! 3. Optionally slow the signal down by `slow_rate` ([`stretch`])
//! 4. Detect backtracked onsets on the (possibly slowed) signal ([`onset`])
//! 5. Attach the dominant pitch and magnitude of each onset frame ([`pitch`])
//! 6. Map onset times back to the original timeline and cap the count
//!
//! # Example
//!
//! ```
//! use chaebo_analysis::{analyze_samples, AnalysisConfig};
//!
//! let silence = vec![0.0f32; 22050];
//! let summary = analyze_samples(&silence, &AnalysisConfig::default()).unwrap();
//! assert!(summary.onsets.is_empty());
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod onset;
pub mod pitch;
pub mod stft;
pub mod stretch;
pub mod tempo;


use std::path::Path;

use chaebo_spec::{AudioSummary, OnsetEvent};

pub use config::{AnalysisConfig, ANALYSIS_SAMPLE_RATE, DEFAULT_MAX_ONSETS};
pub use decode::{decode_audio, resample_linear, DecodedAudio};
pub use error::{AnalysisError, AnalysisResult};

/// Analyzes mono samples already at `config.sample_rate`.
pub fn analyze_samples(samples: &[f32], config: &AnalysisConfig) -> AnalysisResult<AudioSummary> {
    config.validate()?;
    if samples.is_empty() {
        return Err(AnalysisError::EmptyAudio);
    }

    let frame_rate = config.frame_rate();

    let original = stft::stft(samples, config.n_fft, config.hop_length);
    let tempo_envelope =
        onset::onset_strength(&original.magnitudes(), config.n_fft, config.hop_length);
    let tempo = tempo::estimate_tempo(&tempo_envelope, frame_rate);

    let magnitudes = if config.is_stretched() {
        let slowed =
            stretch::time_stretch(samples, config.slow_rate, config.n_fft, config.hop_length);
        stft::stft(&slowed, config.n_fft, config.hop_length).magnitudes()
    } else {
        original.magnitudes()
    };

    let envelope = onset::onset_strength(&magnitudes, config.n_fft, config.hop_length);
    let params = onset::PeakPickParams::for_frame_rate(frame_rate, config.onset_delta);
    let frames = onset::detect_onsets(&envelope, &params);

    let tracker = pitch::PitchTracker::new(
        config.sample_rate,
        config.n_fft,
        config.fmin,
        config.fmax,
        config.pitch_threshold,
    );

    let mut onsets = Vec::with_capacity(frames.len().min(config.max_onsets));
    let mut unpitched = 0usize;
    for frame in frames {
        if onsets.len() >= config.max_onsets {
            break;
        }
        let Some(peak) = magnitudes.get(frame).and_then(|m| tracker.dominant(m)) else {
            unpitched += 1;
            continue;
        };
        // Times measured on the slowed signal are scaled back by the slow rate.
        let time = config.frame_to_time(frame) * config.slow_rate;
        onsets.push(OnsetEvent::new(time, peak.midi(), peak.volume()));
    }

    log::debug!(
        "analysis: {} samples, tempo {} BPM, {} onsets ({} without pitch)",
        samples.len(),
        tempo,
        onsets.len(),
        unpitched
    );

    Ok(AudioSummary { tempo, onsets })
}

/// Decodes an in-memory audio file and analyzes it.
pub fn analyze_bytes(
    bytes: &[u8],
    extension: Option<&str>,
    config: &AnalysisConfig,
) -> AnalysisResult<AudioSummary> {
    let decoded = decode_audio(bytes, extension)?;
    log::debug!(
        "decoded {:.2}s at {} Hz",
        decoded.duration_seconds(),
        decoded.sample_rate
    );
    let audio = decoded.resampled(config.sample_rate);
    analyze_samples(&audio.samples, config)
}

/// Reads and analyzes an audio file.
pub fn analyze_file(path: &Path, config: &AnalysisConfig) -> AnalysisResult<AudioSummary> {
    let bytes = std::fs::read(path)?;
    let extension = path.extension().and_then(|e| e.to_str());
    analyze_bytes(&bytes, extension, config)
}
