//! Onset events produced by audio analysis.

use serde::{Deserialize, Serialize};

/// Number of decimal places kept for onset and note times.
pub const TIME_DECIMALS: i32 = 4;

/// Round a float to the specified number of decimal places.
pub fn round_f64(value: f64, decimals: i32) -> f64 {
    let multiplier = 10_f64.powi(decimals);
    (value * multiplier).round() / multiplier
}

/// Round a time in seconds to [`TIME_DECIMALS`] places.
pub fn round_time(seconds: f64) -> f64 {
    round_f64(seconds, TIME_DECIMALS)
}

/// A detected note attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetEvent {
    /// Time in seconds on the original (unstretched) audio, 4 decimals.
    pub time: f64,
    /// MIDI note number of the dominant pitch, if one was found.
    pub pitch: Option<i32>,
    /// Loudness of the dominant bin, in [0, 1].
    pub volume: f64,
}

impl OnsetEvent {
    /// Creates an onset, rounding the time and clamping the volume.
    pub fn new(time: f64, pitch: Option<i32>, volume: f64) -> Self {
        Self {
            time: round_time(time),
            pitch,
            volume: volume.clamp(0.0, 1.0),
        }
    }
}

/// Output of the feature extractor for one audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSummary {
    /// Tempo estimate in beats per minute, measured on the unmodified signal.
    #[serde(rename = "bpm")]
    pub tempo: f64,
    /// Onsets in detection order.
    pub onsets: Vec<OnsetEvent>,
}

impl AudioSummary {
    /// Duration spanned by the onsets, in seconds.
    pub fn onset_span(&self) -> f64 {
        match (self.onsets.first(), self.onsets.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }
}
