//! Global tempo estimation from an onset envelope.

/// Tempo the log-normal prior is centered on (BPM).
const PRIOR_BPM: f64 = 120.0;

/// Standard deviation of the prior, in octaves.
const PRIOR_STD_OCTAVES: f64 = 1.0;

/// Fastest tempo considered (BPM, exclusive).
const MAX_BPM: f64 = 320.0;

/// Longest autocorrelation window, in seconds.
const AC_WINDOW_SECONDS: f64 = 8.0;

/// Estimates the global tempo in BPM, rounded to two decimals.
///
/// Autocorrelates the onset envelope, weights each lag by a log-normal prior
/// around 120 BPM, and refines the best lag by parabolic interpolation.
/// A lag is scored on the autocorrelation summed over its two neighbours, so a
/// beat period falling between two frames is not split in half.
/// Returns 0.0 when the envelope carries no periodicity.
pub fn estimate_tempo(envelope: &[f32], frame_rate: f64) -> f64 {
    let n = envelope.len();
    if n < 3 || frame_rate <= 0.0 {
        return 0.0;
    }

    let max_lag = ((AC_WINDOW_SECONDS * frame_rate) as usize).min(n - 2);
    let autocorr: Vec<f64> = (0..=max_lag + 1)
        .map(|lag| {
            envelope[..n - lag]
                .iter()
                .zip(&envelope[lag..])
                .map(|(a, b)| *a as f64 * *b as f64)
                .sum()
        })
        .collect();
    let energy = autocorr[0];
    if energy <= 0.0 {
        return 0.0;
    }

    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize + 1).max(2);
    let mut best: Option<(usize, f64)> = None;
    for lag in min_lag..=max_lag {
        let neighbourhood = autocorr[lag - 1] + autocorr[lag] + autocorr[lag + 1];
        let normalized = (neighbourhood / energy).max(0.0);
        let bpm = 60.0 * frame_rate / lag as f64;
        let octaves = (bpm.log2() - PRIOR_BPM.log2()) / PRIOR_STD_OCTAVES;
        let score = (1e6 * normalized).ln_1p() - 0.5 * octaves * octaves;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    let Some((lag, _)) = best else {
        return 0.0;
    };
    if autocorr[lag] <= 0.0 {
        return 0.0;
    }

    let (y0, y1, y2) = (autocorr[lag - 1], autocorr[lag], autocorr[lag + 1]);
    let curvature = y0 - 2.0 * y1 + y2;
    let offset = if curvature < 0.0 {
        (0.5 * (y0 - y2) / curvature).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    let refined = lag as f64 + offset;
    chaebo_spec::round_f64(60.0 * frame_rate / refined, 2)
}
