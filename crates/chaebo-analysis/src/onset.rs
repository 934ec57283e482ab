//! Onset strength, peak picking and backtracking.

/// Dynamic range kept by the log-power spectrogram, in dB.
const TOP_DB: f32 = 80.0;

/// Peak picking windows, in frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPickParams {
    /// Frames before `n` searched for a larger value.
    pub pre_max: usize,
    /// Frames after `n` searched for a larger value (exclusive bound).
    pub post_max: usize,
    /// Frames before `n` averaged for the threshold.
    pub pre_avg: usize,
    /// Frames after `n` averaged for the threshold (exclusive bound).
    pub post_avg: usize,
    /// Required rise above the local mean.
    pub delta: f32,
    /// Minimum distance between consecutive peaks, in frames.
    pub wait: usize,
}

impl PeakPickParams {
    /// Derives the windows from the frame rate, as 30 ms / 100 ms spans.
    pub fn for_frame_rate(frame_rate: f64, delta: f32) -> Self {
        let frames = |seconds: f64| (seconds * frame_rate).floor() as usize;
        Self {
            pre_max: frames(0.03),
            post_max: frames(0.0) + 1,
            pre_avg: frames(0.10),
            post_avg: frames(0.10) + 1,
            delta,
            wait: frames(0.03),
        }
    }
}

/// Spectral-flux onset strength of a magnitude spectrogram.
///
/// Magnitudes are converted to dB (clamped to `TOP_DB` below the loudest
/// bin), differenced frame to frame, half-wave rectified and averaged over
/// bins. The envelope is shifted so peaks line up with centered frames.
pub fn onset_strength(magnitudes: &[Vec<f32>], n_fft: usize, hop_length: usize) -> Vec<f32> {
    let n_frames = magnitudes.len();
    if n_frames == 0 {
        return Vec::new();
    }

    let mut db: Vec<Vec<f32>> = magnitudes
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|m| 10.0 * (m * m).max(1e-10).log10())
                .collect()
        })
        .collect();
    let peak = db
        .iter()
        .flat_map(|frame| frame.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    for value in db.iter_mut().flat_map(|frame| frame.iter_mut()) {
        *value = value.max(floor);
    }

    let flux = db.windows(2).map(|pair| {
        let (prev, cur) = (&pair[0], &pair[1]);
        let rise: f32 = cur
            .iter()
            .zip(prev)
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        rise / cur.len().max(1) as f32
    });

    let shift = 1 + n_fft / (2 * hop_length);
    let mut envelope = vec![0.0f32; shift.min(n_frames)];
    envelope.extend(flux);
    envelope.truncate(n_frames);
    envelope.resize(n_frames, 0.0);
    envelope
}

/// Rescales an envelope to [0, 1]. Returns false if it is flat.
pub fn normalize_envelope(envelope: &mut [f32]) -> bool {
    let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    let max = envelope.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        return false;
    }
    for value in envelope.iter_mut() {
        *value = (*value - min) / range;
    }
    true
}

/// Picks peaks from a normalized envelope.
pub fn peak_pick(envelope: &[f32], params: &PeakPickParams) -> Vec<usize> {
    let n = envelope.len();
    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;

    for i in 0..n {
        let max_lo = i.saturating_sub(params.pre_max);
        let max_hi = (i + params.post_max).min(n);
        let local_max = envelope[max_lo..max_hi]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        if envelope[i] < local_max {
            continue;
        }

        let avg_lo = i.saturating_sub(params.pre_avg);
        let avg_hi = (i + params.post_avg).min(n);
        let window = &envelope[avg_lo..avg_hi];
        let mean = window.iter().sum::<f32>() / window.len() as f32;
        if envelope[i] < mean + params.delta {
            continue;
        }

        if let Some(prev) = last {
            if i <= prev + params.wait {
                continue;
            }
        }
        peaks.push(i);
        last = Some(i);
    }
    peaks
}

/// Moves each onset back to the nearest preceding local minimum of `envelope`.
///
/// The result is sorted and free of duplicates.
pub fn backtrack(onsets: &[usize], envelope: &[f32]) -> Vec<usize> {
    let mut minima = vec![0usize];
    for i in 1..envelope.len().saturating_sub(1) {
        if envelope[i] <= envelope[i - 1] && envelope[i] < envelope[i + 1] {
            minima.push(i);
        }
    }

    let mut frames: Vec<usize> = onsets
        .iter()
        .map(|&onset| {
            let idx = minima.partition_point(|&m| m <= onset);
            minima[idx.saturating_sub(1)]
        })
        .collect();
    frames.sort_unstable();
    frames.dedup();
    frames
}

/// Detects onset frames from a raw onset envelope.
pub fn detect_onsets(envelope: &[f32], params: &PeakPickParams) -> Vec<usize> {
    let mut normalized = envelope.to_vec();
    if !normalize_envelope(&mut normalized) {
        return Vec::new();
    }
    let peaks = peak_pick(&normalized, params);
    backtrack(&peaks, &normalized)
}
