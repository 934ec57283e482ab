//! Short-time Fourier transform and its inverse.
//!
//! Frames are centered: the signal is zero-padded by `n_fft / 2` on both
//! sides, so frame `t` is centered on sample `t * hop_length`.

use std::f32::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

/// Periodic Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Complex spectrogram, one row of `n_fft / 2 + 1` bins per frame.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Frames in time order.
    pub frames: Vec<Vec<Complex<f32>>>,
    /// FFT size used to compute the frames.
    pub n_fft: usize,
    /// Hop between frames.
    pub hop_length: usize,
}

impl Spectrogram {
    /// Number of frequency bins per frame.
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames.
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Magnitude of every bin.
    pub fn magnitudes(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }
}

/// Computes the centered STFT of `signal` with a Hann window.
pub fn stft(signal: &[f32], n_fft: usize, hop_length: usize) -> Spectrogram {
    let pad = n_fft / 2;
    let n_bins = n_fft / 2 + 1;
    let n_frames = if signal.is_empty() {
        0
    } else {
        1 + signal.len() / hop_length
    };

    let mut padded = vec![0.0f32; signal.len() + 2 * pad];
    padded[pad..pad + signal.len()].copy_from_slice(signal);

    let window = hann_window(n_fft);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut frames = Vec::with_capacity(n_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
    for t in 0..n_frames {
        let start = t * hop_length;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = padded.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..n_bins].to_vec());
    }

    Spectrogram {
        frames,
        n_fft,
        hop_length,
    }
}

/// Inverts a centered STFT by windowed overlap-add.
///
/// The output is trimmed or zero-padded to exactly `length` samples.
pub fn istft(
    frames: &[Vec<Complex<f32>>],
    n_fft: usize,
    hop_length: usize,
    length: usize,
) -> Vec<f32> {
    if frames.is_empty() {
        return vec![0.0; length];
    }

    let pad = n_fft / 2;
    let half = n_fft / 2;
    let total = n_fft + hop_length * (frames.len() - 1);
    let mut output = vec![0.0f32; total];
    let mut norm = vec![0.0f32; total];

    let window = hann_window(n_fft);
    let mut planner = FftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(n_fft);
    let scale = 1.0 / n_fft as f32;

    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
    for (t, frame) in frames.iter().enumerate() {
        // Rebuild the Hermitian-symmetric full spectrum.
        for k in 0..n_fft {
            buffer[k] = if k <= half {
                frame.get(k).copied().unwrap_or_default()
            } else {
                frame.get(n_fft - k).copied().unwrap_or_default().conj()
            };
        }
        ifft.process(&mut buffer);

        let start = t * hop_length;
        for i in 0..n_fft {
            output[start + i] += buffer[i].re * scale * window[i];
            norm[start + i] += window[i] * window[i];
        }
    }

    for (sample, weight) in output.iter_mut().zip(&norm) {
        if *weight > 1e-8 {
            *sample /= *weight;
        }
    }

    let mut trimmed: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
    trimmed.resize(length, 0.0);
    trimmed
}
