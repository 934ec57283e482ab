//! Phase-vocoder time stretching.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;

use crate::stft::{istft, stft};

const TWO_PI: f64 = 2.0 * PI;

/// Changes the speed of `signal` by `rate` without changing its pitch.
///
/// A rate below 1.0 slows the signal down; the result has
/// `round(len / rate)` samples.
pub fn time_stretch(signal: &[f32], rate: f64, n_fft: usize, hop_length: usize) -> Vec<f32> {
    if (rate - 1.0).abs() <= f64::EPSILON || signal.is_empty() {
        return signal.to_vec();
    }

    let spec = stft(signal, n_fft, hop_length);
    let n_bins = spec.n_bins();
    let n_frames = spec.n_frames();
    let zero_frame = vec![Complex::new(0.0f32, 0.0); n_bins];

    // Expected phase advance of each bin over one hop.
    let phi_advance: Vec<f64> = (0..n_bins)
        .map(|k| PI * hop_length as f64 * k as f64 / (n_bins - 1) as f64)
        .collect();

    let mut phase_acc: Vec<f64> = spec.frames[0].iter().map(|c| c.arg() as f64).collect();
    let mut stretched = Vec::with_capacity((n_frames as f64 / rate).ceil() as usize);

    let mut step = 0.0f64;
    while step < n_frames as f64 {
        let index = step.floor() as usize;
        let alpha = (step - index as f64) as f32;
        let left = &spec.frames[index];
        let right = spec.frames.get(index + 1).unwrap_or(&zero_frame);

        let frame: Vec<Complex<f32>> = (0..n_bins)
            .map(|k| {
                let magnitude = (1.0 - alpha) * left[k].norm() + alpha * right[k].norm();
                Complex::from_polar(magnitude, phase_acc[k] as f32)
            })
            .collect();
        stretched.push(frame);

        for k in 0..n_bins {
            let mut dphase = right[k].arg() as f64 - left[k].arg() as f64 - phi_advance[k];
            dphase -= TWO_PI * (dphase / TWO_PI).round();
            phase_acc[k] = (phase_acc[k] + phi_advance[k] + dphase).rem_euclid(TWO_PI);
        }

        step += rate;
    }

    let length = (signal.len() as f64 / rate).round() as usize;
    istft(&stretched, n_fft, hop_length, length)
}
