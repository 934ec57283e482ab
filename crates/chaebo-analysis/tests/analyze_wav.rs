//! End-to-end analysis of synthetic WAV files.

use std::io::Cursor;

use chaebo_analysis::{analyze_bytes, AnalysisConfig, AnalysisError};

const BURSTS: [f64; 5] = [0.5, 1.0, 1.5, 2.0, 2.5];

/// Background tone completing exactly 5 periods per 512-sample hop at 22.05 kHz.
const BACKGROUND_HZ: f64 = 5.0 * 22050.0 / 512.0;

fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            let value = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Decaying 880 Hz bursts over a quiet steady tone.
fn burst_track(sample_rate: u32, seconds: f64, bursts: &[f64]) -> Vec<f32> {
    let n = (seconds * sample_rate as f64) as usize;
    let sr = sample_rate as f64;
    (0..n)
        .map(|i| {
            let t = i as f64 / sr;
            let mut value = 0.02 * (2.0 * std::f64::consts::PI * BACKGROUND_HZ * t).sin();
            for &start in bursts {
                if t >= start {
                    let dt = t - start;
                    value += 0.6
                        * (-dt / 0.04).exp()
                        * (2.0 * std::f64::consts::PI * 880.0 * dt).sin();
                }
            }
            value as f32
        })
        .collect()
}

/// Short 1.5 kHz clicks every half second (120 BPM).
fn click_track(sample_rate: u32, seconds: f64) -> Vec<f32> {
    let beats: Vec<f64> = (0..(seconds * 2.0) as usize).map(|k| k as f64 * 0.5).collect();
    let n = (seconds * sample_rate as f64) as usize;
    let sr = sample_rate as f64;
    (0..n)
        .map(|i| {
            let t = i as f64 / sr;
            let mut value = 0.02 * (2.0 * std::f64::consts::PI * BACKGROUND_HZ * t).sin();
            for &start in &beats {
                if t >= start {
                    let dt = t - start;
                    value += 0.7
                        * (-dt / 0.01).exp()
                        * (2.0 * std::f64::consts::PI * 1500.0 * dt).sin();
                }
            }
            value as f32
        })
        .collect()
}

fn nearest_distance(time: f64, targets: &[f64]) -> f64 {
    targets
        .iter()
        .map(|t| (t - time).abs())
        .fold(f64::INFINITY, f64::min)
}

#[test]
fn test_detects_bursts() {
    let bytes = wav_bytes(&burst_track(22050, 3.2, &BURSTS), 22050);
    let summary = analyze_bytes(&bytes, Some("wav"), &AnalysisConfig::default()).unwrap();

    let times: Vec<f64> = summary.onsets.iter().map(|o| o.time).collect();
    for burst in BURSTS {
        assert!(
            nearest_distance(burst, &times) < 0.06,
            "no onset near {}s in {:?}",
            burst,
            times
        );
    }
    for &time in &times {
        assert!(
            nearest_distance(time, &BURSTS) < 0.1,
            "spurious onset at {}s",
            time
        );
    }
}

#[test]
fn test_onsets_are_ordered_and_well_formed() {
    let bytes = wav_bytes(&burst_track(22050, 3.2, &BURSTS), 22050);
    let summary = analyze_bytes(&bytes, Some("wav"), &AnalysisConfig::default()).unwrap();
    assert!(!summary.onsets.is_empty());

    for pair in summary.onsets.windows(2) {
        assert!(pair[0].time <= pair[1].time);
    }
    for onset in &summary.onsets {
        assert!(onset.time >= 0.0);
        assert!((0.0..=1.0).contains(&onset.volume));
        let pitch = onset.pitch.expect("onset without pitch");
        assert!((50..=96).contains(&pitch), "pitch {}", pitch);
        let scaled = onset.time * 10_000.0;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }
}

#[test]
fn test_resamples_higher_rates() {
    let bytes = wav_bytes(&burst_track(44100, 3.2, &BURSTS), 44100);
    let summary = analyze_bytes(&bytes, Some("wav"), &AnalysisConfig::default()).unwrap();
    let times: Vec<f64> = summary.onsets.iter().map(|o| o.time).collect();
    for burst in BURSTS {
        assert!(nearest_distance(burst, &times) < 0.06, "{:?}", times);
    }
}

#[test]
fn test_slow_rate_maps_back_to_original_timeline() {
    let bytes = wav_bytes(&burst_track(22050, 3.2, &BURSTS), 22050);
    let config = AnalysisConfig::default().with_slow_rate(0.5);
    let summary = analyze_bytes(&bytes, Some("wav"), &config).unwrap();

    let times: Vec<f64> = summary.onsets.iter().map(|o| o.time).collect();
    for burst in BURSTS {
        assert!(
            nearest_distance(burst, &times) < 0.1,
            "no onset near {}s in {:?}",
            burst,
            times
        );
    }
    assert!(times.iter().all(|&t| t <= 3.3), "{:?}", times);
    for pair in summary.onsets.windows(2) {
        assert!(pair[0].time <= pair[1].time);
    }
}

#[test]
fn test_max_onsets_keeps_earliest() {
    let bytes = wav_bytes(&burst_track(22050, 3.2, &BURSTS), 22050);
    let all = analyze_bytes(&bytes, Some("wav"), &AnalysisConfig::default()).unwrap();
    let capped = analyze_bytes(
        &bytes,
        Some("wav"),
        &AnalysisConfig::default().with_max_onsets(2),
    )
    .unwrap();

    assert_eq!(capped.onsets.len(), 2);
    assert_eq!(capped.onsets[..], all.onsets[..2]);
    assert_eq!(capped.tempo, all.tempo);
}

#[test]
fn test_click_track_tempo() {
    let bytes = wav_bytes(&click_track(22050, 10.0), 22050);
    let summary = analyze_bytes(&bytes, Some("wav"), &AnalysisConfig::default()).unwrap();
    assert!(
        (summary.tempo - 120.0).abs() < 6.0,
        "tempo {}",
        summary.tempo
    );
}

#[test]
fn test_slow_rate_does_not_change_tempo() {
    let bytes = wav_bytes(&click_track(22050, 10.0), 22050);
    let normal = analyze_bytes(&bytes, Some("wav"), &AnalysisConfig::default()).unwrap();
    let slowed = analyze_bytes(
        &bytes,
        Some("wav"),
        &AnalysisConfig::default().with_slow_rate(0.5),
    )
    .unwrap();

    assert!(normal.tempo > 0.0);
    assert_eq!(slowed.tempo, normal.tempo);
}

#[test]
fn test_silence_has_no_onsets() {
    let bytes = wav_bytes(&vec![0.0; 22050 * 2], 22050);
    let summary = analyze_bytes(&bytes, Some("wav"), &AnalysisConfig::default()).unwrap();
    assert!(summary.onsets.is_empty());
    assert_eq!(summary.tempo, 0.0);
}

#[test]
fn test_garbage_is_a_decode_failure() {
    let err = analyze_bytes(b"definitely not audio", Some("mp3"), &AnalysisConfig::default())
        .unwrap_err();
    assert!(err.is_decode_failure());

    let err = analyze_bytes(&[], None, &AnalysisConfig::default()).unwrap_err();
    assert!(!matches!(err, AnalysisError::InvalidParameter { .. }));
}
