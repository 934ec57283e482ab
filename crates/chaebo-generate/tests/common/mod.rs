//! Shared helpers for generation tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chaebo_generate::{GenerationBackend, GenerationError, GenerationRequest, GenerationResult};
use serde_json::Value;

type Reply = dyn Fn(&[Value]) -> GenerationResult<String> + Send + Sync;

/// Backend answering from a closure over the onsets embedded in the prompt.
pub struct ScriptedBackend {
    reply: Box<Reply>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(reply: impl Fn(&[Value]) -> GenerationResult<String> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always returns `text`.
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fails with a transport error.
    pub fn failing() -> Self {
        Self::new(|_| Err(GenerationError::transport("connection refused")))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &GenerationRequest) -> GenerationResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.reply)(&prompt_onsets(&request.prompt))
    }
}

/// Onset array embedded in a compiled prompt.
pub fn prompt_onsets(prompt: &str) -> Vec<Value> {
    let line = prompt
        .lines()
        .find_map(|l| l.strip_prefix("Onsets : "))
        .expect("prompt has an onsets line");
    serde_json::from_str(line).expect("onsets line is JSON")
}

/// Time of the first onset of a chunk.
pub fn first_time(onsets: &[Value]) -> f64 {
    onsets[0]["time"].as_f64().expect("onset time")
}

pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
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
            writer
                .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Two seconds of decaying 880 Hz bursts, one every half second.
pub fn burst_wav() -> Vec<u8> {
    let sr = 22050u32;
    let background_hz = 5.0 * 22050.0 / 512.0;
    let samples: Vec<f32> = (0..2 * sr as usize)
        .map(|i| {
            let t = i as f64 / sr as f64;
            let mut value = 0.02 * (2.0 * std::f64::consts::PI * background_hz * t).sin();
            for start in [0.25, 0.75, 1.25, 1.75] {
                if t >= start {
                    let dt = t - start;
                    value += 0.6
                        * (-dt / 0.04).exp()
                        * (2.0 * std::f64::consts::PI * 880.0 * dt).sin();
                }
            }
            value as f32
        })
        .collect();
    wav_bytes(&samples, sr)
}
