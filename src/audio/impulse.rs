//! Generated sample buffers: white noise and reverb impulse responses

use rand::Rng;
use std::f32::consts::PI;

use super::graph::SampleBuffer;

/// Early reflections occupy the first 50 ms of an impulse
const EARLY_REFLECTION_SECS: f32 = 0.05;
const EARLY_REFLECTION_LEVEL: f32 = 0.5;
/// Impulse tail is darkened above this frequency
const IMPULSE_CUTOFF_HZ: f32 = 6000.0;

/// Second-order low-pass (RBJ cookbook, direct form I)
#[derive(Debug, Clone, Copy)]
struct BiquadLowpass {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadLowpass {
    fn new(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        // Keep the cutoff below Nyquist for low sample rates
        let cutoff = cutoff.min(sample_rate * 0.45);
        let w0 = 2.0 * PI * (cutoff / sample_rate);
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q.max(0.1));
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_w0) * 0.5 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) * 0.5 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

fn sample_count(sample_rate: f32, duration: f64) -> usize {
    (sample_rate as f64 * duration).max(0.0) as usize
}

/// Mono white noise in [-1, 1)
pub fn white_noise<R: Rng + ?Sized>(rng: &mut R, sample_rate: f32, duration: f64) -> SampleBuffer {
    let len = sample_count(sample_rate, duration);
    let samples = (0..len).map(|_| rng.random_range(-1.0f32..1.0)).collect();
    SampleBuffer {
        sample_rate,
        channels: vec![samples],
    }
}

/// Stereo reverb impulse.
///
/// Each channel is white noise under a `(1 - t)^(decay * 3)` envelope with
/// a linearly fading burst of extra noise over the first 50 ms, then
/// low-passed so the tail sounds like a room rather than hiss.
pub fn reverb_impulse<R: Rng + ?Sized>(
    rng: &mut R,
    sample_rate: f32,
    duration: f64,
    decay: f32,
) -> SampleBuffer {
    let len = sample_count(sample_rate, duration);
    let early = (sample_rate * EARLY_REFLECTION_SECS) as usize;

    let channels = (0..2)
        .map(|_| {
            let mut filter = BiquadLowpass::new(sample_rate, IMPULSE_CUTOFF_HZ, 0.707);
            (0..len)
                .map(|i| {
                    let t = i as f32 / len as f32;
                    let mut s = rng.random_range(-1.0f32..1.0) * (1.0 - t).powf(decay * 3.0);
                    if i < early {
                        let reflection = 1.0 - i as f32 / early as f32;
                        s += rng.random_range(-1.0f32..1.0) * reflection * EARLY_REFLECTION_LEVEL;
                    }
                    filter.process(s)
                })
                .collect()
        })
        .collect();

    SampleBuffer {
        sample_rate,
        channels,
    }
}
