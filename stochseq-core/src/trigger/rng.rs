//! Seeded hash used for every random draw in the trigger engine.
//!
//! `draw(n) = frac(sin(n + seed) * 10000)`. This is a stateless hash rather
//! than a stream: the same `(n, seed)` always yields the same value, so the
//! order in which instruments are evaluated never changes a draw.

/// Which decision a draw feeds. Each stream offsets the step so the
/// decisions for one step stay decorrelated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Trigger,
    Accent,
    Ghost,
    Humanize,
    Velocity,
    DefaultCurve,
}

impl Stream {
    pub fn offset(self) -> f64 {
        match self {
            Stream::Trigger => 0.0,
            Stream::Accent => 1000.0,
            Stream::Ghost => 2000.0,
            Stream::Humanize => 3000.0,
            Stream::Velocity => 4000.0,
            Stream::DefaultCurve => 5000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeededRandom {
    seed: f64,
}

impl SeededRandom {
    pub fn new(seed: f64) -> Self {
        Self {
            seed: if seed.is_finite() { seed } else { 0.0 },
        }
    }

    pub fn seed(&self) -> f64 {
        self.seed
    }

    /// Value in `0.0..1.0` for index `n` on `stream`.
    pub fn draw(&self, stream: Stream, n: u32) -> f64 {
        let x = (n as f64 + stream.offset() + self.seed).sin() * 10000.0;
        x - x.floor()
    }
}

/// Default probability curve: a gentle sine wave with seeded variation.
pub fn default_curve(step_count: usize, rng: &SeededRandom) -> Vec<f32> {
    let len = step_count.max(1);
    (0..len)
        .map(|i| {
            let wave = (i as f64 / len as f64 * std::f64::consts::TAU).sin() * 0.2;
            let variation = (rng.draw(Stream::DefaultCurve, i as u32) - 0.5) * 0.1;
            (0.5 + wave + variation).clamp(0.0, 1.0) as f32
        })
        .collect()
}
