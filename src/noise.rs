use std::time::{SystemTime, UNIX_EPOCH};

/// Low-level noise for simulated analog reads, so the knob filter sees the
/// kind of wobble a real ADC produces.
#[derive(Clone)]
pub struct AdcJitter {
    seed: u64,
    amplitude: f32,
}

impl AdcJitter {
    pub fn new(amplitude: f32) -> Self {
        Self::with_seed(random_seed(), amplitude)
    }

    pub fn with_seed(seed: u64, amplitude: f32) -> Self {
        Self {
            seed: seed.max(1),
            amplitude,
        }
    }

    /// `value` plus up to `amplitude` counts of noise, kept in range.
    pub fn apply(&mut self, value: u16) -> u16 {
        let noisy = value as f32 + self.white() * self.amplitude;
        noisy.round().clamp(0.0, u16::MAX as f32) as u16
    }

    fn white(&mut self) -> f32 {
        // LCG: Numerical Recipes constants.
        self.seed = self.seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bits = self.seed >> 11;
        let normalized = (bits as f64) / ((1u64 << 53) as f64);
        (normalized as f32) * 2.0 - 1.0
    }
}

fn random_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_nanos() as u64)
        .unwrap_or(0x5EED)
}
