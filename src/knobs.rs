pub const KNOB_MAX: f32 = 65_535.0;

/// One-pole low-pass over a noisy 16-bit analog channel.
#[derive(Clone, Copy, Debug)]
pub struct SmoothedInput {
    value: f32,
    smoothing: f32,
}

impl SmoothedInput {
    pub fn new(initial: u16, smoothing: f32) -> Self {
        Self {
            value: initial as f32,
            smoothing,
        }
    }

    pub fn update(&mut self, raw: u16) -> f32 {
        self.value = self.value * self.smoothing + raw as f32 * (1.0 - self.smoothing);
        self.value
    }
}

/// Arduino-style `map()`. A zero-width input range is a setup bug.
pub fn map_range(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    assert!(
        in_hi != in_lo,
        "map_range: degenerate input range {in_lo}..{in_hi}"
    );
    out_lo + (value - in_lo) * (out_hi - out_lo) / (in_hi - in_lo)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KnobMapping {
    pub note_range: (f32, f32),
    pub tempo_range: (f32, f32),
}

impl KnobMapping {
    pub fn note(&self, smoothed: f32) -> u8 {
        let (lo, hi) = self.note_range;
        map_range(smoothed, 0.0, KNOB_MAX, lo, hi).clamp(0.0, 127.0) as u8
    }

    pub fn tempo(&self, smoothed: f32) -> f32 {
        let (lo, hi) = self.tempo_range;
        map_range(smoothed, 0.0, KNOB_MAX, lo, hi)
    }
}
