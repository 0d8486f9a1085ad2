use std::f32::consts::PI;

use crate::voices::{Envelope, LowPass};

const SILENCE: f32 = 0.0001;
const MAX_CUTOFF_RATIO: f32 = 0.45;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EnvStage {
    Idle,
    Attack,
    Sustain,
    Release,
}

/// Per-voice amplitude contour driven by a shared `Envelope` shape.
#[derive(Clone, Debug)]
pub struct AmpEnvelope {
    value: f32,
    stage: EnvStage,
    release_from: f32,
}

impl AmpEnvelope {
    pub fn new() -> Self {
        Self {
            value: 0.0,
            stage: EnvStage::Idle,
            release_from: 0.0,
        }
    }

    pub fn trigger(&mut self) {
        self.stage = EnvStage::Attack;
    }

    pub fn release(&mut self) {
        if !matches!(self.stage, EnvStage::Idle) {
            self.release_from = self.value;
            self.stage = EnvStage::Release;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.stage == EnvStage::Idle
    }

    pub fn advance(&mut self, dt: f32, shape: &Envelope) -> f32 {
        match self.stage {
            EnvStage::Idle => {
                self.value = 0.0;
            }
            EnvStage::Attack => {
                if shape.attack_time <= 0.0 {
                    self.value = shape.attack_level;
                } else {
                    self.value += shape.attack_level * dt / shape.attack_time;
                }
                if self.value >= shape.attack_level {
                    self.value = shape.attack_level;
                    self.stage = EnvStage::Sustain;
                }
            }
            EnvStage::Sustain => {
                self.value = shape.sustain_level;
            }
            EnvStage::Release => {
                if shape.release_time <= 0.0 {
                    self.value = 0.0;
                } else {
                    self.value -= self.release_from * dt / shape.release_time;
                }
                if self.value <= SILENCE {
                    self.value = 0.0;
                    self.stage = EnvStage::Idle;
                }
            }
        }
        self.value.clamp(0.0, 1.0)
    }
}

/// RBJ-cookbook low-pass biquad, transposed direct form II.
#[derive(Clone, Debug)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn low_pass(filter: LowPass, sample_rate: f32) -> Self {
        let cutoff = filter.cutoff.clamp(10.0, sample_rate * MAX_CUTOFF_RATIO);
        let q = filter.resonance.max(0.1);
        let omega = 2.0 * PI * cutoff / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let cos = omega.cos();
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos) / 2.0 / a0,
            b1: (1.0 - cos) / a0,
            b2: (1.0 - cos) / 2.0 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RATE: f32 = 28_000.0;

    #[test]
    fn organ_envelope_opens_at_once_and_holds() {
        let shape = Envelope::organ(0.5);
        let mut env = AmpEnvelope::new();
        env.trigger();
        assert_abs_diff_eq!(env.advance(1.0 / RATE, &shape), 1.0);
        for _ in 0..1000 {
            env.advance(1.0 / RATE, &shape);
        }
        assert_abs_diff_eq!(env.advance(1.0 / RATE, &shape), 1.0);
    }

    #[test]
    fn release_fades_out_over_release_time() {
        let shape = Envelope::organ(0.5);
        let mut env = AmpEnvelope::new();
        env.trigger();
        env.advance(1.0 / RATE, &shape);
        env.release();

        let quarter = (RATE * 0.125) as usize;
        let mut level = 1.0;
        for _ in 0..quarter {
            level = env.advance(1.0 / RATE, &shape);
        }
        assert_abs_diff_eq!(level, 0.75, epsilon = 0.01);

        for _ in 0..(RATE as usize) {
            env.advance(1.0 / RATE, &shape);
        }
        assert!(env.is_idle());
    }

    #[test]
    fn release_before_trigger_stays_idle() {
        let mut env = AmpEnvelope::new();
        env.release();
        assert!(env.is_idle());
    }

    #[test]
    fn low_pass_passes_dc_and_settles() {
        let filter = LowPass {
            cutoff: 2_000.0,
            resonance: 1.5,
        };
        let mut biquad = Biquad::low_pass(filter, RATE);
        let mut out = 0.0;
        for _ in 0..5_000 {
            out = biquad.process(0.5);
        }
        assert_abs_diff_eq!(out, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn low_pass_attenuates_nyquist() {
        let filter = LowPass {
            cutoff: 500.0,
            resonance: 0.707,
        };
        let mut biquad = Biquad::low_pass(filter, RATE);
        let mut peak: f32 = 0.0;
        for index in 0..2_000 {
            let input = if index % 2 == 0 { 1.0 } else { -1.0 };
            let out = biquad.process(input);
            if index > 1_000 {
                peak = peak.max(out.abs());
            }
        }
        assert!(peak < 0.01, "{peak}");
    }

    #[test]
    fn cutoff_above_nyquist_is_clamped() {
        let filter = LowPass {
            cutoff: 100_000.0,
            resonance: 1.5,
        };
        let mut biquad = Biquad::low_pass(filter, RATE);
        for _ in 0..1_000 {
            assert!(biquad.process(1.0).is_finite());
        }
    }
}
