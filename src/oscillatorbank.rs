use std::sync::Arc;

use crate::modifiers::{AmpEnvelope, Biquad};
use crate::voices::{Envelope, VoiceDescriptor};

/// One sounding wavetable oscillator.
pub struct OscillatorVoice {
    frequency: f32,
    phase: f32,
    waveform: Arc<[i16]>,
    shape: Arc<Envelope>,
    envelope: AmpEnvelope,
    filter: Biquad,
}

impl OscillatorVoice {
    fn new(descriptor: &VoiceDescriptor, sample_rate: f32) -> Self {
        let mut envelope = AmpEnvelope::new();
        envelope.trigger();
        Self {
            frequency: descriptor.frequency,
            phase: 0.0,
            waveform: descriptor.waveform.clone(),
            shape: descriptor.envelope.clone(),
            envelope,
            filter: Biquad::low_pass(descriptor.filter, sample_rate),
        }
    }

    fn sample(&mut self, sample_rate: f32) -> f32 {
        let len = self.waveform.len();
        if len == 0 {
            return 0.0;
        }
        let position = self.phase * len as f32;
        let index = position as usize % len;
        let next = (index + 1) % len;
        let frac = position.fract();
        let a = self.waveform[index] as f32;
        let b = self.waveform[next] as f32;
        let raw = (a + (b - a) * frac) / i16::MAX as f32;

        self.phase = (self.phase + self.frequency / sample_rate).fract();
        let level = self.envelope.advance(1.0 / sample_rate, &self.shape);
        self.filter.process(raw) * level
    }
}

pub struct OscillatorBank {
    voices: Vec<OscillatorVoice>,
}

impl OscillatorBank {
    pub fn new() -> Self {
        Self { voices: Vec::new() }
    }

    /// Drops every current voice and starts `descriptors` in their place.
    pub fn replace(&mut self, descriptors: &[VoiceDescriptor], sample_rate: f32) {
        self.voices = descriptors
            .iter()
            .map(|descriptor| OscillatorVoice::new(descriptor, sample_rate))
            .collect();
    }

    pub fn release(&mut self) {
        for voice in &mut self.voices {
            voice.envelope.release();
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_silent(&self) -> bool {
        self.voices.iter().all(|voice| voice.envelope.is_idle())
    }

    pub fn fill_sample(&mut self, sample_rate: f32, out: &mut [f32]) {
        for (index, voice) in self.voices.iter_mut().enumerate() {
            if let Some(slot) = out.get_mut(index) {
                *slot = voice.sample(sample_rate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::voices::VoiceManager;
    use crate::voices::tests::RecordingBackend;

    const RATE: f32 = 28_000.0;

    fn ensemble(note: u8) -> Vec<VoiceDescriptor> {
        let mut manager =
            VoiceManager::new(RecordingBackend::default(), Config::default().voices);
        manager.note_on(note).unwrap();
        manager.voices().to_vec()
    }

    #[test]
    fn replace_swaps_in_the_new_ensemble() {
        let mut bank = OscillatorBank::new();
        bank.replace(&ensemble(60), RATE);
        assert_eq!(bank.len(), 3);
        bank.replace(&ensemble(67)[..2], RATE);
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn pressed_voices_make_sound() {
        let mut bank = OscillatorBank::new();
        bank.replace(&ensemble(57), RATE);
        let mut out = [0.0; 3];
        let mut energy = 0.0;
        for _ in 0..2_000 {
            bank.fill_sample(RATE, &mut out);
            energy += out.iter().map(|s| s * s).sum::<f32>();
        }
        assert!(energy > 1.0);
        assert!(!bank.is_silent());
    }

    #[test]
    fn released_voices_fall_silent() {
        let mut bank = OscillatorBank::new();
        bank.replace(&ensemble(57), RATE);
        let mut out = [0.0; 3];
        bank.fill_sample(RATE, &mut out);
        bank.release();
        for _ in 0..(RATE as usize) {
            bank.fill_sample(RATE, &mut out);
        }
        assert!(bank.is_silent());
        assert!(out.iter().all(|sample| sample.abs() < 1e-3));
    }

    #[test]
    fn empty_bank_is_silent() {
        let mut bank = OscillatorBank::new();
        let mut out = [0.0; 3];
        bank.fill_sample(RATE, &mut out);
        assert!(bank.is_silent());
        assert_eq!(out, [0.0; 3]);
    }
}
