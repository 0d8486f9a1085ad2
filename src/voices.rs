use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;

pub const WAVE_LEN: usize = 512;
// Full scale is +/-32767; stop short of it for headroom.
pub const WAVE_PEAK: i16 = 30_000;

const A4_NOTE: f32 = 69.0;
const A4_FREQ: f32 = 440.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub attack_time: f32,
    pub attack_level: f32,
    pub sustain_level: f32,
    pub release_time: f32,
}

impl Envelope {
    pub fn organ(release_time: f32) -> Self {
        Self {
            attack_time: 0.0,
            attack_level: 1.0,
            sustain_level: 1.0,
            release_time,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LowPass {
    pub cutoff: f32,
    pub resonance: f32,
}

/// One oscillator of a sounding ensemble, as handed to the audio engine.
#[derive(Clone, Debug)]
pub struct VoiceDescriptor {
    pub frequency: f32,
    pub filter: LowPass,
    pub envelope: Arc<Envelope>,
    pub waveform: Arc<[i16]>,
}

/// The audio engine's side of the hand-off.
///
/// `press` replaces whatever is sounding with `voices` in one step; the
/// engine must never mix members of two ensembles.
pub trait AudioBackend {
    fn press(&mut self, voices: &[VoiceDescriptor]) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct EnsembleSettings {
    pub count: usize,
    pub detune: f32,
    pub filter_tracking: f32,
    pub resonance: f32,
    pub release_time: f32,
}

pub struct VoiceManager<A> {
    backend: A,
    settings: EnsembleSettings,
    envelope: Arc<Envelope>,
    waveform: Arc<[i16]>,
    voices: Vec<VoiceDescriptor>,
}

impl<A: AudioBackend> VoiceManager<A> {
    pub fn new(backend: A, settings: EnsembleSettings) -> Self {
        Self {
            backend,
            settings,
            envelope: Arc::new(Envelope::organ(settings.release_time)),
            waveform: saw_wave(),
            voices: Vec::with_capacity(settings.count),
        }
    }

    pub fn note_on(&mut self, note: u8) -> Result<()> {
        let base = midi_to_hz(note);
        let filter = LowPass {
            cutoff: base * self.settings.filter_tracking,
            resonance: self.settings.resonance,
        };
        self.voices = (0..self.settings.count)
            .map(|index| VoiceDescriptor {
                frequency: base * (1.0 + index as f32 * self.settings.detune),
                filter,
                envelope: self.envelope.clone(),
                waveform: self.waveform.clone(),
            })
            .collect();
        self.backend.press(&self.voices)
    }

    /// Releases the current ensemble whichever note is named.
    pub fn note_off(&mut self, _note: u8) -> Result<()> {
        self.backend.release()
    }

    #[cfg(test)]
    pub fn voices(&self) -> &[VoiceDescriptor] {
        &self.voices
    }

    #[cfg(test)]
    pub fn backend(&self) -> &A {
        &self.backend
    }
}

pub fn midi_to_hz(note: u8) -> f32 {
    A4_FREQ * 2.0f32.powf((note as f32 - A4_NOTE) / 12.0)
}

/// Downward ramp from `+WAVE_PEAK` to `-WAVE_PEAK` over `WAVE_LEN` samples.
pub fn saw_wave() -> Arc<[i16]> {
    let span = -2.0 * WAVE_PEAK as f32;
    let last = (WAVE_LEN - 1) as f32;
    (0..WAVE_LEN)
        .map(|index| (WAVE_PEAK as f32 + span * index as f32 / last) as i16)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use approx::assert_abs_diff_eq;

    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub presses: Vec<Vec<VoiceDescriptor>>,
        pub releases: usize,
    }

    impl AudioBackend for RecordingBackend {
        fn press(&mut self, voices: &[VoiceDescriptor]) -> Result<()> {
            self.presses.push(voices.to_vec());
            Ok(())
        }

        fn release(&mut self) -> Result<()> {
            self.releases += 1;
            Ok(())
        }
    }

    fn manager() -> VoiceManager<RecordingBackend> {
        VoiceManager::new(RecordingBackend::default(), Config::default().voices)
    }

    #[test]
    fn a4_ensemble_is_detuned_upward() {
        let mut voices = manager();
        voices.note_on(69).unwrap();
        let set = voices.voices();
        assert_eq!(set.len(), 3);
        assert_abs_diff_eq!(set[0].frequency, 440.0, epsilon = 0.01);
        assert_abs_diff_eq!(set[1].frequency, 443.08, epsilon = 0.01);
        assert_abs_diff_eq!(set[2].frequency, 446.16, epsilon = 0.01);
    }

    #[test]
    fn filter_cutoff_tracks_the_key_and_is_shared() {
        let mut voices = manager();
        voices.note_on(69).unwrap();
        for voice in voices.voices() {
            assert_abs_diff_eq!(voice.filter.cutoff, 3520.0, epsilon = 0.1);
            assert_abs_diff_eq!(voice.filter.resonance, 1.5);
        }
    }

    #[test]
    fn each_note_on_replaces_the_whole_ensemble() {
        let mut voices = manager();
        voices.note_on(60).unwrap();
        voices.note_on(67).unwrap();

        let presses = &voices.backend().presses;
        assert_eq!(presses.len(), 2);
        let g4 = midi_to_hz(67);
        assert_eq!(presses[1].len(), 3);
        for (index, voice) in presses[1].iter().enumerate() {
            let expected = g4 * (1.0 + index as f32 * 0.007);
            assert_abs_diff_eq!(voice.frequency, expected, epsilon = 0.001);
        }
        assert_eq!(voices.voices().len(), 3);
    }

    #[test]
    fn ensemble_size_does_not_depend_on_note() {
        let mut voices = manager();
        for note in [0, 24, 60, 72, 127] {
            voices.note_on(note).unwrap();
            assert_eq!(voices.voices().len(), 3);
        }
    }

    #[test]
    fn voices_share_one_envelope_and_waveform() {
        let mut voices = manager();
        voices.note_on(48).unwrap();
        let set = voices.voices();
        assert!(Arc::ptr_eq(&set[0].envelope, &set[2].envelope));
        assert!(Arc::ptr_eq(&set[0].waveform, &set[1].waveform));
        assert_eq!(*set[0].envelope, Envelope::organ(0.5));
    }

    #[test]
    fn note_off_releases_regardless_of_note() {
        let mut voices = manager();
        voices.note_on(60).unwrap();
        voices.note_off(61).unwrap();
        assert_eq!(voices.backend().releases, 1);
    }

    #[test]
    fn saw_runs_from_peak_to_negative_peak() {
        let wave = saw_wave();
        assert_eq!(wave.len(), WAVE_LEN);
        assert_eq!(wave[0], WAVE_PEAK);
        assert_eq!(wave[WAVE_LEN - 1], -WAVE_PEAK);
        assert!(wave.windows(2).all(|pair| pair[1] < pair[0]));
    }

    #[test]
    fn midi_to_hz_follows_equal_temperament() {
        assert_abs_diff_eq!(midi_to_hz(57), 220.0, epsilon = 0.001);
        assert_abs_diff_eq!(midi_to_hz(60), 261.626, epsilon = 0.01);
    }
}
