use std::time::{Duration, Instant};

use anyhow::Result;

use crate::control::{NoteHandler, Sequencer};

const PATTERNS: [(&str, &[u8]); 9] = [
    ("major", &[0, 4, 7]),
    ("minor", &[0, 3, 7]),
    ("suspended4th", &[0, 5, 7]),
    ("suspended2nd", &[0, 2, 7]),
    ("dominant7th", &[0, 4, 7, 10]),
    ("minor7th", &[0, 3, 7, 10]),
    ("major7th", &[0, 4, 7, 11]),
    ("fifths", &[0, 7, 12]),
    ("octaves", &[0, 12]),
];

const GATE: f32 = 0.5;
const MAX_NOTE: u8 = 127;

/// A small step arpeggiator: walks a chord pattern upward, repeated
/// `transpose_steps` extra times at `transpose_distance` semitones apart.
pub struct Arpeggiator {
    pattern: usize,
    root_note: u8,
    bpm: f32,
    steps_per_beat: u32,
    transpose_distance: i32,
    transpose_steps: u32,
    position: usize,
    running: bool,
    next_step: Option<Instant>,
    sounding: Option<(u8, Instant)>,
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self {
            pattern: 0,
            root_note: 48,
            bpm: 120.0,
            steps_per_beat: 4,
            transpose_distance: 12,
            transpose_steps: 0,
            position: 0,
            running: false,
            next_step: None,
            sounding: None,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self, handler: &mut dyn NoteHandler) -> Result<()> {
        self.running = false;
        self.next_step = None;
        if let Some((note, _)) = self.sounding.take() {
            handler.note_off(note)?;
        }
        Ok(())
    }

    pub fn step_duration(&self) -> Duration {
        Duration::from_secs_f32(60.0 / (self.bpm.max(1.0) * self.steps_per_beat as f32))
    }

    fn intervals(&self) -> &'static [u8] {
        PATTERNS[self.pattern].1
    }

    fn sequence_len(&self) -> usize {
        self.intervals().len() * (self.transpose_steps as usize + 1)
    }

    fn note_at(&self, position: usize) -> u8 {
        let intervals = self.intervals();
        let repeat = (position / intervals.len()) as i32;
        let note = self.root_note as i32
            + intervals[position % intervals.len()] as i32
            + repeat * self.transpose_distance;
        note.clamp(0, MAX_NOTE as i32) as u8
    }
}

impl Sequencer for Arpeggiator {
    fn set_root_note(&mut self, note: u8) {
        self.root_note = note;
    }

    fn set_bpm(&mut self, bpm: f32, steps_per_beat: Option<u32>) {
        self.bpm = bpm;
        if let Some(steps) = steps_per_beat {
            self.steps_per_beat = steps.max(1);
        }
    }

    fn set_transpose(&mut self, distance: Option<i32>, steps: Option<u32>) {
        if let Some(distance) = distance {
            self.transpose_distance = distance;
        }
        if let Some(steps) = steps {
            self.transpose_steps = steps;
        }
        self.position %= self.sequence_len();
    }

    fn transpose_steps(&self) -> u32 {
        self.transpose_steps
    }

    fn select_pattern(&mut self, name: &str) -> bool {
        match PATTERNS.iter().position(|(pattern, _)| *pattern == name) {
            Some(index) => {
                self.pattern = index;
                self.position = 0;
                true
            }
            None => false,
        }
    }

    fn next_pattern(&mut self) {
        self.pattern = (self.pattern + 1) % PATTERNS.len();
        self.position = 0;
    }

    fn pattern_name(&self) -> &str {
        PATTERNS[self.pattern].0
    }

    fn update(&mut self, now: Instant, handler: &mut dyn NoteHandler) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        if let Some((note, off_at)) = self.sounding {
            if now >= off_at {
                handler.note_off(note)?;
                self.sounding = None;
            }
        }

        let due = *self.next_step.get_or_insert(now);
        if now < due {
            return Ok(());
        }
        if let Some((note, _)) = self.sounding.take() {
            handler.note_off(note)?;
        }

        let step = self.step_duration();
        let note = self.note_at(self.position);
        handler.note_on(note)?;
        self.sounding = Some((note, now + step.mul_f32(GATE)));
        self.position = (self.position + 1) % self.sequence_len();
        // After a stall, restart the grid instead of bursting to catch up.
        self.next_step = Some(if now - due > step {
            now + step
        } else {
            due + step
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(bool, u8)>,
    }

    impl NoteHandler for Recorder {
        fn note_on(&mut self, note: u8) -> Result<()> {
            self.events.push((true, note));
            Ok(())
        }

        fn note_off(&mut self, note: u8) -> Result<()> {
            self.events.push((false, note));
            Ok(())
        }
    }

    fn running(pattern: &str) -> Arpeggiator {
        let mut arp = Arpeggiator::new();
        assert!(arp.select_pattern(pattern));
        arp.set_root_note(60);
        arp.set_bpm(120.0, Some(4));
        arp.start();
        arp
    }

    fn note_ons(recorder: &Recorder) -> Vec<u8> {
        recorder
            .events
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, note)| *note)
            .collect()
    }

    #[test]
    fn steps_walk_the_pattern() {
        let mut arp = running("major");
        let mut recorder = Recorder::default();
        let start = Instant::now();
        let step = arp.step_duration();
        assert_eq!(step, Duration::from_millis(125));

        for index in 0..4u32 {
            arp.update(start + step * index, &mut recorder).unwrap();
        }
        assert_eq!(note_ons(&recorder), [60, 64, 67, 60]);
    }

    #[test]
    fn each_note_is_released_at_half_step() {
        let mut arp = running("minor");
        let mut recorder = Recorder::default();
        let start = Instant::now();
        arp.update(start, &mut recorder).unwrap();
        arp.update(start + Duration::from_millis(70), &mut recorder).unwrap();
        assert_eq!(recorder.events, [(true, 60), (false, 60)]);
    }

    #[test]
    fn transpose_steps_repeat_the_pattern_higher() {
        let mut arp = running("octaves");
        arp.set_transpose(Some(7), Some(1));
        let mut recorder = Recorder::default();
        let start = Instant::now();
        let step = arp.step_duration();
        for index in 0..5u32 {
            arp.update(start + step * index, &mut recorder).unwrap();
        }
        assert_eq!(note_ons(&recorder), [60, 72, 67, 79, 60]);
    }

    #[test]
    fn stopped_arpeggiator_is_silent() {
        let mut arp = Arpeggiator::new();
        let mut recorder = Recorder::default();
        arp.update(Instant::now(), &mut recorder).unwrap();
        assert!(recorder.events.is_empty());
    }

    #[test]
    fn stop_releases_the_sounding_note() {
        let mut arp = running("major");
        let mut recorder = Recorder::default();
        arp.update(Instant::now(), &mut recorder).unwrap();
        arp.stop(&mut recorder).unwrap();
        assert_eq!(recorder.events, [(true, 60), (false, 60)]);
    }

    #[test]
    fn patterns_cycle_and_wrap() {
        let mut arp = Arpeggiator::new();
        let first = arp.pattern_name().to_string();
        for _ in 0..PATTERNS.len() {
            arp.next_pattern();
        }
        assert_eq!(arp.pattern_name(), first);
        assert!(!arp.select_pattern("no-such-pattern"));
    }
}
