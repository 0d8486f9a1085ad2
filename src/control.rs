use std::io::Write;
use std::time::Instant;

use anyhow::Result;

use crate::chase::{ChaseLights, PixelStrip};
use crate::config::StartupSettings;
use crate::display::Display;
use crate::knobs::{KnobMapping, SmoothedInput};
use crate::voices::{AudioBackend, VoiceManager};

pub const PATTERN_BUTTON: usize = 0;
pub const TRANSPOSE_BUTTON: usize = 1;
const TRANSPOSE_CYCLE: u32 = 3;

/// Edge-triggered note callbacks, invoked by the sequencer.
pub trait NoteHandler {
    fn note_on(&mut self, note: u8) -> Result<()>;
    fn note_off(&mut self, note: u8) -> Result<()>;
}

/// What the control loop needs from the arpeggio sequencer.
pub trait Sequencer {
    fn set_root_note(&mut self, note: u8);
    fn set_bpm(&mut self, bpm: f32, steps_per_beat: Option<u32>);
    fn set_transpose(&mut self, distance: Option<i32>, steps: Option<u32>);
    fn transpose_steps(&self) -> u32;
    fn select_pattern(&mut self, name: &str) -> bool;
    fn next_pattern(&mut self);
    fn pattern_name(&self) -> &str;
    fn update(&mut self, now: Instant, handler: &mut dyn NoteHandler) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    pub key_number: usize,
    pub pressed: bool,
}

/// One tick's worth of sampled input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickInput {
    pub button: Option<ButtonEvent>,
    pub knob_a: u16,
    pub knob_b: u16,
}

/// Everything that reacts to a played note.
pub struct Performer<A, S, L> {
    pub voices: VoiceManager<A>,
    pub lights: ChaseLights<S, L>,
}

impl<A: AudioBackend, S: PixelStrip, L: PixelStrip> NoteHandler for Performer<A, S, L> {
    fn note_on(&mut self, note: u8) -> Result<()> {
        log::trace!("note on {note}");
        self.lights.note_on(note)?;
        self.voices.note_on(note)
    }

    fn note_off(&mut self, note: u8) -> Result<()> {
        log::trace!("note off {note}");
        self.lights.note_off(note)?;
        self.voices.note_off(note)
    }
}

pub struct ControlCore<W: Write, A, S, L> {
    display: Display<W>,
    performer: Performer<A, S, L>,
    knob_a: SmoothedInput,
    knob_b: SmoothedInput,
    mapping: KnobMapping,
}

impl<W, A, S, L> ControlCore<W, A, S, L>
where
    W: Write,
    A: AudioBackend,
    S: PixelStrip,
    L: PixelStrip,
{
    pub fn new(
        display: Display<W>,
        performer: Performer<A, S, L>,
        mapping: KnobMapping,
        smoothing: f32,
        initial: (u16, u16),
    ) -> Self {
        Self {
            display,
            performer,
            knob_a: SmoothedInput::new(initial.0, smoothing),
            knob_b: SmoothedInput::new(initial.1, smoothing),
            mapping,
        }
    }

    /// Puts the sequencer and the display into the power-on state.
    pub fn start(&mut self, sequencer: &mut impl Sequencer, startup: &StartupSettings) {
        sequencer.set_root_note(startup.root_note);
        if !sequencer.select_pattern(&startup.pattern) {
            log::warn!(
                "unknown pattern {:?}, keeping {:?}",
                startup.pattern,
                sequencer.pattern_name()
            );
        }
        let name = sequencer.pattern_name().to_string();
        self.display.log(format!("arp:{name}"));
        self.display.set_note(startup.root_note);
        self.display.set_arpeggio(&name);

        sequencer.set_bpm(startup.bpm, Some(startup.steps_per_beat));
        sequencer.set_transpose(Some(startup.transpose_distance), Some(0));
        self.display.set_tempo(startup.bpm as u32);
        self.display.set_transpose(0);
        log::info!(
            "started: root {} pattern {name} at {} bpm",
            startup.root_note,
            startup.bpm
        );
    }

    pub fn tick(
        &mut self,
        input: TickInput,
        sequencer: &mut impl Sequencer,
        now: Instant,
    ) -> Result<()> {
        if let Some(event) = input.button {
            self.handle_button(event, sequencer);
        }

        let knob_a = self.knob_a.update(input.knob_a);
        let knob_b = self.knob_b.update(input.knob_b);

        let note = self.mapping.note(knob_a);
        sequencer.set_root_note(note);
        self.display.knob1_change(knob_a);
        self.display.set_note(note);

        let bpm = self.mapping.tempo(knob_b);
        sequencer.set_bpm(bpm, None);
        self.display.knob2_change(knob_b);
        self.display.set_tempo(bpm as u32);

        sequencer.update(now, &mut self.performer)?;
        self.display.refresh(now)?;
        Ok(())
    }

    fn handle_button(&mut self, event: ButtonEvent, sequencer: &mut impl Sequencer) {
        match event.key_number {
            PATTERN_BUTTON => self.display.button1_change(event.pressed),
            TRANSPOSE_BUTTON => self.display.button2_change(event.pressed),
            other => {
                log::debug!("ignoring button {other}");
                return;
            }
        }
        if !event.pressed {
            return;
        }

        if event.key_number == PATTERN_BUTTON {
            sequencer.next_pattern();
            let name = sequencer.pattern_name().to_string();
            log::info!("pattern {name}");
            self.display.log(format!("arp:{name}"));
            self.display.set_arpeggio(&name);
        } else {
            let steps = (sequencer.transpose_steps() + 1) % TRANSPOSE_CYCLE;
            sequencer.set_transpose(None, Some(steps));
            log::info!("transpose steps {steps}");
            self.display.log(format!("steps {steps}"));
            self.display.set_transpose(steps as i32);
        }
    }

    /// Releases whatever is sounding and darkens the indicator.
    pub fn silence(&mut self) -> Result<()> {
        self.performer.note_off(0)
    }

    #[cfg(test)]
    pub fn display(&self) -> &Display<W> {
        &self.display
    }

    #[cfg(test)]
    pub fn performer(&self) -> &Performer<A, S, L> {
        &self.performer
    }

    pub fn performer_mut(&mut self) -> &mut Performer<A, S, L> {
        &mut self.performer
    }
}
