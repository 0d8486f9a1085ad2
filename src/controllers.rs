use std::collections::VecDeque;
use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue, style::Print};

use crate::control::{ButtonEvent, PATTERN_BUTTON, TRANSPOSE_BUTTON};
use crate::noise::AdcJitter;

const KNOB_STEP: i32 = 2048;
const KNOB_FINE_STEP: i32 = 256;
const ADC_JITTER_COUNTS: f32 = 48.0;
// Terminals only report presses, so a button lets go on its own.
const BUTTON_HOLD: Duration = Duration::from_millis(150);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelAction {
    Nudge { knob: usize, delta: i32 },
    Button(usize),
    Quit,
}

#[derive(Clone)]
pub struct KeyBinding {
    pub label: &'static str,
    pub keycode: KeyCode,
    pub action: PanelAction,
}

/// Keyboard stand-in for the two knobs and two momentary buttons.
pub struct TerminalPanel {
    bindings: Vec<KeyBinding>,
    knobs: [u16; 2],
    jitter: AdcJitter,
    release_at: [Option<Instant>; 2],
    pending: VecDeque<ButtonEvent>,
    quit: bool,
}

impl TerminalPanel {
    pub fn new(knobs: [u16; 2]) -> Self {
        Self::with_jitter(knobs, AdcJitter::new(ADC_JITTER_COUNTS))
    }

    pub fn with_jitter(knobs: [u16; 2], jitter: AdcJitter) -> Self {
        let nudge = |label, keycode, knob, delta| KeyBinding {
            label,
            keycode,
            action: PanelAction::Nudge { knob, delta },
        };
        let bindings = vec![
            nudge("a", KeyCode::Char('a'), 0, KNOB_STEP),
            nudge("z", KeyCode::Char('z'), 0, -KNOB_STEP),
            nudge("A", KeyCode::Char('A'), 0, KNOB_FINE_STEP),
            nudge("Z", KeyCode::Char('Z'), 0, -KNOB_FINE_STEP),
            nudge("s", KeyCode::Char('s'), 1, KNOB_STEP),
            nudge("x", KeyCode::Char('x'), 1, -KNOB_STEP),
            nudge("S", KeyCode::Char('S'), 1, KNOB_FINE_STEP),
            nudge("X", KeyCode::Char('X'), 1, -KNOB_FINE_STEP),
            KeyBinding {
                label: "1",
                keycode: KeyCode::Char('1'),
                action: PanelAction::Button(PATTERN_BUTTON),
            },
            KeyBinding {
                label: "2",
                keycode: KeyCode::Char('2'),
                action: PanelAction::Button(TRANSPOSE_BUTTON),
            },
            KeyBinding {
                label: "q",
                keycode: KeyCode::Char('q'),
                action: PanelAction::Quit,
            },
            KeyBinding {
                label: "Esc",
                keycode: KeyCode::Esc,
                action: PanelAction::Quit,
            },
        ];
        Self {
            bindings,
            knobs,
            jitter,
            release_at: [None; 2],
            pending: VecDeque::new(),
            quit: false,
        }
    }

    /// Drains pending terminal input and returns at most one button edge.
    pub fn poll(&mut self, now: Instant) -> Result<Option<ButtonEvent>> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.handle_key(key, now);
            }
        }
        Ok(self.next_event(now))
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }
        let Some(action) = self
            .bindings
            .iter()
            .find(|binding| binding.keycode == key.code)
            .map(|binding| binding.action)
        else {
            return;
        };

        match (action, key.kind) {
            (PanelAction::Quit, KeyEventKind::Press) => self.quit = true,
            (PanelAction::Nudge { knob, delta }, KeyEventKind::Press | KeyEventKind::Repeat) => {
                let value = (self.knobs[knob] as i32 + delta).clamp(0, u16::MAX as i32);
                self.knobs[knob] = value as u16;
            }
            (PanelAction::Button(index), KeyEventKind::Press | KeyEventKind::Repeat) => {
                if self.release_at[index].is_none() {
                    self.pending.push_back(ButtonEvent {
                        key_number: index,
                        pressed: true,
                    });
                }
                self.release_at[index] = Some(now + BUTTON_HOLD);
            }
            (PanelAction::Button(index), KeyEventKind::Release) => {
                self.release_at[index] = Some(now);
            }
            _ => {}
        }
    }

    pub fn next_event(&mut self, now: Instant) -> Option<ButtonEvent> {
        for (index, deadline) in self.release_at.iter_mut().enumerate() {
            if deadline.is_some_and(|at| now >= at) {
                *deadline = None;
                self.pending.push_back(ButtonEvent {
                    key_number: index,
                    pressed: false,
                });
            }
        }
        self.pending.pop_front()
    }

    /// Current knob positions as a noisy ADC would report them.
    pub fn read_knobs(&mut self) -> (u16, u16) {
        let a = self.jitter.apply(self.knobs[0]);
        let b = self.jitter.apply(self.knobs[1]);
        (a, b)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn help_line(&self) -> String {
        let keys = |wanted: fn(&PanelAction) -> bool| {
            self.bindings
                .iter()
                .filter(|binding| wanted(&binding.action))
                .map(|binding| binding.label)
                .collect::<Vec<_>>()
                .join("/")
        };
        format!(
            "knob A {}  knob B {}  buttons {}  quit {}",
            keys(|action| matches!(action, PanelAction::Nudge { knob: 0, .. })),
            keys(|action| matches!(action, PanelAction::Nudge { knob: 1, .. })),
            keys(|action| matches!(action, PanelAction::Button(_))),
            keys(|action| matches!(action, PanelAction::Quit)),
        )
    }

    pub fn draw_help(&self, out: &mut impl Write, row: u16) -> Result<()> {
        queue!(
            out,
            cursor::MoveTo(0, row),
            Clear(ClearType::CurrentLine),
            Print(self.help_line())
        )?;
        out.flush()?;
        Ok(())
    }
}
