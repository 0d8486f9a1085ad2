//! Status display: the last-known control values plus a scrollback log,
//! repainted only when something changed and never faster than the
//! configured interval.

mod art;
mod frame;

use std::collections::VecDeque;
use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use frame::render_frame;

pub const MAX_LOG_LINES: usize = 20;
const BANNER: [&str; 2] = ["ARPsynth 6.7", "init"];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlState {
    pub knob1: f32,
    pub knob2: f32,
    pub button1_on: bool,
    pub button2_on: bool,
    pub note: u8,
    pub tempo: u32,
    pub arpeggio: String,
    pub transpose: i32,
}

/// Bounded scrollback; the oldest line goes first when full.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn tail(&self, count: usize) -> impl Iterator<Item = &str> {
        self.iter().skip(self.len().saturating_sub(count))
    }
}

pub struct Display<W: Write> {
    out: W,
    state: ControlState,
    log: LogBuffer,
    dirty: bool,
    last_render: Option<Instant>,
    min_interval: Duration,
}

impl<W: Write> Display<W> {
    /// Clears the screen once; later frames only move the cursor home.
    pub fn new(mut out: W, min_interval: Duration) -> Result<Self> {
        out.write_all(art::CLEAR_SCREEN.as_bytes())?;
        out.flush()?;
        let mut log = LogBuffer::new(MAX_LOG_LINES);
        for line in BANNER {
            log.push(line.to_string());
        }
        Ok(Self {
            out,
            state: ControlState::default(),
            log,
            dirty: true,
            last_render: None,
            min_interval,
        })
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
        self.dirty = true;
    }

    pub fn button1_change(&mut self, pressed: bool) {
        self.dirty |= replace(&mut self.state.button1_on, pressed);
    }

    pub fn button2_change(&mut self, pressed: bool) {
        self.dirty |= replace(&mut self.state.button2_on, pressed);
    }

    pub fn knob1_change(&mut self, value: f32) {
        self.dirty |= replace(&mut self.state.knob1, value);
    }

    pub fn knob2_change(&mut self, value: f32) {
        self.dirty |= replace(&mut self.state.knob2, value);
    }

    pub fn set_note(&mut self, note: u8) {
        self.dirty |= replace(&mut self.state.note, note);
    }

    pub fn set_tempo(&mut self, tempo: u32) {
        self.dirty |= replace(&mut self.state.tempo, tempo);
    }

    pub fn set_arpeggio(&mut self, name: &str) {
        if self.state.arpeggio != name {
            self.state.arpeggio = name.to_string();
            self.dirty = true;
        }
    }

    pub fn set_transpose(&mut self, transpose: i32) {
        self.dirty |= replace(&mut self.state.transpose, transpose);
    }

    /// Repaints if dirty and the interval has passed; returns whether it did.
    pub fn refresh(&mut self, now: Instant) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        if let Some(last) = self.last_render {
            if now.saturating_duration_since(last) < self.min_interval {
                return Ok(false);
            }
        }

        let frame = render_frame(&self.state, &self.log);
        self.out.write_all(art::CURSOR_HOME.as_bytes())?;
        for line in frame.lines() {
            // Raw-mode terminals do not translate a bare newline.
            self.out.write_all(line.as_bytes())?;
            self.out.write_all(b"\r\n")?;
        }
        self.out.flush()?;

        self.dirty = false;
        self.last_render = Some(now);
        Ok(true)
    }

    #[cfg(test)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[cfg(test)]
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    #[cfg(test)]
    pub fn log_buffer(&self) -> &LogBuffer {
        &self.log
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }

    #[cfg(test)]
    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
