use std::io::Write;

use anyhow::Result;
use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor},
};

use crate::chase::{PixelStrip, Rgb};

const CELL: &str = "  ";

/// Draws a pixel strip as a row of 24-bit background-colored cells.
pub struct TerminalStrip<W: Write> {
    out: W,
    row: u16,
    label: &'static str,
    pixels: Vec<Rgb>,
}

impl<W: Write> TerminalStrip<W> {
    pub fn new(out: W, row: u16, label: &'static str, len: usize) -> Self {
        Self {
            out,
            row,
            label,
            pixels: vec![Rgb::BLACK; len],
        }
    }

    #[cfg(test)]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }
}

impl<W: Write> PixelStrip for TerminalStrip<W> {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        if let Some(slot) = self.pixels.get_mut(index) {
            *slot = color;
        }
    }

    fn show(&mut self) -> Result<()> {
        queue!(
            self.out,
            cursor::SavePosition,
            cursor::MoveTo(0, self.row),
            Print(self.label),
            Print(' ')
        )?;
        for &Rgb { r, g, b } in &self.pixels {
            queue!(
                self.out,
                SetBackgroundColor(Color::Rgb { r, g, b }),
                Print(CELL)
            )?;
        }
        queue!(self.out, ResetColor, cursor::RestorePosition)?;
        self.out.flush()?;
        Ok(())
    }
}
