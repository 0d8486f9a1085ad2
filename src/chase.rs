use anyhow::Result;

pub const DEFAULT_PIXEL_COLOR: Rgb = Rgb::new(1, 1, 1);
const HUE_STEP: u8 = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// 256-step hue wheel: red to green to blue and back to red.
pub fn color_wheel(position: u8) -> Rgb {
    let position = position as u16;
    if position < 85 {
        let p = position * 3;
        Rgb::new((255 - p) as u8, p as u8, 0)
    } else if position < 170 {
        let p = (position - 85) * 3;
        Rgb::new(0, (255 - p) as u8, p as u8)
    } else {
        let p = ((position - 170) * 3).min(255);
        Rgb::new(p as u8, 0, (255 - p) as u8)
    }
}

pub fn note_color(note: u8) -> Rgb {
    color_wheel(note % 12 * HUE_STEP)
}

/// An addressable LED strip; writes are buffered until `show`.
pub trait PixelStrip {
    fn len(&self) -> usize;
    fn set_pixel(&mut self, index: usize, color: Rgb);
    fn show(&mut self) -> Result<()>;

    fn fill(&mut self, color: Rgb) -> Result<()> {
        for index in 0..self.len() {
            self.set_pixel(index, color);
        }
        self.show()
    }
}

pub struct ChaseLights<S, L> {
    trail: Box<[Rgb]>,
    strip: S,
    indicator: L,
}

impl<S: PixelStrip, L: PixelStrip> ChaseLights<S, L> {
    pub fn new(strip: S, indicator: L) -> Self {
        let trail = vec![DEFAULT_PIXEL_COLOR; strip.len()].into_boxed_slice();
        Self {
            trail,
            strip,
            indicator,
        }
    }

    pub fn note_on(&mut self, note: u8) -> Result<()> {
        let color = note_color(note);
        self.indicator.fill(color)?;
        self.push(color);
        for (index, color) in self.trail.iter().enumerate() {
            self.strip.set_pixel(index, *color);
        }
        self.strip.show()
    }

    /// Only the indicator goes dark; the trail stays until pushed out.
    pub fn note_off(&mut self, _note: u8) -> Result<()> {
        self.indicator.fill(Rgb::BLACK)
    }

    fn push(&mut self, color: Rgb) {
        if self.trail.is_empty() {
            return;
        }
        self.trail.rotate_right(1);
        self.trail[0] = color;
    }

    #[cfg(test)]
    pub fn trail(&self) -> &[Rgb] {
        &self.trail
    }

    #[cfg(test)]
    pub fn strip(&self) -> &S {
        &self.strip
    }

    #[cfg(test)]
    pub fn indicator(&self) -> &L {
        &self.indicator
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const PIXEL_COUNT: usize = 20;

    pub(crate) struct MemoryStrip {
        pub pixels: Vec<Rgb>,
        pub shown: Vec<Vec<Rgb>>,
    }

    impl MemoryStrip {
        pub fn new(len: usize) -> Self {
            Self {
                pixels: vec![Rgb::BLACK; len],
                shown: Vec::new(),
            }
        }
    }

    impl PixelStrip for MemoryStrip {
        fn len(&self) -> usize {
            self.pixels.len()
        }

        fn set_pixel(&mut self, index: usize, color: Rgb) {
            self.pixels[index] = color;
        }

        fn show(&mut self) -> Result<()> {
            self.shown.push(self.pixels.clone());
            Ok(())
        }
    }

    fn lights() -> ChaseLights<MemoryStrip, MemoryStrip> {
        ChaseLights::new(MemoryStrip::new(PIXEL_COUNT), MemoryStrip::new(1))
    }

    #[test]
    fn wheel_hits_primaries() {
        assert_eq!(color_wheel(0), Rgb::new(255, 0, 0));
        assert_eq!(color_wheel(85), Rgb::new(0, 255, 0));
        assert_eq!(color_wheel(170), Rgb::new(0, 0, 255));
        assert_eq!(color_wheel(255), Rgb::new(255, 0, 0));
    }

    #[test]
    fn note_color_depends_only_on_pitch_class() {
        assert_eq!(note_color(60), note_color(72));
        assert_eq!(note_color(60), Rgb::new(255, 0, 0));
        assert_eq!(note_color(61), color_wheel(20));
        assert_ne!(note_color(60), note_color(61));
    }

    #[test]
    fn first_note_changes_only_the_head() {
        let mut lights = lights();
        lights.note_on(64).unwrap();
        let trail = lights.trail();
        assert_eq!(trail[0], note_color(64));
        assert!(trail[1..].iter().all(|c| *c == DEFAULT_PIXEL_COLOR));
    }

    #[test]
    fn second_note_pushes_the_first_down() {
        let mut lights = lights();
        lights.note_on(60).unwrap();
        lights.note_on(62).unwrap();
        let trail = lights.trail();
        assert_eq!(trail[0], note_color(62));
        assert_eq!(trail[1], note_color(60));
        assert_eq!(trail[2], DEFAULT_PIXEL_COLOR);
    }

    #[test]
    fn trail_length_is_fixed() {
        let mut lights = lights();
        for note in 0..100 {
            lights.note_on(note).unwrap();
        }
        assert_eq!(lights.trail().len(), PIXEL_COUNT);
        assert_eq!(lights.trail()[0], note_color(99));
        assert_eq!(lights.trail()[19], note_color(80));
    }

    #[test]
    fn every_note_on_shows_the_full_strip_once() {
        let mut lights = lights();
        lights.note_on(60).unwrap();
        lights.note_on(67).unwrap();
        let shown = &lights.strip().shown;
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1], lights.trail());
    }

    #[test]
    fn note_off_clears_only_the_indicator() {
        let mut lights = lights();
        lights.note_on(60).unwrap();
        assert_eq!(lights.indicator().pixels[0], note_color(60));

        let before = lights.trail().to_vec();
        lights.note_off(60).unwrap();
        assert_eq!(lights.indicator().pixels[0], Rgb::BLACK);
        assert_eq!(lights.trail(), before.as_slice());
        assert_eq!(lights.strip().shown.len(), 1);
    }
}
