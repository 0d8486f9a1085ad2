pub struct Mixer {
    pub master: f32,
}

impl Mixer {
    pub fn new(master: f32) -> Self {
        Self {
            master: master.clamp(0.0, 1.0),
        }
    }

    /// Averages the voices so a full ensemble has the headroom of one.
    pub fn mix(&self, voice_samples: &[f32]) -> f32 {
        if voice_samples.is_empty() {
            return 0.0;
        }
        let sum = voice_samples.iter().sum::<f32>();
        sum / voice_samples.len() as f32 * self.master
    }
}
