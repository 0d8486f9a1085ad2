use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::knobs::KnobMapping;
use crate::voices::EnsembleSettings;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub voices: EnsembleSettings,
    pub knobs: KnobConfig,
    pub lights: LightConfig,
    pub display: DisplayConfig,
    pub startup: StartupSettings,
    pub audio: AudioConfig,
    pub host: HostConfig,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct KnobConfig {
    pub smoothing: f32,
    pub note_range: (f32, f32),
    pub tempo_range: (f32, f32),
}

impl KnobConfig {
    pub fn mapping(&self) -> KnobMapping {
        KnobMapping {
            note_range: self.note_range,
            tempo_range: self.tempo_range,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct LightConfig {
    pub pixel_count: usize,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct DisplayConfig {
    pub refresh_interval_ms: u64,
}

impl DisplayConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StartupSettings {
    pub root_note: u8,
    pub pattern: String,
    pub bpm: f32,
    pub steps_per_beat: u32,
    pub transpose_distance: i32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct AudioConfig {
    pub master_level: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct HostConfig {
    pub tick_interval_ms: u64,
}

impl HostConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    /// Built-in defaults overlaid with `path`, or with the user config file
    /// when no path is given. An explicit path must exist and parse; a
    /// broken user file is skipped with a warning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut table = default_table()?;
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                let user: toml::Table = toml::from_str(&contents)
                    .with_context(|| format!("parsing config {}", path.display()))?;
                merge(&mut table, user);
            }
            None => {
                if let Some(path) = user_config_path().filter(|path| path.exists()) {
                    match read_table(&path) {
                        Ok(user) => merge(&mut table, user),
                        Err(e) => {
                            log::warn!(target: "config", "ignoring config {}: {e:#}", path.display())
                        }
                    }
                }
            }
        }
        Self::from_table(table)
    }

    #[cfg(test)]
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut table = default_table()?;
        merge(&mut table, toml::from_str(contents)?);
        Self::from_table(table)
    }

    fn from_table(table: toml::Table) -> Result<Self> {
        let config: Config = toml::Value::Table(table)
            .try_into()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.voices.count == 0 {
            bail!("voices.count must be at least 1");
        }
        if !(0.0..1.0).contains(&self.knobs.smoothing) {
            bail!("knobs.smoothing must be in [0, 1), got {}", self.knobs.smoothing);
        }
        let (note_lo, note_hi) = self.knobs.note_range;
        if !(0.0..=127.0).contains(&note_lo) || !(0.0..=127.0).contains(&note_hi) {
            bail!("knobs.note_range must lie within 0..=127");
        }
        if note_lo >= note_hi {
            bail!("knobs.note_range is empty: {note_lo}..{note_hi}");
        }
        let (tempo_lo, tempo_hi) = self.knobs.tempo_range;
        if tempo_lo <= 0.0 || tempo_lo >= tempo_hi {
            bail!("knobs.tempo_range must be positive and non-empty: {tempo_lo}..{tempo_hi}");
        }
        if self.lights.pixel_count == 0 {
            bail!("lights.pixel_count must be at least 1");
        }
        if self.startup.steps_per_beat == 0 || self.startup.bpm <= 0.0 {
            bail!("startup tempo must be positive");
        }
        if self.host.tick_interval_ms == 0 {
            bail!("host.tick_interval_ms must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self::from_toml("").expect("built-in config.toml is valid")
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("arpsynth").join("config.toml"))
}

fn default_table() -> Result<toml::Table> {
    toml::from_str(DEFAULT_CONFIG).context("parsing built-in config.toml")
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge(existing, nested)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
