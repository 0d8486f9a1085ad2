mod arp;
mod chase;
mod config;
mod control;
mod controllers;
mod display;
mod knobs;
mod mixer;
mod modifiers;
mod noise;
mod oscillatorbank;
mod output;
mod pixels;
mod voices;

use std::fs::File;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use crossterm::{cursor, execute, terminal};
use tokio::time::MissedTickBehavior;

use arp::Arpeggiator;
use chase::ChaseLights;
use config::Config;
use control::{ControlCore, Performer, TickInput};
use controllers::TerminalPanel;
use display::Display;
use mixer::Mixer;
use output::{AudioEngine, CpalBackend, SynthPipeline};
use pixels::TerminalStrip;
use voices::VoiceManager;

// Zero-based rows below the 18-line status frame.
const HELP_ROW: u16 = 18;
const CHASE_ROW: u16 = 19;
const INDICATOR_ROW: u16 = 20;
const BOTTOM_ROW: u16 = 22;
const KNOB_CENTER: u16 = 32_768;

type Core = ControlCore<Stdout, CpalBackend, TerminalStrip<Stdout>, TerminalStrip<Stdout>>;

struct Args {
    verbose: bool,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        verbose: false,
        config: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => args.verbose = true,
            "-c" | "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            other => bail!("unknown argument {other:?} (expected --verbose, --config <path>)"),
        }
    }
    Ok(args)
}

fn init_logging(verbose: bool) -> Result<()> {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arpsynth")
        .join("arpsynth.log");
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let log_file = File::create(&log_path)
        .or_else(|_| File::create(std::env::temp_dir().join("arpsynth.log")))
        .context("creating log file")?;

    WriteLogger::init(log_level, simplelog::Config::default(), log_file)?;
    log::info!("arpsynth starting (log level: {:?})", log_level);
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args()?;
    init_logging(args.verbose)?;
    let config = Config::load(args.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("tokio runtime")?;

    terminal::enable_raw_mode().context("enabling raw terminal mode")?;
    execute!(io::stdout(), cursor::Hide)?;
    let result = runtime.block_on(run(config));

    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, BOTTOM_ROW), cursor::Show);
    let _ = terminal::disable_raw_mode();
    if let Err(err) = &result {
        log::error!("{err:#}");
    }
    result
}

async fn run(config: Config) -> Result<()> {
    let pipeline = Arc::new(Mutex::new(SynthPipeline::new(Mixer::new(
        config.audio.master_level,
    ))));
    let _audio = match AudioEngine::start(pipeline.clone()) {
        Ok(engine) => Some(engine),
        Err(err) => {
            log::warn!("audio disabled: {err:#}");
            None
        }
    };

    let mut panel = TerminalPanel::new([KNOB_CENTER, KNOB_CENTER]);
    let mut core = build_core(&config, pipeline, panel.read_knobs())?;
    panel.draw_help(&mut io::stdout(), HELP_ROW)?;

    let mut arp = Arpeggiator::new();
    core.start(&mut arp, &config.startup);
    arp.start();

    let mut ticker = tokio::time::interval(config.host.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let now = Instant::now();
        let button = panel.poll(now)?;
        if panel.quit_requested() {
            break;
        }
        let (knob_a, knob_b) = panel.read_knobs();
        let input = TickInput {
            button,
            knob_a,
            knob_b,
        };
        core.tick(input, &mut arp, now)?;
    }

    log::info!("shutting down");
    arp.stop(core.performer_mut())?;
    core.silence()
}

fn build_core(
    config: &Config,
    pipeline: output::SharedPipeline,
    knobs: (u16, u16),
) -> Result<Core> {
    let voices = VoiceManager::new(CpalBackend::new(pipeline), config.voices);
    let lights = ChaseLights::new(
        TerminalStrip::new(io::stdout(), CHASE_ROW, "chase", config.lights.pixel_count),
        TerminalStrip::new(io::stdout(), INDICATOR_ROW, "led  ", 1),
    );
    let display = Display::new(io::stdout(), config.display.refresh_interval())?;
    Ok(ControlCore::new(
        display,
        Performer { voices, lights },
        config.knobs.mapping(),
        config.knobs.smoothing,
        knobs,
    ))
}
