use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use cpal::{
    FromSample, SizedSample, Stream,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::{
    mixer::Mixer,
    oscillatorbank::OscillatorBank,
    voices::{AudioBackend, VoiceDescriptor},
};

pub type SharedPipeline = Arc<Mutex<SynthPipeline>>;

const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;
const OUTPUT_LIMIT: f32 = 0.98;

pub struct SynthPipeline {
    bank: OscillatorBank,
    mixer: Mixer,
    sample_rate: f32,
    voice_buffer: Vec<f32>,
}

impl SynthPipeline {
    pub fn new(mixer: Mixer) -> Self {
        Self {
            bank: OscillatorBank::new(),
            mixer,
            sample_rate: DEFAULT_SAMPLE_RATE,
            voice_buffer: Vec::new(),
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
    }

    pub fn press(&mut self, voices: &[VoiceDescriptor]) {
        self.bank.replace(voices, self.sample_rate);
        self.voice_buffer.clear();
        self.voice_buffer.resize(self.bank.len(), 0.0);
    }

    pub fn release(&mut self) {
        self.bank.release();
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.bank.is_silent() {
            return 0.0;
        }
        self.bank
            .fill_sample(self.sample_rate, &mut self.voice_buffer);
        self.mixer.mix(&self.voice_buffer)
    }
}

/// Hands voice sets to the pipeline the device callback is reading from.
pub struct CpalBackend {
    pipeline: SharedPipeline,
}

impl CpalBackend {
    pub fn new(pipeline: SharedPipeline) -> Self {
        Self { pipeline }
    }
}

impl AudioBackend for CpalBackend {
    fn press(&mut self, voices: &[VoiceDescriptor]) -> Result<()> {
        // One lock for the whole swap: the callback sees old or new, never both.
        let mut pipeline = self
            .pipeline
            .lock()
            .map_err(|_| anyhow!("audio pipeline lock poisoned"))?;
        pipeline.press(voices);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let mut pipeline = self
            .pipeline
            .lock()
            .map_err(|_| anyhow!("audio pipeline lock poisoned"))?;
        pipeline.release();
        Ok(())
    }
}

pub struct AudioEngine {
    _stream: Stream,
}

impl AudioEngine {
    pub fn start(pipeline: SharedPipeline) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default audio output"))?;
        let supported = device.default_output_config()?;
        let config = supported.config();
        {
            let mut guard = pipeline
                .lock()
                .map_err(|_| anyhow!("audio pipeline lock poisoned"))?;
            guard.set_sample_rate(config.sample_rate.0 as f32);
        }
        log::info!(
            "audio output {} at {} Hz ({:?})",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate.0,
            supported.sample_format()
        );
        let stream = match supported.sample_format() {
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, pipeline)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, pipeline)?,
            _ => build_stream::<f32>(&device, &config, pipeline)?,
        };
        stream.play()?;
        Ok(Self { _stream: stream })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    pipeline: SharedPipeline,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [T], _| fill_output_buffer(output, channels, &pipeline),
        move |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn fill_output_buffer<T>(output: &mut [T], channels: usize, pipeline: &SharedPipeline)
where
    T: SizedSample + FromSample<f32>,
{
    let mut pipe = pipeline.lock().expect("pipeline lock");
    for frame in output.chunks_mut(channels) {
        let sample = pipe.next_sample().clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT);
        let value = T::from_sample(sample);
        for channel in frame {
            *channel = value;
        }
    }
}
