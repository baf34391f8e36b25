use std::f32::consts::{FRAC_PI_2, TAU};

use cadenza_dsp::{DelayLine, SampleBuffer};

use super::{EffectProcessor, ParameterSpec};

const MAX_VOICES: usize = 4;
const BASE_DELAY_SECONDS: f32 = 0.012;
const VOICE_SPREAD_SECONDS: f32 = 0.004;
const LINE_SECONDS: f32 = 0.1;

const PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec::new("rate", 0.05, 5.0, 1.2),
    ParameterSpec::new("depth", 0.0, 0.02, 0.0045),
    ParameterSpec::new("mix", 0.0, 1.0, 0.4),
    ParameterSpec::new("voices", 2.0, 4.0, 2.0),
];

/// Multi-voice chorus: each voice reads the shared per-channel line at its
/// own base delay, swept by a sine LFO with a per-voice phase offset.
#[derive(Debug, Clone)]
pub struct Chorus {
    rate: f32,
    depth: f32,
    mix: f32,
    voices: usize,
    phase: f32,
    lines: Vec<DelayLine>,
}

impl Chorus {
    pub fn new(sample_rate: f32, channels: usize) -> Self {
        let line = DelayLine::with_seconds(sample_rate.max(1.0), LINE_SECONDS);
        Self {
            rate: PARAMETERS[0].default,
            depth: PARAMETERS[1].default,
            mix: PARAMETERS[2].default,
            voices: PARAMETERS[3].default as usize,
            phase: 0.0,
            lines: vec![line; channels.max(1)],
        }
    }

    pub fn voices(&self) -> usize {
        self.voices
    }

    /// Anything below three voices selects 2, the rest 4.
    fn snap_voices(value: f32) -> usize {
        if value < 3.0 {
            2
        } else {
            MAX_VOICES
        }
    }
}

impl EffectProcessor for Chorus {
    fn name(&self) -> &'static str {
        "chorus"
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        PARAMETERS
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            "rate" => self.rate = PARAMETERS[0].clamp(value),
            "depth" => self.depth = PARAMETERS[1].clamp(value),
            "mix" => self.mix = PARAMETERS[2].clamp(value),
            "voices" => self.voices = Self::snap_voices(PARAMETERS[3].clamp(value)),
            _ => return false,
        }
        true
    }

    fn parameter(&self, name: &str) -> Option<f32> {
        match name {
            "rate" => Some(self.rate),
            "depth" => Some(self.depth),
            "mix" => Some(self.mix),
            "voices" => Some(self.voices as f32),
            _ => None,
        }
    }

    fn process(&mut self, buffer: &mut SampleBuffer, sample_rate: f32) {
        if sample_rate <= 0.0 {
            return;
        }
        let increment = TAU * self.rate / sample_rate;
        let voices = self.voices.clamp(1, MAX_VOICES);
        let voice_gain = 1.0 / voices as f32;
        let depth = self.depth * sample_rate;
        let start_phase = self.phase;
        let mut end_phase = start_phase;

        for (channel, (samples, line)) in buffer
            .channels_mut()
            .zip(self.lines.iter_mut())
            .enumerate()
        {
            // Odd channels run a quarter cycle ahead for stereo spread.
            let channel_offset = if channel % 2 == 1 { FRAC_PI_2 } else { 0.0 };
            let mut phase = start_phase;
            for sample in samples.iter_mut() {
                let mut wet = 0.0;
                for voice in 0..voices {
                    let offset = TAU * voice as f32 / voices as f32 + channel_offset;
                    let base = (BASE_DELAY_SECONDS + VOICE_SPREAD_SECONDS * voice as f32)
                        * sample_rate;
                    let delay = base + depth * (1.0 + (phase + offset).sin());
                    wet += line.read_interpolated(delay);
                }
                line.write(*sample);
                *sample = (1.0 - self.mix) * *sample + self.mix * wet * voice_gain;
                phase += increment;
                if phase >= TAU {
                    phase -= TAU;
                }
            }
            end_phase = phase;
        }
        self.phase = end_phase;
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.phase = 0.0;
    }
}
