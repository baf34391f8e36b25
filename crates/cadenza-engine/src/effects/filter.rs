use cadenza_dsp::{filter, OnePole, SampleBuffer};

use super::{EffectProcessor, ParameterSpec};

const PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec::new("cutoff", filter::MIN_CUTOFF_HZ, 20_000.0, 1_000.0),
    ParameterSpec::new("resonance", filter::MIN_RESONANCE, filter::MAX_RESONANCE, 0.707),
];

/// One-pole lowpass, one state per channel.
#[derive(Debug, Clone)]
pub struct OnePoleFilter {
    cutoff: f32,
    resonance: f32,
    tuned_rate: f32,
    poles: Vec<OnePole>,
}

impl OnePoleFilter {
    pub fn new(sample_rate: f32, channels: usize) -> Self {
        let mut filter = Self {
            cutoff: PARAMETERS[0].default,
            resonance: PARAMETERS[1].default,
            tuned_rate: sample_rate.max(1.0),
            poles: vec![OnePole::new(); channels.max(1)],
        };
        filter.retune(filter.tuned_rate);
        filter
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.cutoff = PARAMETERS[0].clamp(hz);
        self.retune(self.tuned_rate);
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = PARAMETERS[1].clamp(resonance);
        self.retune(self.tuned_rate);
    }

    /// Cutoff after the `0.45 * sample_rate` ceiling is applied.
    pub fn effective_cutoff(&self) -> f32 {
        filter::clamp_cutoff(self.cutoff, self.tuned_rate)
    }

    fn retune(&mut self, sample_rate: f32) {
        self.tuned_rate = sample_rate.max(1.0);
        for pole in &mut self.poles {
            pole.set_lowpass(self.tuned_rate, self.cutoff, self.resonance);
        }
    }
}

impl EffectProcessor for OnePoleFilter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        PARAMETERS
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            "cutoff" => self.set_cutoff(value),
            "resonance" => self.set_resonance(value),
            _ => return false,
        }
        true
    }

    fn parameter(&self, name: &str) -> Option<f32> {
        match name {
            "cutoff" => Some(self.cutoff),
            "resonance" => Some(self.resonance),
            _ => None,
        }
    }

    fn process(&mut self, buffer: &mut SampleBuffer, sample_rate: f32) {
        if sample_rate > 0.0 && sample_rate != self.tuned_rate {
            self.retune(sample_rate);
        }
        for (channel, pole) in buffer.channels_mut().zip(self.poles.iter_mut()) {
            for sample in channel.iter_mut() {
                *sample = pole.process(*sample);
            }
        }
    }

    fn reset(&mut self) {
        for pole in &mut self.poles {
            pole.reset();
        }
    }
}
