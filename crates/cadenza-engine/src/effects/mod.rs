//! Per-track effect processors.
//!
//! Processors are plain stateful DSP objects driven from the render thread.
//! Parameters are addressed by name; values outside a parameter's range are
//! clamped rather than rejected.

mod chain;
mod chorus;
mod delay;
mod filter;
mod registry;
mod reverb;

use std::fmt;

use cadenza_dsp::SampleBuffer;

pub use chain::{EffectChain, EffectSlot};
pub use chorus::Chorus;
pub use delay::StereoDelay;
pub use filter::OnePoleFilter;
pub use registry::{EffectFactory, EffectRegistry};
pub use reverb::SchroederReverb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub u64);

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Describes one named parameter of a processor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParameterSpec {
    pub const fn new(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            min,
            max,
            default,
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }
}

pub fn find_parameter(
    specs: &'static [ParameterSpec],
    name: &str,
) -> Option<&'static ParameterSpec> {
    specs.iter().find(|spec| spec.name == name)
}

pub trait EffectProcessor: Send {
    /// Registry kind, e.g. `"delay"`.
    fn name(&self) -> &'static str;

    fn parameters(&self) -> &'static [ParameterSpec];

    /// Sets a parameter, clamping into range. Returns false for unknown names.
    fn set_parameter(&mut self, name: &str, value: f32) -> bool;

    fn parameter(&self, name: &str) -> Option<f32>;

    /// Processes `buffer` in place.
    fn process(&mut self, buffer: &mut SampleBuffer, sample_rate: f32);

    /// Zeroes delay lines and filter state. Parameters are kept.
    fn reset(&mut self);
}

impl fmt::Debug for dyn EffectProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectProcessor")
            .field("name", &self.name())
            .finish()
    }
}
