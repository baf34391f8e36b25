use std::collections::HashMap;

use super::{Chorus, EffectProcessor, OnePoleFilter, SchroederReverb, StereoDelay};
use crate::error::{EngineError, EngineResult};

/// Builds a processor for `(sample_rate, channels)`.
pub type EffectFactory = Box<dyn Fn(f32, usize) -> Box<dyn EffectProcessor> + Send + Sync>;

/// Named effect factories. Passed to the controller explicitly; there is no
/// process-wide registry.
#[derive(Default)]
pub struct EffectRegistry {
    factories: HashMap<String, EffectFactory>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `filter`, `delay`, `chorus` and `reverb`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("filter", |sr, channels| {
            Box::new(OnePoleFilter::new(sr, channels))
        });
        registry.register("delay", |sr, _| Box::new(StereoDelay::new(sr)));
        registry.register("chorus", |sr, channels| Box::new(Chorus::new(sr, channels)));
        registry.register("reverb", |sr, _| Box::new(SchroederReverb::new(sr)));
        registry
    }

    /// Adds or replaces the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(f32, usize) -> Box<dyn EffectProcessor> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn create(
        &self,
        kind: &str,
        sample_rate: f32,
        channels: usize,
    ) -> EngineResult<Box<dyn EffectProcessor>> {
        self.factories
            .get(kind)
            .map(|factory| factory(sample_rate, channels))
            .ok_or_else(|| EngineError::UnknownEffect(kind.to_string()))
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
