use cadenza_dsp::SampleBuffer;

use super::{EffectId, EffectProcessor};

/// One processor in a track's chain.
#[derive(Debug)]
pub struct EffectSlot {
    pub id: EffectId,
    pub bypassed: bool,
    processor: Box<dyn EffectProcessor>,
}

impl EffectSlot {
    pub fn new(id: EffectId, processor: Box<dyn EffectProcessor>) -> Self {
        Self {
            id,
            bypassed: false,
            processor,
        }
    }

    pub fn processor(&self) -> &dyn EffectProcessor {
        self.processor.as_ref()
    }

    pub fn processor_mut(&mut self) -> &mut dyn EffectProcessor {
        self.processor.as_mut()
    }

    /// Bypassed slots leave the buffer untouched.
    pub fn process(&mut self, buffer: &mut SampleBuffer, sample_rate: f32) {
        if !self.bypassed {
            self.processor.process(buffer, sample_rate);
        }
    }
}

/// Ordered effect chain with a fixed slot budget. Capacity is reserved up
/// front so inserts on the render thread never reallocate.
#[derive(Debug)]
pub struct EffectChain {
    slots: Vec<EffectSlot>,
    limit: usize,
}

impl EffectChain {
    pub fn with_capacity(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            slots: Vec::with_capacity(limit),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn ids(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.slots.iter().map(|slot| slot.id)
    }

    fn position(&self, id: EffectId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }

    pub fn get(&self, id: EffectId) -> Option<&EffectSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn get_mut(&mut self, id: EffectId) -> Option<&mut EffectSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    /// Appends a slot. Hands it back when the chain is full.
    pub fn push(&mut self, slot: EffectSlot) -> Result<(), EffectSlot> {
        if self.slots.len() >= self.limit {
            return Err(slot);
        }
        self.slots.push(slot);
        Ok(())
    }

    pub fn remove(&mut self, id: EffectId) -> Option<EffectSlot> {
        let index = self.position(id)?;
        Some(self.slots.remove(index))
    }

    /// Moves the slot to `index` (clamped to the end of the chain).
    pub fn move_to(&mut self, id: EffectId, index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let to = index.min(self.slots.len() - 1);
        if from < to {
            self.slots[from..=to].rotate_left(1);
        } else if from > to {
            self.slots[to..=from].rotate_right(1);
        }
        true
    }

    pub fn process(&mut self, buffer: &mut SampleBuffer, sample_rate: f32) {
        for slot in &mut self.slots {
            slot.process(buffer, sample_rate);
        }
    }

    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.processor.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectRegistry, ParameterSpec};

    /// Adds a constant to every sample so chain order is observable.
    struct Offset(f32);

    impl EffectProcessor for Offset {
        fn name(&self) -> &'static str {
            "offset"
        }
        fn parameters(&self) -> &'static [ParameterSpec] {
            &[]
        }
        fn set_parameter(&mut self, _name: &str, _value: f32) -> bool {
            false
        }
        fn parameter(&self, _name: &str) -> Option<f32> {
            None
        }
        fn process(&mut self, buffer: &mut SampleBuffer, _sample_rate: f32) {
            for channel in buffer.channels_mut() {
                for sample in channel.iter_mut() {
                    *sample = *sample * 2.0 + self.0;
                }
            }
        }
        fn reset(&mut self) {}
    }

    fn slot(id: u64, offset: f32) -> EffectSlot {
        EffectSlot::new(EffectId(id), Box::new(Offset(offset)))
    }

    fn run(chain: &mut EffectChain) -> f32 {
        let mut buffer = SampleBuffer::new(1, 1, 48_000.0);
        chain.process(&mut buffer, 48_000.0);
        buffer.sample(0, 0)
    }

    #[test]
    fn processes_in_chain_order() {
        let mut chain = EffectChain::with_capacity(4);
        chain.push(slot(1, 1.0)).unwrap();
        chain.push(slot(2, 3.0)).unwrap();
        // (0*2+1)*2+3
        assert_eq!(run(&mut chain), 5.0);
        assert!(chain.move_to(EffectId(2), 0));
        // (0*2+3)*2+1
        assert_eq!(run(&mut chain), 7.0);
        assert_eq!(chain.ids().collect::<Vec<_>>(), vec![EffectId(2), EffectId(1)]);
    }

    #[test]
    fn bypassed_slot_is_transparent() {
        let mut chain = EffectChain::with_capacity(2);
        chain.push(slot(1, 1.0)).unwrap();
        chain.get_mut(EffectId(1)).unwrap().bypassed = true;
        assert_eq!(run(&mut chain), 0.0);
    }

    #[test]
    fn full_chain_hands_slot_back() {
        let mut chain = EffectChain::with_capacity(1);
        chain.push(slot(1, 0.0)).unwrap();
        let rejected = chain.push(slot(2, 0.0)).unwrap_err();
        assert_eq!(rejected.id, EffectId(2));
        assert!(chain.remove(EffectId(1)).is_some());
        assert!(chain.remove(EffectId(1)).is_none());
        assert!(!chain.move_to(EffectId(1), 0));
    }

    #[test]
    fn move_clamps_past_the_end() {
        let registry = EffectRegistry::with_builtins();
        let mut chain = EffectChain::with_capacity(3);
        for (id, kind) in ["filter", "delay", "reverb"].iter().enumerate() {
            let processor = registry.create(kind, 48_000.0, 2).unwrap();
            chain.push(EffectSlot::new(EffectId(id as u64), processor)).unwrap();
        }
        chain.move_to(EffectId(0), 99);
        let names: Vec<&str> = chain
            .ids()
            .map(|id| chain.get(id).unwrap().processor().name())
            .collect();
        assert_eq!(names, vec!["delay", "reverb", "filter"]);
    }
}
