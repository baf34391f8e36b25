use std::sync::atomic::{AtomicU32, Ordering};

use cadenza_dsp::SampleBuffer;

/// Per-channel peak and RMS published from the render thread. Values are
/// stored as `f32` bits so readers never take a lock.
#[derive(Debug)]
pub struct LevelMeter {
    channels: Box<[ChannelLevel]>,
}

#[derive(Debug, Default)]
struct ChannelLevel {
    peak: AtomicU32,
    rms: AtomicU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelLevels {
    pub peak: f32,
    pub rms: f32,
}

impl LevelMeter {
    pub fn new(channels: usize) -> Self {
        Self {
            channels: (0..channels.max(1)).map(|_| ChannelLevel::default()).collect(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn update(&self, buffer: &SampleBuffer) {
        for (index, level) in self.channels.iter().enumerate() {
            level
                .peak
                .store(buffer.peak_level(index).to_bits(), Ordering::Relaxed);
            level
                .rms
                .store(buffer.rms_level(index).to_bits(), Ordering::Relaxed);
        }
    }

    pub fn reset(&self) {
        for level in self.channels.iter() {
            level.peak.store(0, Ordering::Relaxed);
            level.rms.store(0, Ordering::Relaxed);
        }
    }

    pub fn peak(&self, channel: usize) -> f32 {
        self.levels(channel).peak
    }

    pub fn rms(&self, channel: usize) -> f32 {
        self.levels(channel).rms
    }

    /// Levels of `channel`, zero when the channel does not exist.
    pub fn levels(&self, channel: usize) -> ChannelLevels {
        self.channels
            .get(channel)
            .map(|level| ChannelLevels {
                peak: f32::from_bits(level.peak.load(Ordering::Relaxed)),
                rms: f32::from_bits(level.rms.load(Ordering::Relaxed)),
            })
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Vec<ChannelLevels> {
        (0..self.channels.len()).map(|ch| self.levels(ch)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_peak_and_rms() {
        let meter = LevelMeter::new(2);
        let buffer = SampleBuffer::from_channels(vec![vec![0.5, -0.5], vec![0.0, 1.0]], 48_000.0);
        meter.update(&buffer);
        assert_eq!(meter.peak(0), 0.5);
        assert_eq!(meter.rms(0), 0.5);
        assert_eq!(meter.peak(1), 1.0);
        assert_eq!(meter.peak(7), 0.0);
        meter.reset();
        assert_eq!(meter.snapshot(), vec![ChannelLevels::default(); 2]);
    }
}
