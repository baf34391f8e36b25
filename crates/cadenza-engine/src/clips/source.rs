use std::sync::Arc;

use cadenza_dsp::SampleBuffer;

/// Immutable decoded audio shared between clips.
///
/// Splitting or duplicating a clip clones the handle, never the samples.
#[derive(Debug, Clone)]
pub struct SourceAudio {
    inner: Arc<SampleBuffer>,
}

impl SourceAudio {
    pub fn new(buffer: SampleBuffer) -> Self {
        Self {
            inner: Arc::new(buffer),
        }
    }

    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: f32) -> Self {
        Self::new(SampleBuffer::from_channels(channels, sample_rate))
    }

    pub fn from_interleaved(data: &[f32], channels: usize, sample_rate: f32) -> Self {
        Self::new(SampleBuffer::from_interleaved(data, channels, sample_rate))
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.inner
    }

    pub fn sample_rate(&self) -> f32 {
        self.inner.sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.inner.channel_count()
    }

    pub fn frames(&self) -> usize {
        self.inner.frame_count()
    }

    pub fn duration(&self) -> f64 {
        self.inner.duration_seconds()
    }

    /// Highest absolute sample across all channels.
    pub fn peak(&self) -> f32 {
        (0..self.channels())
            .map(|ch| self.inner.peak_level(ch))
            .fold(0.0, f32::max)
    }

    /// Whether two handles point at the same sample data.
    pub fn shares_data(&self, other: &SourceAudio) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
