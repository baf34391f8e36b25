/// Planar multi-channel sample container.
///
/// Every channel holds exactly `frame_count` samples. Accessors are total:
/// reads outside the valid (channel, frame) range return `0.0` and writes
/// outside it are ignored, so callers can walk past logical edges safely.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    frames: usize,
    sample_rate: f32,
}

impl SampleBuffer {
    pub fn new(channel_count: usize, frame_count: usize, sample_rate: f32) -> Self {
        Self {
            channels: (0..channel_count).map(|_| vec![0.0; frame_count]).collect(),
            frames: frame_count,
            sample_rate: sample_rate.max(0.0),
        }
    }

    /// Builds a buffer from per-channel vectors. Shorter channels are padded
    /// with silence up to the longest one.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: f32) -> Self {
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        let channels = channels
            .into_iter()
            .map(|mut channel| {
                channel.resize(frames, 0.0);
                channel
            })
            .collect();
        Self {
            channels,
            frames,
            sample_rate: sample_rate.max(0.0),
        }
    }

    /// De-interleaves `data` into a new buffer. A trailing partial frame is
    /// dropped.
    pub fn from_interleaved(data: &[f32], channel_count: usize, sample_rate: f32) -> Self {
        if channel_count == 0 {
            return Self::new(0, 0, sample_rate);
        }
        let frames = data.len() / channel_count;
        let mut buffer = Self::new(channel_count, frames, sample_rate);
        for (frame, chunk) in data.chunks_exact(channel_count).enumerate() {
            for (channel, sample) in chunk.iter().enumerate() {
                buffer.channels[channel][frame] = *sample;
            }
        }
        buffer
    }

    /// Interleaves up to `frames` frames into `out`, returning the number of
    /// frames written.
    pub fn write_interleaved(&self, out: &mut [f32], frames: usize) -> usize {
        let channels = self.channels.len();
        if channels == 0 {
            return 0;
        }
        let frames = frames.min(self.frames).min(out.len() / channels);
        for frame in 0..frames {
            let base = frame * channels;
            for (channel, data) in self.channels.iter().enumerate() {
                out[base + channel] = data[frame];
            }
        }
        frames
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(0.0);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames == 0 || self.channels.is_empty()
    }

    /// Duration of the buffer in seconds, `0.0` when the sample rate is unset.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    /// Same channel count and frame count as `other`.
    pub fn same_shape(&self, other: &SampleBuffer) -> bool {
        self.channels.len() == other.channels.len() && self.frames == other.frames
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        self.channels
            .get(channel)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        match self.channels.get_mut(channel) {
            Some(data) => data.as_mut_slice(),
            None => &mut [],
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Mutable access to the first two channels at once. The second slice is
    /// empty for mono buffers.
    pub fn stereo_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        match self.channels.as_mut_slice() {
            [] => (&mut [], &mut []),
            [left] => (left.as_mut_slice(), &mut []),
            [left, right, ..] => (left.as_mut_slice(), right.as_mut_slice()),
        }
    }

    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        self.channels
            .get(channel)
            .and_then(|data| data.get(frame))
            .copied()
            .unwrap_or(0.0)
    }

    #[inline]
    pub fn set_sample(&mut self, channel: usize, frame: usize, value: f32) {
        if let Some(slot) = self
            .channels
            .get_mut(channel)
            .and_then(|data| data.get_mut(frame))
        {
            *slot = value;
        }
    }

    #[inline]
    pub fn add_sample(&mut self, channel: usize, frame: usize, value: f32) {
        if let Some(slot) = self
            .channels
            .get_mut(channel)
            .and_then(|data| data.get_mut(frame))
        {
            *slot += value;
        }
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Zeroes `len` frames starting at `start`, clipped to the buffer.
    pub fn clear_range(&mut self, start: usize, len: usize) {
        let start = start.min(self.frames);
        let end = start.saturating_add(len).min(self.frames);
        for channel in &mut self.channels {
            channel[start..end].fill(0.0);
        }
    }

    pub fn apply_gain(&mut self, gain: f32) {
        if gain == 1.0 {
            return;
        }
        for channel in &mut self.channels {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    pub fn apply_channel_gain(&mut self, channel: usize, gain: f32) {
        if let Some(data) = self.channels.get_mut(channel) {
            for sample in data.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Linear ramp across the whole buffer: the first frame gets
    /// `start_gain`, the last frame exactly `end_gain`. A single-frame
    /// buffer gets `start_gain`.
    pub fn apply_gain_ramp(&mut self, start_gain: f32, end_gain: f32) {
        if self.frames == 0 {
            return;
        }
        if start_gain == end_gain || self.frames == 1 {
            self.apply_gain(start_gain);
            return;
        }
        let last = (self.frames - 1) as f32;
        let delta = end_gain - start_gain;
        for channel in &mut self.channels {
            for (frame, sample) in channel.iter_mut().enumerate() {
                *sample *= start_gain + delta * (frame as f32 / last);
            }
        }
    }

    /// Overwrites the overlapping region with `other`'s samples. Frames and
    /// channels beyond the shorter of the two buffers are left untouched.
    pub fn copy_from(&mut self, other: &SampleBuffer) {
        let frames = self.frames.min(other.frames);
        for (dest, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            dest[..frames].copy_from_slice(&src[..frames]);
        }
    }

    /// Additively mixes `other * gain` into this buffer starting at
    /// `dest_offset`. Mismatched shapes are silently truncated to the
    /// overlapping channels and frames.
    pub fn add_from(&mut self, other: &SampleBuffer, gain: f32, dest_offset: usize) {
        if dest_offset >= self.frames {
            return;
        }
        let frames = (self.frames - dest_offset).min(other.frames);
        for (dest, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            let dest = &mut dest[dest_offset..dest_offset + frames];
            for (out, input) in dest.iter_mut().zip(src[..frames].iter()) {
                *out += input * gain;
            }
        }
    }

    pub fn peak_level(&self, channel: usize) -> f32 {
        self.channel(channel)
            .iter()
            .fold(0.0f32, |peak, sample| peak.max(sample.abs()))
    }

    pub fn rms_level(&self, channel: usize) -> f32 {
        let data = self.channel(channel);
        if data.is_empty() {
            return 0.0;
        }
        let sum: f64 = data.iter().map(|s| (*s as f64) * (*s as f64)).sum();
        (sum / data.len() as f64).sqrt() as f32
    }

    /// Resizes the buffer and clears its contents. Only call this from the
    /// control side; the render path never changes buffer shapes.
    pub fn resize(&mut self, channel_count: usize, frame_count: usize) {
        self.channels.resize_with(channel_count, Vec::new);
        for channel in &mut self.channels {
            channel.clear();
            channel.resize(frame_count, 0.0);
        }
        self.frames = frame_count;
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(2, 0, 48_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(channels: usize, frames: usize, value: f32) -> SampleBuffer {
        let mut buffer = SampleBuffer::new(channels, frames, 48_000.0);
        for channel in buffer.channels_mut() {
            channel.fill(value);
        }
        buffer
    }

    #[test]
    fn clear_zeroes_every_sample() {
        let mut buffer = filled(2, 32, 0.7);
        buffer.clear();
        for channel in 0..2 {
            for frame in 0..32 {
                assert_eq!(buffer.sample(channel, frame), 0.0);
            }
        }
    }

    #[test]
    fn out_of_range_access_is_silent() {
        let mut buffer = filled(1, 4, 1.0);
        assert_eq!(buffer.sample(3, 0), 0.0);
        assert_eq!(buffer.sample(0, 99), 0.0);
        buffer.set_sample(5, 5, 2.0);
        buffer.add_sample(0, 10, 2.0);
        assert!(buffer.channel(1).is_empty());
        assert!(buffer.channel_mut(9).is_empty());
        assert_eq!(buffer.channel(0), &[1.0; 4]);
    }

    #[test]
    fn clear_range_is_clipped() {
        let mut buffer = filled(2, 8, 1.0);
        buffer.clear_range(6, 100);
        assert_eq!(buffer.channel(0), &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
        buffer.clear_range(20, 4);
        assert_eq!(buffer.sample(1, 5), 1.0);
    }

    #[test]
    fn add_from_truncates_mismatched_shapes() {
        let mut dest = filled(2, 8, 0.0);
        let src = filled(3, 4, 0.5);
        dest.add_from(&src, 2.0, 6);
        assert_eq!(dest.channel(0), &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(dest.channel(1), &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        dest.add_from(&src, 1.0, 8);
        assert_eq!(dest.sample(0, 7), 1.0);
    }

    #[test]
    fn copy_from_only_touches_overlap() {
        let mut dest = filled(2, 6, 9.0);
        let src = filled(1, 3, 1.0);
        dest.copy_from(&src);
        assert_eq!(dest.channel(0), &[1.0, 1.0, 1.0, 9.0, 9.0, 9.0]);
        assert_eq!(dest.channel(1), &[9.0; 6]);
    }

    #[test]
    fn gain_ramp_interpolates_linearly() {
        let mut buffer = filled(1, 4, 1.0);
        buffer.apply_gain_ramp(0.0, 1.0);
        let expected = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
        for (actual, expected) in buffer.channel(0).iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-6);
        }
        assert_eq!(buffer.sample(0, 3), 1.0);
    }

    #[test]
    fn gain_ramp_ends_on_target_and_handles_one_frame() {
        let mut stereo = filled(2, 64, 2.0);
        stereo.apply_gain_ramp(1.0, 0.25);
        assert_eq!(stereo.sample(0, 0), 2.0);
        assert_eq!(stereo.sample(1, 63), 0.5);

        let mut single = filled(1, 1, 1.0);
        single.apply_gain_ramp(0.3, 0.9);
        assert_eq!(single.sample(0, 0), 0.3);
    }

    #[test]
    fn meters_report_peak_and_rms() {
        let buffer = SampleBuffer::from_channels(vec![vec![0.5, -1.0, 0.5, -1.0]], 48_000.0);
        assert_eq!(buffer.peak_level(0), 1.0);
        let expected = ((0.25 + 1.0 + 0.25 + 1.0) / 4.0f32).sqrt();
        assert!((buffer.rms_level(0) - expected).abs() < 1e-6);
        assert_eq!(buffer.peak_level(4), 0.0);
        assert_eq!(buffer.rms_level(4), 0.0);
    }

    #[test]
    fn interleave_round_trip_preserves_order() {
        let data = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        let buffer = SampleBuffer::from_interleaved(&data, 2, 44_100.0);
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.channel(0), &[0.1, 0.3, 0.5]);
        assert_eq!(buffer.channel(1), &[0.2, 0.4, 0.6]);
        let mut out = [0.0; 6];
        assert_eq!(buffer.write_interleaved(&mut out, 16), 3);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn from_channels_pads_short_channels() {
        let buffer = SampleBuffer::from_channels(vec![vec![1.0, 2.0, 3.0], vec![4.0]], 48_000.0);
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.channel(1), &[4.0, 0.0, 0.0]);
    }
}
