use crate::utils::flush_tiny;

/// Mono circular delay line. Sized once up front; reads and writes never
/// allocate.
#[derive(Clone, Debug)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write: usize,
}

impl DelayLine {
    /// Creates a line holding `max_delay_samples` past samples (at least 1).
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(1) + 1],
            write: 0,
        }
    }

    pub fn with_seconds(sample_rate: f32, seconds: f32) -> Self {
        Self::new((sample_rate.max(1.0) * seconds.max(0.0)).ceil() as usize)
    }

    /// Longest delay, in samples, that `read` can reach.
    #[inline]
    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write] = flush_tiny(sample);
        self.write += 1;
        if self.write >= self.buffer.len() {
            self.write = 0;
        }
    }

    /// Sample written `delay` writes ago; `delay` is clamped to
    /// `[1, max_delay]`.
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, len - 1);
        let index = (self.write + len - delay) % len;
        self.buffer[index]
    }

    /// Fractional read with linear interpolation between the two nearest
    /// integer delays.
    #[inline]
    pub fn read_interpolated(&self, delay: f32) -> f32 {
        let max = self.max_delay() as f32;
        let delay = if delay.is_finite() { delay.clamp(1.0, max) } else { 1.0 };
        let whole = delay.floor();
        let frac = delay - whole;
        let a = self.read(whole as usize);
        if frac <= 0.0 {
            return a;
        }
        let b = self.read(whole as usize + 1);
        a + (b - a) * frac
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write = 0;
    }
}
