//! Feedback building blocks for Schroeder-style reverberators.
//!
//! ```text
//! comb:    y[n] = buf[n - d];  lp = y*(1-damp) + lp*damp;  buf[n] = x + lp*fb
//! allpass: y[n] = buf[n - d] - g*x;                        buf[n] = x + g*buf[n - d]
//! ```

use crate::utils::flush_tiny;

/// Reference rate the classic tunings were measured at.
pub const REFERENCE_SAMPLE_RATE: f32 = 44_100.0;

/// Scales a delay length tuned at 44.1 kHz to `sample_rate`.
#[inline]
pub fn scale_length(length: usize, sample_rate: f32) -> usize {
    let scaled = (length as f32 * sample_rate.max(1.0) / REFERENCE_SAMPLE_RATE).round();
    (scaled as usize).max(1)
}

/// Lowpass-damped feedback comb filter.
#[derive(Clone, Debug)]
pub struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    pub fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            pos: 0,
            feedback: 0.5,
            damp: 0.5,
            filter_state: 0.0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Feedback stays below 1 so the loop always decays.
    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.98);
    }

    #[inline]
    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.pos];
        self.filter_state = flush_tiny(output * (1.0 - self.damp) + self.filter_state * self.damp);
        self.buffer[self.pos] = flush_tiny(input + self.filter_state * self.feedback);
        self.pos += 1;
        if self.pos >= self.buffer.len() {
            self.pos = 0;
        }
        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.pos = 0;
    }
}

/// Schroeder allpass diffuser.
#[derive(Clone, Debug)]
pub struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    pub fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            pos: 0,
            feedback: 0.5,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.9);
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        let output = delayed - self.feedback * input;
        self.buffer[self.pos] = flush_tiny(input + self.feedback * delayed);
        self.pos += 1;
        if self.pos >= self.buffer.len() {
            self.pos = 0;
        }
        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}
