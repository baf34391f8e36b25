use crate::utils::flush_tiny;

pub const MIN_CUTOFF_HZ: f32 = 20.0;
pub const MAX_CUTOFF_RATIO: f32 = 0.45;
pub const MIN_RESONANCE: f32 = 0.1;
pub const MAX_RESONANCE: f32 = 10.0;

/// Single-pole lowpass smoother: `z += alpha * (x - z)`.
#[derive(Clone, Copy, Debug)]
pub struct OnePole {
    alpha: f32,
    z: f32,
}

impl OnePole {
    #[inline]
    pub fn new() -> Self {
        Self { alpha: 1.0, z: 0.0 }
    }

    /// Lowpass tuned from a cutoff and resonance. The cutoff is kept inside
    /// `[20 Hz, 0.45 * sample_rate]` and the resonance inside `[0.1, 10]`.
    #[inline]
    pub fn lowpass(sample_rate: f32, cutoff_hz: f32, resonance: f32) -> Self {
        let mut filter = Self::new();
        filter.set_lowpass(sample_rate, cutoff_hz, resonance);
        filter
    }

    #[inline]
    pub fn set_lowpass(&mut self, sample_rate: f32, cutoff_hz: f32, resonance: f32) {
        let sr = sample_rate.max(1.0);
        let cutoff = clamp_cutoff(cutoff_hz, sr);
        let res = resonance.clamp(MIN_RESONANCE, MAX_RESONANCE);
        let omega = 2.0 * core::f32::consts::PI * cutoff / sr;
        self.set_alpha(omega.sin() / (2.0 * res));
    }

    /// Tone-control tuning: `alpha = cutoff / nyquist`, kept in `[0.01, 0.99]`.
    #[inline]
    pub fn set_tone(&mut self, sample_rate: f32, cutoff_hz: f32) {
        let nyquist = sample_rate.max(1.0) * 0.5;
        self.alpha = (cutoff_hz / nyquist).clamp(0.01, 0.99);
    }

    /// Coefficients above 1 would overshoot, so alpha lives in `[0, 1]`.
    #[inline]
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    #[inline]
    pub fn reset(&mut self) {
        self.z = 0.0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.z = flush_tiny(self.z + self.alpha * (input - self.z));
        self.z
    }
}

impl Default for OnePole {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
pub fn clamp_cutoff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    let upper = (MAX_CUTOFF_RATIO * sample_rate).max(MIN_CUTOFF_HZ);
    cutoff_hz.clamp(MIN_CUTOFF_HZ, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_to_dc_input() {
        let mut filter = OnePole::lowpass(48_000.0, 1_000.0, 0.707);
        let mut out = 0.0;
        for _ in 0..10_000 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-3);
    }

    #[test]
    fn cutoff_is_clamped() {
        assert_eq!(clamp_cutoff(5.0, 48_000.0), MIN_CUTOFF_HZ);
        assert_eq!(clamp_cutoff(40_000.0, 48_000.0), 0.45 * 48_000.0);
    }

    #[test]
    fn low_resonance_saturates_alpha() {
        let filter = OnePole::lowpass(48_000.0, 10_000.0, 0.01);
        assert_eq!(filter.alpha(), 1.0);
    }

    #[test]
    fn tone_coefficient_tracks_nyquist() {
        let mut filter = OnePole::new();
        filter.set_tone(48_000.0, 4_000.0);
        assert!((filter.alpha() - 4_000.0 / 24_000.0).abs() < 1e-6);
        filter.set_tone(48_000.0, 100_000.0);
        assert_eq!(filter.alpha(), 0.99);
    }

    #[test]
    fn reset_clears_state() {
        let mut filter = OnePole::lowpass(48_000.0, 200.0, 1.0);
        filter.process(1.0);
        filter.reset();
        let alpha = filter.alpha();
        assert!((filter.process(1.0) - alpha).abs() < 1e-6);
    }
}
