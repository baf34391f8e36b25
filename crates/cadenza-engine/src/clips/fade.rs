use std::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FadeCurve {
    #[default]
    Linear,
    EqualPower,
}

impl FadeCurve {
    pub(crate) fn gain_in(self, progress: f32) -> f32 {
        let progress = progress.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => progress,
            FadeCurve::EqualPower => (FRAC_PI_2 * progress).sin(),
        }
    }
}

/// Envelope gain at `local` seconds after the clip start.
///
/// Fade-in ramps 0 -> 1 over `[0, fade_in)`, fade-out ramps 1 -> 0 over the
/// last `fade_out` seconds. Both are evaluated independently and multiplied.
pub fn fade_multiplier(
    local: f64,
    duration: f64,
    fade_in: f64,
    fade_out: f64,
    curve: FadeCurve,
) -> f32 {
    let mut gain = 1.0f32;
    if fade_in > 0.0 && local < fade_in {
        gain *= curve.gain_in((local.max(0.0) / fade_in) as f32);
    }
    if fade_out > 0.0 {
        let remaining = duration - local;
        if remaining < fade_out {
            gain *= curve.gain_in((remaining.max(0.0) / fade_out) as f32);
        }
    }
    gain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_in_spans_zero_to_one() {
        let f = 0.25;
        assert_eq!(fade_multiplier(0.0, 2.0, f, 0.0, FadeCurve::Linear), 0.0);
        assert!((fade_multiplier(f, 2.0, f, 0.0, FadeCurve::Linear) - 1.0).abs() < 1e-6);
        assert!((fade_multiplier(0.125, 2.0, f, 0.0, FadeCurve::Linear) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fade_out_reaches_zero_at_end() {
        assert_eq!(fade_multiplier(2.0, 2.0, 0.0, 0.5, FadeCurve::Linear), 0.0);
        assert!((fade_multiplier(1.5, 2.0, 0.0, 0.5, FadeCurve::Linear) - 1.0).abs() < 1e-6);
        assert!((fade_multiplier(1.75, 2.0, 0.0, 0.5, FadeCurve::EqualPower)
            - (FRAC_PI_2 * 0.5).sin())
        .abs()
            < 1e-6);
    }

    #[test]
    fn fades_multiply() {
        let early = fade_multiplier(0.25, 1.0, 0.5, 0.5, FadeCurve::Linear);
        assert!((early - 0.5).abs() < 1e-6);
        let short = fade_multiplier(0.5, 1.0, 1.0, 1.0, FadeCurve::Linear);
        assert!((short - 0.25).abs() < 1e-6);
    }
}
