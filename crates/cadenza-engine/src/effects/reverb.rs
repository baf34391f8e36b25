use cadenza_dsp::{reverb::scale_length, AllpassFilter, CombFilter, SampleBuffer};

use super::{EffectProcessor, ParameterSpec};

const COMB_LENGTHS: [usize; 8] = [1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116];
const ALLPASS_LENGTHS: [usize; 4] = [225, 556, 441, 341];
/// Right-channel allpasses are detuned so the two tails decorrelate.
const STEREO_SPREAD: usize = 23;
const ALLPASS_FEEDBACK: f32 = 0.5;
const INPUT_GAIN: f32 = 0.15;

const PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec::new("room_size", 0.0, 1.0, 0.5),
    ParameterSpec::new("damping", 0.0, 1.0, 0.5),
    ParameterSpec::new("wet", 0.0, 1.0, 0.3),
    ParameterSpec::new("dry", 0.0, 1.0, 0.7),
    ParameterSpec::new("width", 0.0, 1.0, 1.0),
];

/// Schroeder reverberator: eight damped parallel combs fed from the mono sum,
/// even combs to the left and odd combs to the right, then four series
/// allpasses per side and a mid/side width stage.
#[derive(Debug, Clone)]
pub struct SchroederReverb {
    room_size: f32,
    damping: f32,
    wet: f32,
    dry: f32,
    width: f32,
    combs: Vec<CombFilter>,
    allpass_left: Vec<AllpassFilter>,
    allpass_right: Vec<AllpassFilter>,
}

impl SchroederReverb {
    pub fn new(sample_rate: f32) -> Self {
        let combs = COMB_LENGTHS
            .iter()
            .map(|&len| CombFilter::new(scale_length(len, sample_rate)))
            .collect();
        let allpasses = |spread: usize| -> Vec<AllpassFilter> {
            ALLPASS_LENGTHS
                .iter()
                .map(|&len| {
                    let mut allpass = AllpassFilter::new(scale_length(len + spread, sample_rate));
                    allpass.set_feedback(ALLPASS_FEEDBACK);
                    allpass
                })
                .collect()
        };
        let mut reverb = Self {
            room_size: PARAMETERS[0].default,
            damping: PARAMETERS[1].default,
            wet: PARAMETERS[2].default,
            dry: PARAMETERS[3].default,
            width: PARAMETERS[4].default,
            combs,
            allpass_left: allpasses(0),
            allpass_right: allpasses(STEREO_SPREAD),
        };
        reverb.update_combs();
        reverb
    }

    /// Maps room size onto comb feedback in `[0.7, 0.98]`.
    pub fn comb_feedback(&self) -> f32 {
        (0.7 + 0.28 * self.room_size).min(0.98)
    }

    pub fn comb_lengths(&self) -> Vec<usize> {
        self.combs.iter().map(CombFilter::len).collect()
    }

    fn update_combs(&mut self) {
        let feedback = self.comb_feedback();
        for comb in &mut self.combs {
            comb.set_feedback(feedback);
            comb.set_damp(self.damping);
        }
    }

    #[inline]
    fn tick(&mut self, input: f32) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for (index, comb) in self.combs.iter_mut().enumerate() {
            let out = comb.process(input);
            if index % 2 == 0 {
                left += out;
            } else {
                right += out;
            }
        }
        for allpass in &mut self.allpass_left {
            left = allpass.process(left);
        }
        for allpass in &mut self.allpass_right {
            right = allpass.process(right);
        }
        let mid = (left + right) * 0.5;
        let side = (left - right) * 0.5 * self.width;
        (mid + side, mid - side)
    }
}

impl EffectProcessor for SchroederReverb {
    fn name(&self) -> &'static str {
        "reverb"
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        PARAMETERS
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            "room_size" => self.room_size = PARAMETERS[0].clamp(value),
            "damping" => self.damping = PARAMETERS[1].clamp(value),
            "wet" => self.wet = PARAMETERS[2].clamp(value),
            "dry" => self.dry = PARAMETERS[3].clamp(value),
            "width" => self.width = PARAMETERS[4].clamp(value),
            _ => return false,
        }
        self.update_combs();
        true
    }

    fn parameter(&self, name: &str) -> Option<f32> {
        match name {
            "room_size" => Some(self.room_size),
            "damping" => Some(self.damping),
            "wet" => Some(self.wet),
            "dry" => Some(self.dry),
            "width" => Some(self.width),
            _ => None,
        }
    }

    fn process(&mut self, buffer: &mut SampleBuffer, _sample_rate: f32) {
        let (dry, wet) = (self.dry, self.wet);
        if buffer.channel_count() < 2 {
            for sample in buffer.channel_mut(0).iter_mut() {
                let (l, r) = self.tick(*sample * INPUT_GAIN);
                *sample = dry * *sample + wet * (l + r) * 0.5;
            }
            return;
        }
        let frames = buffer.frame_count();
        for frame in 0..frames {
            let in_l = buffer.sample(0, frame);
            let in_r = buffer.sample(1, frame);
            let (l, r) = self.tick((in_l + in_r) * 0.5 * INPUT_GAIN);
            buffer.set_sample(0, frame, dry * in_l + wet * l);
            buffer.set_sample(1, frame, dry * in_r + wet * r);
        }
    }

    fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in self.allpass_left.iter_mut().chain(self.allpass_right.iter_mut()) {
            allpass.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comb_lengths_scale_from_reference_rate() {
        let at_ref = SchroederReverb::new(44_100.0);
        assert_eq!(at_ref.comb_lengths(), COMB_LENGTHS.to_vec());
        let at_88k = SchroederReverb::new(88_200.0);
        assert_eq!(at_88k.comb_lengths()[0], 3114);
    }

    #[test]
    fn defaults_match_descriptors() {
        let reverb = SchroederReverb::new(48_000.0);
        for spec in PARAMETERS {
            assert_eq!(reverb.parameter(spec.name), Some(spec.default));
        }
    }

    #[test]
    fn feedback_ceiling_holds() {
        let mut reverb = SchroederReverb::new(48_000.0);
        reverb.set_parameter("room_size", 5.0);
        assert_eq!(reverb.parameter("room_size"), Some(1.0));
        assert!(reverb.comb_feedback() <= 0.98);
    }

    #[test]
    fn zero_width_collapses_to_mono() {
        let mut reverb = SchroederReverb::new(48_000.0);
        reverb.set_parameter("width", 0.0);
        reverb.set_parameter("dry", 0.0);
        reverb.set_parameter("wet", 1.0);
        let mut buffer = SampleBuffer::new(2, 8_192, 48_000.0);
        buffer.set_sample(0, 0, 1.0);
        reverb.process(&mut buffer, 48_000.0);
        assert!(buffer.peak_level(0) > 0.0);
        for frame in 0..buffer.frame_count() {
            assert_eq!(buffer.sample(0, frame), buffer.sample(1, frame));
        }
    }
}
