use cadenza_dsp::{DelayLine, OnePole, SampleBuffer};

use super::{EffectProcessor, ParameterSpec};

/// Lines always hold at least this much audio.
const MAX_DELAY_SECONDS: f32 = 2.0;

const PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec::new("time_left", 0.02, 1.2, 0.3),
    ParameterSpec::new("time_right", 0.02, 1.2, 0.45),
    ParameterSpec::new("feedback", 0.0, 0.95, 0.35),
    ParameterSpec::new("wet", 0.0, 1.0, 0.3),
    ParameterSpec::new("dry", 0.0, 1.0, 1.0),
    ParameterSpec::new("tone", 500.0, 8_000.0, 4_000.0),
    ParameterSpec::new("ping_pong", 0.0, 1.0, 0.0),
];

/// Two independent feedback delay lines with a tone filter on the repeats
/// and optional ping-pong cross-feed.
#[derive(Debug, Clone)]
pub struct StereoDelay {
    time_left: f32,
    time_right: f32,
    feedback: f32,
    wet: f32,
    dry: f32,
    tone_hz: f32,
    ping_pong: f32,
    lines: [DelayLine; 2],
    tone: [OnePole; 2],
    tuned_rate: f32,
}

impl StereoDelay {
    pub fn new(sample_rate: f32) -> Self {
        let rate = sample_rate.max(1.0);
        let line = DelayLine::with_seconds(rate, MAX_DELAY_SECONDS);
        let mut delay = Self {
            time_left: PARAMETERS[0].default,
            time_right: PARAMETERS[1].default,
            feedback: PARAMETERS[2].default,
            wet: PARAMETERS[3].default,
            dry: PARAMETERS[4].default,
            tone_hz: PARAMETERS[5].default,
            ping_pong: PARAMETERS[6].default,
            lines: [line.clone(), line],
            tone: [OnePole::new(); 2],
            tuned_rate: rate,
        };
        delay.retune(rate);
        delay
    }

    fn retune(&mut self, sample_rate: f32) {
        self.tuned_rate = sample_rate.max(1.0);
        for pole in &mut self.tone {
            pole.set_tone(self.tuned_rate, self.tone_hz);
        }
    }

    fn delay_samples(&self, seconds: f32, sample_rate: f32) -> usize {
        ((seconds * sample_rate).round() as usize).clamp(1, self.lines[0].max_delay())
    }

    pub fn ping_pong(&self) -> bool {
        self.ping_pong >= 0.5
    }
}

impl EffectProcessor for StereoDelay {
    fn name(&self) -> &'static str {
        "delay"
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        PARAMETERS
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            "time_left" => self.time_left = PARAMETERS[0].clamp(value),
            "time_right" => self.time_right = PARAMETERS[1].clamp(value),
            "feedback" => self.feedback = PARAMETERS[2].clamp(value),
            "wet" => self.wet = PARAMETERS[3].clamp(value),
            "dry" => self.dry = PARAMETERS[4].clamp(value),
            "tone" => {
                self.tone_hz = PARAMETERS[5].clamp(value);
                self.retune(self.tuned_rate);
            }
            "ping_pong" => self.ping_pong = PARAMETERS[6].clamp(value),
            _ => return false,
        }
        true
    }

    fn parameter(&self, name: &str) -> Option<f32> {
        match name {
            "time_left" => Some(self.time_left),
            "time_right" => Some(self.time_right),
            "feedback" => Some(self.feedback),
            "wet" => Some(self.wet),
            "dry" => Some(self.dry),
            "tone" => Some(self.tone_hz),
            "ping_pong" => Some(self.ping_pong),
            _ => None,
        }
    }

    fn process(&mut self, buffer: &mut SampleBuffer, sample_rate: f32) {
        if sample_rate > 0.0 && sample_rate != self.tuned_rate {
            self.retune(sample_rate);
        }
        let rate = self.tuned_rate;
        let delay_l = self.delay_samples(self.time_left, rate);
        let delay_r = self.delay_samples(self.time_right, rate);
        let (feedback, wet, dry) = (self.feedback, self.wet, self.dry);
        let ping_pong = self.ping_pong();

        if buffer.channel_count() < 2 {
            let line = &mut self.lines[0];
            let tone = &mut self.tone[0];
            for sample in buffer.channel_mut(0).iter_mut() {
                let delayed = tone.process(line.read(delay_l));
                line.write(*sample + delayed * feedback);
                *sample = dry * *sample + wet * delayed;
            }
            return;
        }

        let [line_l, line_r] = &mut self.lines;
        let [tone_l, tone_r] = &mut self.tone;
        let (left, right) = buffer.stereo_mut();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let delayed_l = tone_l.process(line_l.read(delay_l));
            let delayed_r = tone_r.process(line_r.read(delay_r));
            let (fb_l, fb_r) = if ping_pong {
                (delayed_r * feedback, delayed_l * feedback)
            } else {
                (delayed_l * feedback, delayed_r * feedback)
            };
            line_l.write(*l + fb_l);
            line_r.write(*r + fb_r);
            *l = dry * *l + wet * delayed_l;
            *r = dry * *r + wet * delayed_r;
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        for pole in &mut self.tone {
            pole.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(frames: usize) -> SampleBuffer {
        let mut buffer = SampleBuffer::new(2, frames, 1_000.0);
        buffer.set_sample(0, 0, 1.0);
        buffer.set_sample(1, 0, 1.0);
        buffer
    }

    #[test]
    fn echo_arrives_after_delay_time() {
        let mut delay = StereoDelay::new(1_000.0);
        delay.set_parameter("time_left", 0.1);
        delay.set_parameter("time_right", 0.2);
        delay.set_parameter("tone", 8_000.0);
        delay.set_parameter("wet", 1.0);
        delay.set_parameter("dry", 0.0);
        let mut buffer = impulse(300);
        delay.process(&mut buffer, 1_000.0);
        assert_eq!(buffer.sample(0, 0), 0.0);
        assert!(buffer.sample(0, 100) > 0.5);
        assert_eq!(buffer.sample(1, 100), 0.0);
        assert!(buffer.sample(1, 200) > 0.5);
    }

    #[test]
    fn parameters_are_clamped() {
        let mut delay = StereoDelay::new(48_000.0);
        assert!(delay.set_parameter("feedback", 2.0));
        assert_eq!(delay.parameter("feedback"), Some(0.95));
        assert!(delay.set_parameter("time_left", 0.0));
        assert_eq!(delay.parameter("time_left"), Some(0.02));
        assert!(!delay.set_parameter("time", 0.5));
        assert_eq!(delay.parameter("nope"), None);
    }

    #[test]
    fn every_parameter_reads_back_what_was_set() {
        let mut delay = StereoDelay::new(48_000.0);
        let values = [0.5, 0.7, 0.4, 0.6, 0.8, 2_000.0, 1.0];
        for (spec, value) in PARAMETERS.iter().zip(values) {
            assert_eq!(delay.parameter(spec.name), Some(spec.default));
            assert!(delay.set_parameter(spec.name, value));
            assert_eq!(delay.parameter(spec.name), Some(value));
        }
        assert!(delay.ping_pong());
    }

    #[test]
    fn ping_pong_crosses_channels() {
        let mut delay = StereoDelay::new(1_000.0);
        delay.set_parameter("time_left", 0.1);
        delay.set_parameter("time_right", 0.1);
        delay.set_parameter("feedback", 0.9);
        delay.set_parameter("tone", 8_000.0);
        delay.set_parameter("ping_pong", 1.0);
        delay.set_parameter("dry", 0.0);
        delay.set_parameter("wet", 1.0);
        let mut buffer = SampleBuffer::new(2, 250, 1_000.0);
        buffer.set_sample(0, 0, 1.0);
        delay.process(&mut buffer, 1_000.0);
        assert!(buffer.sample(0, 100) > 0.5);
        assert!(buffer.sample(1, 100).abs() < 1e-6);
        assert!(buffer.sample(1, 200) > 0.3);
    }
}
