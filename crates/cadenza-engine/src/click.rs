use std::f32::consts::TAU;

use cadenza_dsp::SampleBuffer;

use crate::transport::Transport;

const CLICK_SECONDS: f32 = 0.03;
const ACCENT_HZ: f32 = 1_500.0;
const BEAT_HZ: f32 = 1_000.0;

/// Metronome click generator. A click is a short decaying sine burst that
/// starts on the frame where a beat begins and may run into the next block.
#[derive(Debug, Clone)]
pub struct Metronome {
    enabled: bool,
    accent_gain: f32,
    beat_gain: f32,
    level: f32,
    remaining: usize,
    length: usize,
    phase: f32,
    increment: f32,
    gain: f32,
}

impl Metronome {
    pub fn new(accent_gain: f32, beat_gain: f32) -> Self {
        Self {
            enabled: false,
            accent_gain,
            beat_gain,
            level: 0.5,
            remaining: 0,
            length: 0,
            phase: 0.0,
            increment: 0.0,
            gain: 0.0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.remaining = 0;
        self.phase = 0.0;
    }

    fn trigger(&mut self, accent: bool, sample_rate: f32) {
        let (gain, hz) = if accent {
            (self.accent_gain, ACCENT_HZ)
        } else {
            (self.beat_gain, BEAT_HZ)
        };
        self.length = ((CLICK_SECONDS * sample_rate) as usize).max(1);
        self.remaining = self.length;
        self.phase = 0.0;
        self.increment = TAU * hz / sample_rate;
        self.gain = gain * self.level;
    }

    /// Every beat starting inside the block, as frame offset and downbeat
    /// flag, in frame order.
    pub fn beats_in_block<'a>(
        transport: &'a Transport,
        window_start: f64,
        frames: usize,
        sample_rate: f32,
    ) -> impl Iterator<Item = (usize, bool)> + 'a {
        let beats = if frames == 0 || sample_rate <= 0.0 {
            0..0
        } else {
            let window_end = window_start + frames as f64 / sample_rate as f64;
            transport.beats_crossed(window_start, window_end)
        };
        let beat_duration = transport.beat_duration();
        beats.map(move |beat| {
            let beat_time = beat as f64 * beat_duration;
            let offset = ((beat_time - window_start) * sample_rate as f64).round();
            let offset = (offset.max(0.0) as usize).min(frames - 1);
            (offset, transport.is_downbeat(beat))
        })
    }

    /// First beat starting inside the block.
    pub fn beat_in_block(
        transport: &Transport,
        window_start: f64,
        frames: usize,
        sample_rate: f32,
    ) -> Option<(usize, bool)> {
        Self::beats_in_block(transport, window_start, frames, sample_rate).next()
    }

    /// Adds clicks for the block starting at `window_start` into `output`.
    pub fn render(
        &mut self,
        output: &mut SampleBuffer,
        transport: &Transport,
        window_start: f64,
        sample_rate: f32,
    ) {
        if !self.enabled {
            return;
        }
        let frames = output.frame_count();
        let mut beats =
            Self::beats_in_block(transport, window_start, frames, sample_rate).peekable();
        for frame in 0..frames {
            while let Some((_, accent)) = beats.next_if(|(offset, _)| *offset <= frame) {
                self.trigger(accent, sample_rate);
            }
            if self.remaining == 0 {
                if beats.peek().is_none() {
                    break;
                }
                continue;
            }
            let envelope = self.remaining as f32 / self.length as f32;
            let value = self.phase.sin() * self.gain * envelope;
            for channel in output.channels_mut() {
                channel[frame] += value;
            }
            self.phase += self.increment;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
            self.remaining -= 1;
        }
    }
}

impl Default for Metronome {
    fn default() -> Self {
        Self::new(1.0, 0.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_beat_offset_inside_block() {
        let mut transport = Transport::new();
        transport.set_bpm(120.0);
        // beat 1 lands at 0.5 s = frame 24_000 of a block starting at 0.49 s
        let hit = Metronome::beat_in_block(&transport, 0.49, 960, 48_000.0);
        assert_eq!(hit, Some((480, false)));
        let downbeat = Metronome::beat_in_block(&transport, 1.99, 960, 48_000.0);
        assert_eq!(downbeat, Some((480, true)));
        assert_eq!(Metronome::beat_in_block(&transport, 0.1, 960, 48_000.0), None);
    }

    #[test]
    fn click_starts_at_beat_and_accents_downbeats() {
        let mut transport = Transport::new();
        transport.set_bpm(120.0);
        let mut metronome = Metronome::default();
        metronome.set_enabled(true);

        let mut block = SampleBuffer::new(1, 960, 48_000.0);
        metronome.render(&mut block, &transport, 1.99, 48_000.0);
        assert!(block.channel(0)[..480].iter().all(|s| *s == 0.0));
        let accent = block.peak_level(0);
        assert!(accent > 0.0);

        let mut metronome = Metronome::default();
        metronome.set_enabled(true);
        let mut block = SampleBuffer::new(1, 960, 48_000.0);
        metronome.render(&mut block, &transport, 0.49, 48_000.0);
        assert!(block.peak_level(0) < accent);
    }

    #[test]
    fn long_blocks_click_on_every_beat() {
        let mut transport = Transport::new();
        transport.set_bpm(300.0);
        let beats: Vec<_> = Metronome::beats_in_block(&transport, 0.0, 8_192, 8_000.0).collect();
        // 0.2 s beats over 1.024 s: beats 1..=5, beat 4 is the downbeat.
        assert_eq!(
            beats,
            vec![(1_600, false), (3_200, false), (4_800, false), (6_400, true), (8_000, false)]
        );

        let mut metronome = Metronome::default();
        metronome.set_enabled(true);
        let mut block = SampleBuffer::new(1, 8_192, 8_000.0);
        metronome.render(&mut block, &transport, 0.0, 8_000.0);
        // Each click is 240 frames long at 8 kHz.
        for (offset, _) in beats {
            let end = (offset + 240).min(8_192);
            assert!(block.channel(0)[offset..end].iter().any(|s| *s != 0.0));
            assert!(block.channel(0)[offset - 10..offset].iter().all(|s| *s == 0.0));
        }
    }

    #[test]
    fn disabled_metronome_is_silent() {
        let transport = Transport::new();
        let mut metronome = Metronome::default();
        let mut block = SampleBuffer::new(2, 960, 48_000.0);
        metronome.render(&mut block, &transport, 0.49, 48_000.0);
        assert_eq!(block.peak_level(0), 0.0);
    }
}
