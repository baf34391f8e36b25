use std::fmt;

use cadenza_dsp::SampleBuffer;

use super::{fade_multiplier, ClipError, FadeCurve, SourceAudio};
use crate::time::Tempo;

pub const MAX_CLIP_GAIN: f32 = 10.0;
pub const DEFAULT_CLIP_COLOR: u32 = 0x4a90e2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A time-positioned window into shared source audio.
///
/// All times are seconds. `start_time` and `duration` place the clip on the
/// timeline, `source_offset` says where in the source the clip begins.
#[derive(Debug, Clone)]
pub struct Clip {
    id: ClipId,
    name: String,
    color: u32,
    start_time: f64,
    duration: f64,
    source_offset: f64,
    gain: f32,
    fade_in: f64,
    fade_out: f64,
    fade_curve: FadeCurve,
    muted: bool,
    looped: bool,
    loop_start: f64,
    loop_end: f64,
    source: SourceAudio,
}

impl Clip {
    /// Creates a clip covering the whole source, starting at `start_time`.
    pub fn new(id: ClipId, name: impl Into<String>, source: SourceAudio, start_time: f64) -> Self {
        let duration = source.duration();
        Self {
            id,
            name: name.into(),
            color: DEFAULT_CLIP_COLOR,
            start_time: non_negative(start_time),
            duration,
            source_offset: 0.0,
            gain: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            fade_curve: FadeCurve::Linear,
            muted: false,
            looped: false,
            loop_start: 0.0,
            loop_end: 0.0,
            source,
        }
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn set_color(&mut self, color: u32) {
        self.color = color & 0x00ff_ffff;
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn source_offset(&self) -> f64 {
        self.source_offset
    }

    pub fn set_source_offset(&mut self, offset: f64) {
        self.source_offset = non_negative(offset);
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = if gain.is_finite() {
            gain.clamp(0.0, MAX_CLIP_GAIN)
        } else {
            1.0
        };
    }

    pub fn fade_in(&self) -> f64 {
        self.fade_in
    }

    pub fn fade_out(&self) -> f64 {
        self.fade_out
    }

    /// Clamped to `[0, duration / 2]`.
    pub fn set_fade_in(&mut self, seconds: f64) {
        self.fade_in = non_negative(seconds).min(self.duration * 0.5);
    }

    /// Clamped to `[0, duration / 2]`.
    pub fn set_fade_out(&mut self, seconds: f64) {
        self.fade_out = non_negative(seconds).min(self.duration * 0.5);
    }

    pub fn fade_curve(&self) -> FadeCurve {
        self.fade_curve
    }

    pub fn set_fade_curve(&mut self, curve: FadeCurve) {
        self.fade_curve = curve;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    /// Enabling looping with an empty region loops the whole source.
    pub fn set_looped(&mut self, looped: bool) {
        self.looped = looped;
        if looped && self.loop_end <= self.loop_start {
            self.loop_start = 0.0;
            self.loop_end = self.source.duration();
        }
    }

    pub fn loop_points(&self) -> (f64, f64) {
        (self.loop_start, self.loop_end)
    }

    /// Loop region in source seconds, clamped inside the source.
    pub fn set_loop_points(&mut self, start: f64, end: f64) {
        let length = self.source.duration();
        self.loop_start = non_negative(start).min(length);
        self.loop_end = non_negative(end).clamp(self.loop_start, length);
    }

    pub fn source(&self) -> &SourceAudio {
        &self.source
    }

    /// Active at `t` iff `start <= t < end`.
    pub fn is_active_at(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time()
    }

    pub fn move_to(&mut self, start_time: f64) {
        self.start_time = non_negative(start_time);
    }

    /// Changes the duration, keeping both fades within half of it.
    pub fn resize(&mut self, duration: f64) {
        self.duration = non_negative(duration);
        self.fade_in = self.fade_in.min(self.duration * 0.5);
        self.fade_out = self.fade_out.min(self.duration * 0.5);
    }

    /// Trims the clip to `[new_start, new_end)` while keeping the audio
    /// aligned to the timeline.
    pub fn trim(&mut self, new_start: f64, new_end: f64) {
        let new_start = non_negative(new_start);
        let new_end = non_negative(new_end).max(new_start);
        let shift = (new_start - self.start_time).max(-self.source_offset);
        self.start_time += shift;
        self.source_offset += shift;
        self.resize(new_end - self.start_time);
    }

    /// Moves the left edge right by `amount` seconds (left for negative
    /// amounts), sliding the source offset along with it.
    pub fn trim_start(&mut self, amount: f64) {
        let amount = amount
            .min(self.duration)
            .max(-self.source_offset)
            .max(-self.start_time);
        self.start_time += amount;
        self.source_offset += amount;
        self.resize(self.duration - amount);
    }

    /// Moves the right edge left by `amount` seconds.
    pub fn trim_end(&mut self, amount: f64) {
        self.resize(self.duration - amount);
    }

    /// Snaps `start_time` to the nearest multiple of `grid` seconds. A
    /// non-positive grid leaves the clip untouched.
    pub fn quantize(&mut self, grid: f64) {
        if grid > 0.0 && grid.is_finite() {
            self.start_time = non_negative((self.start_time / grid).round() * grid);
        }
    }

    pub fn quantize_to_beats(&mut self, tempo: Tempo) {
        self.quantize(tempo.seconds_per_beat());
    }

    /// Sets the clip gain so the source peak lands on `target_peak`. Leaves
    /// the shared samples untouched.
    pub fn normalize(&mut self, target_peak: f32) {
        let peak = self.source.peak();
        if peak > 0.0 {
            self.set_gain(target_peak.max(0.0) / peak);
        }
    }

    /// Splits at timeline time `at`. `self` keeps `[start, at)` and the
    /// returned clip covers `[at, end)`, sharing the same source.
    pub fn split(&mut self, at: f64, new_id: ClipId) -> Result<Clip, ClipError> {
        let start = self.start_time;
        let end = self.end_time();
        if !(at > start && at < end) {
            return Err(ClipError::InvalidSplitPoint { at, start, end });
        }
        let mut tail = self.duplicate(new_id);
        tail.start_time = at;
        tail.duration = end - at;
        tail.source_offset = self.source_offset + (at - start);
        tail.fade_in = tail.fade_in.min(tail.duration * 0.5);
        tail.fade_out = tail.fade_out.min(tail.duration * 0.5);
        self.resize(at - start);
        Ok(tail)
    }

    /// Copies the envelope and placement under a new id, sharing the source.
    pub fn duplicate(&self, new_id: ClipId) -> Clip {
        Clip {
            id: new_id,
            ..self.clone()
        }
    }

    /// Fade envelope at `local` seconds after the clip start.
    pub fn fade_gain_at(&self, local: f64) -> f32 {
        fade_multiplier(local, self.duration, self.fade_in, self.fade_out, self.fade_curve)
    }

    /// Adds this clip's contribution to `output`, whose first frame sits at
    /// `window_start` on the timeline. `window_end` bounds the window.
    pub fn render_into(
        &self,
        output: &mut SampleBuffer,
        window_start: f64,
        window_end: f64,
        sample_rate: f32,
    ) {
        if self.muted || self.duration <= 0.0 || sample_rate <= 0.0 {
            return;
        }
        let clip_end = self.end_time();
        let from = self.start_time.max(window_start);
        let to = clip_end.min(window_end);
        if from >= to {
            return;
        }

        let rate = sample_rate as f64;
        let frames = output.frame_count();
        let first = (((from - window_start) * rate).round().max(0.0) as usize).min(frames);
        let last = (((to - window_start) * rate).round().max(0.0) as usize).min(frames);
        if first >= last {
            return;
        }

        let source = self.source.buffer();
        let source_frames = source.frame_count();
        if source_frames == 0 {
            return;
        }
        let source_rate = if source.sample_rate() > 0.0 {
            source.sample_rate() as f64
        } else {
            rate
        };
        let loop_start = (self.loop_start * source_rate).round() as usize;
        let loop_end = ((self.loop_end * source_rate).round() as usize).min(source_frames);
        let (loop_start, loop_len) = if loop_end > loop_start {
            (loop_start, loop_end - loop_start)
        } else {
            (0, source_frames)
        };

        let channels = output.channel_count().min(source.channel_count());
        let fade_free = self.fade_in <= 0.0 && self.fade_out <= 0.0;
        for frame in first..last {
            let local = window_start + frame as f64 / rate - self.start_time;
            let mut index = ((self.source_offset + local) * source_rate).round().max(0.0) as usize;
            if index >= source_frames {
                if !self.looped {
                    break;
                }
                index = loop_start + (index - loop_start) % loop_len;
            }
            let envelope = if fade_free {
                self.gain
            } else {
                self.gain * self.fade_gain_at(local)
            };
            for channel in 0..channels {
                output.add_sample(channel, frame, source.sample(channel, index) * envelope);
            }
        }
    }
}

#[inline]
fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
