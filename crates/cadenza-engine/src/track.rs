use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use cadenza_dsp::{pan::constant_power, SampleBuffer};

use crate::clips::Clip;
use crate::effects::EffectChain;
use crate::meter::LevelMeter;
use crate::record::RecordProducer;

pub const MAX_TRACK_VOLUME: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mixer-strip state swapped as one unit, so the render thread never sees
/// e.g. a new mute flag next to an old solo flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackParams {
    pub volume: f32,
    pub pan: f32,
    pub muted: bool,
    pub soloed: bool,
    pub record_armed: bool,
}

impl TrackParams {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: clamp_volume(volume),
            pan: 0.0,
            muted: false,
            soloed: false,
            record_armed: false,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = clamp_volume(volume);
        self
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = if pan.is_finite() {
            pan.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// `(left, right)` post-fader gains for a stereo strip.
    pub fn stereo_gains(&self) -> (f32, f32) {
        let (left, right) = constant_power(self.pan);
        (left * self.volume, right * self.volume)
    }
}

impl Default for TrackParams {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, MAX_TRACK_VOLUME)
    } else {
        1.0
    }
}

/// Snapshot of a track's clips. Rebuilt on the control side and swapped in
/// whole; the render thread only ever reads it.
pub type ClipSet = Vec<Clip>;

/// State shared between the controller and the render-side [`Track`].
#[derive(Debug)]
pub struct TrackShared {
    params: ArcSwap<TrackParams>,
    clips: ArcSwap<ClipSet>,
    meter: LevelMeter,
}

impl TrackShared {
    pub fn new(params: TrackParams, channels: usize) -> Self {
        Self {
            params: ArcSwap::from_pointee(params),
            clips: ArcSwap::from_pointee(ClipSet::new()),
            meter: LevelMeter::new(channels),
        }
    }

    pub fn params(&self) -> TrackParams {
        **self.params.load()
    }

    /// Swaps in new params and hands back the previous value. Like
    /// [`publish_clips`](Self::publish_clips) the caller decides where the
    /// old allocation gets dropped.
    pub fn publish_params(&self, params: TrackParams) -> Arc<TrackParams> {
        self.params.swap(Arc::new(params))
    }

    /// Swaps in a new clip snapshot and hands back the previous one.
    pub fn publish_clips(&self, clips: Arc<ClipSet>) -> Arc<ClipSet> {
        self.clips.swap(clips)
    }

    pub fn clips(&self) -> Arc<ClipSet> {
        self.clips.load_full()
    }

    pub fn meter(&self) -> &LevelMeter {
        &self.meter
    }
}

/// Render-side half of a track: effect state, scratch buffer and recorder.
#[derive(Debug)]
pub struct Track {
    id: TrackId,
    shared: Arc<TrackShared>,
    effects: EffectChain,
    scratch: SampleBuffer,
    recorder: RecordProducer,
}

impl Track {
    pub fn new(
        id: TrackId,
        shared: Arc<TrackShared>,
        scratch: SampleBuffer,
        effects: EffectChain,
        recorder: RecordProducer,
    ) -> Self {
        Self {
            id,
            shared,
            effects,
            scratch,
            recorder,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn shared(&self) -> &Arc<TrackShared> {
        &self.shared
    }

    pub fn params(&self) -> TrackParams {
        self.shared.params()
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    /// Post-fader output of the last rendered block.
    pub fn output(&self) -> &SampleBuffer {
        &self.scratch
    }

    /// Renders clips for `[window_start, window_end)`, runs the effect chain,
    /// applies volume and pan and updates the meters. With `play_clips`
    /// false the chain still runs on silence so effect tails ring out.
    pub fn render(
        &mut self,
        params: &TrackParams,
        window_start: f64,
        window_end: f64,
        sample_rate: f32,
        play_clips: bool,
    ) {
        self.scratch.clear();
        if play_clips {
            let clips = self.shared.clips.load();
            for clip in clips.iter() {
                clip.render_into(&mut self.scratch, window_start, window_end, sample_rate);
            }
        }

        self.effects.process(&mut self.scratch, sample_rate);

        if self.scratch.channel_count() >= 2 {
            let (left, right) = params.stereo_gains();
            self.scratch.apply_channel_gain(0, left);
            self.scratch.apply_channel_gain(1, right);
        } else {
            self.scratch.apply_gain(params.volume);
        }

        self.shared.meter.update(&self.scratch);
    }

    /// Renders the block and mixes it into `output` when `audible`. Meters
    /// update either way.
    pub fn render_into(
        &mut self,
        output: &mut SampleBuffer,
        window_start: f64,
        window_end: f64,
        sample_rate: f32,
        audible: bool,
    ) {
        let params = self.params();
        self.render(&params, window_start, window_end, sample_rate, true);
        if audible {
            output.add_from(&self.scratch, 1.0, 0);
        }
    }

    /// Feeds the recorder with `input` when given, else with this block's
    /// post-fader output.
    pub fn record(&mut self, input: Option<&SampleBuffer>) {
        match input {
            Some(input) => self.recorder.write_planar(input),
            None => self.recorder.write_planar(&self.scratch),
        }
    }
}

/// Clips on `clips` active at timeline time `t`, in list order.
pub fn clips_at_time(clips: &[Clip], t: f64) -> Vec<&Clip> {
    clips.iter().filter(|clip| clip.is_active_at(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clips::{ClipId, SourceAudio};
    use crate::record::record_ring;

    fn track(params: TrackParams, channels: usize) -> (Track, crate::record::RecordConsumer) {
        let shared = Arc::new(TrackShared::new(params, channels));
        let (tx, rx) = record_ring(1_024, channels, 100.0);
        let track = Track::new(
            TrackId(1),
            shared,
            SampleBuffer::new(channels, 100, 100.0),
            EffectChain::with_capacity(4),
            tx,
        );
        (track, rx)
    }

    fn constant_clip(id: u64, value: f32, start: f64) -> Clip {
        let source = SourceAudio::from_channels(vec![vec![value; 100], vec![value; 100]], 100.0);
        Clip::new(ClipId(id), "c", source, start)
    }

    #[test]
    fn params_clamp_volume_and_pan() {
        let params = TrackParams::new(5.0).with_pan(-3.0);
        assert_eq!(params.volume, MAX_TRACK_VOLUME);
        assert_eq!(params.pan, -1.0);
    }

    #[test]
    fn centre_pan_uses_constant_power() {
        let (mut track, _rx) = track(TrackParams::new(1.0), 2);
        track
            .shared()
            .publish_clips(Arc::new(vec![constant_clip(1, 1.0, 0.0)]));
        let mut out = SampleBuffer::new(2, 100, 100.0);
        track.render_into(&mut out, 0.0, 1.0, 100.0, true);
        let expected = std::f32::consts::FRAC_PI_4.cos();
        assert!((out.sample(0, 10) - expected).abs() < 1e-6);
        assert!((out.sample(1, 10) - expected).abs() < 1e-6);
        assert!((track.shared().meter().peak(0) - expected).abs() < 1e-6);
    }

    #[test]
    fn overlapping_clips_sum() {
        let (mut track, _rx) = track(TrackParams::new(1.0).with_pan(-1.0), 2);
        track.shared().publish_clips(Arc::new(vec![
            constant_clip(1, 0.25, 0.0),
            constant_clip(2, 0.5, 0.5),
        ]));
        let mut out = SampleBuffer::new(2, 100, 100.0);
        track.render_into(&mut out, 0.0, 1.0, 100.0, true);
        assert!((out.sample(0, 10) - 0.25).abs() < 1e-6);
        assert!((out.sample(0, 60) - 0.75).abs() < 1e-6);
        assert!(out.sample(1, 60).abs() < 1e-6);
    }

    #[test]
    fn inaudible_track_still_meters() {
        let (mut track, _rx) = track(TrackParams::new(0.5), 1);
        track
            .shared()
            .publish_clips(Arc::new(vec![constant_clip(1, 1.0, 0.0)]));
        let mut out = SampleBuffer::new(1, 100, 100.0);
        track.render_into(&mut out, 0.0, 1.0, 100.0, false);
        assert_eq!(out.peak_level(0), 0.0);
        assert_eq!(track.shared().meter().peak(0), 0.5);
    }

    #[test]
    fn records_post_fader_output_without_input() {
        let (mut track, mut rx) = track(TrackParams::new(0.5), 1);
        track
            .shared()
            .publish_clips(Arc::new(vec![constant_clip(1, 1.0, 0.0)]));
        let params = track.params();
        track.render(&params, 0.0, 1.0, 100.0, true);
        track.record(None);
        let mut data = vec![0.0; 100];
        assert_eq!(rx.read(&mut data, 100), 100);
        assert!(data.iter().all(|s| (*s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn clips_at_time_scans_in_order() {
        let clips = vec![
            constant_clip(1, 1.0, 0.0),
            constant_clip(2, 1.0, 2.0),
            constant_clip(3, 1.0, 0.5),
        ];
        let active: Vec<ClipId> = clips_at_time(&clips, 0.75).iter().map(|c| c.id()).collect();
        assert_eq!(active, vec![ClipId(1), ClipId(3)]);
    }
}
