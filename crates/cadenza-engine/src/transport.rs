use core::ops::Range;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use atomic_float::AtomicF64;
use serde::{Deserialize, Serialize};

use crate::time::{
    self, LoopRegion, MusicalPosition, Tempo, TimeSignature, DEFAULT_PPQ,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
    Recording,
}

impl TransportState {
    fn to_u8(self) -> u8 {
        match self {
            TransportState::Stopped => 0,
            TransportState::Playing => 1,
            TransportState::Paused => 2,
            TransportState::Recording => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => TransportState::Playing,
            2 => TransportState::Paused,
            3 => TransportState::Recording,
            _ => TransportState::Stopped,
        }
    }
}

/// Playback state machine and timeline position.
///
/// Owned by the render side. Control-side changes arrive as commands and are
/// applied at block boundaries.
#[derive(Debug, Clone)]
pub struct Transport {
    state: TransportState,
    position: f64,
    tempo: Tempo,
    signature: TimeSignature,
    loop_region: LoopRegion,
    loop_enabled: bool,
    loop_count: u64,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            state: TransportState::Stopped,
            position: 0.0,
            tempo: Tempo::default(),
            signature: TimeSignature::default(),
            loop_region: LoopRegion::default(),
            loop_enabled: false,
            loop_count: 0,
        }
    }
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// True while the timeline advances, i.e. playing or recording.
    pub fn is_playing(&self) -> bool {
        matches!(
            self.state,
            TransportState::Playing | TransportState::Recording
        )
    }

    pub fn is_recording(&self) -> bool {
        self.state == TransportState::Recording
    }

    /// `Stopped | Paused -> Playing`. Returns whether the state changed.
    pub fn play(&mut self) -> bool {
        match self.state {
            TransportState::Stopped | TransportState::Paused => {
                self.state = TransportState::Playing;
                true
            }
            _ => false,
        }
    }

    /// `Playing | Recording -> Paused`.
    pub fn pause(&mut self) -> bool {
        if self.is_playing() {
            self.state = TransportState::Paused;
            true
        } else {
            false
        }
    }

    /// Any state goes to `Stopped` with the position rewound to zero.
    pub fn stop(&mut self) -> bool {
        let changed = self.state != TransportState::Stopped || self.position != 0.0;
        self.state = TransportState::Stopped;
        self.position = 0.0;
        changed
    }

    /// `Stopped | Paused -> Recording`.
    pub fn record(&mut self) -> bool {
        match self.state {
            TransportState::Stopped | TransportState::Paused => {
                self.state = TransportState::Recording;
                true
            }
            _ => false,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn set_position(&mut self, seconds: f64) {
        self.position = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.tempo = Tempo::new(bpm);
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.signature
    }

    pub fn set_time_signature(&mut self, numerator: u32, denominator: u32) {
        self.signature = TimeSignature::new(numerator, denominator);
    }

    pub fn loop_region(&self) -> LoopRegion {
        self.loop_region
    }

    pub fn set_loop_region(&mut self, start: f64, end: f64) {
        self.loop_region = LoopRegion::new(start, end);
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    /// Advances by one rendered block. Only moves while playing or
    /// recording. Returns true when the position wrapped at the loop end.
    pub fn advance_position(&mut self, frames: usize, sample_rate: f32) -> bool {
        if !self.is_playing() || sample_rate <= 0.0 {
            return false;
        }
        let next = self.position + frames as f64 / sample_rate as f64;
        let region = self.loop_region;
        let length = region.length();
        if self.loop_enabled && length > 0.0 && next >= region.end {
            let overshoot = (next - region.end) % length;
            self.position = region.start + overshoot;
            self.loop_count = self.loop_count.wrapping_add(1);
            true
        } else {
            self.position = next;
            false
        }
    }

    pub fn beat_duration(&self) -> f64 {
        self.tempo.seconds_per_beat()
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        time::seconds_to_beats(seconds, self.tempo)
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        time::beats_to_seconds(beats, self.tempo)
    }

    pub fn seconds_to_bars(&self, seconds: f64) -> f64 {
        time::seconds_to_bars(seconds, self.tempo, self.signature)
    }

    pub fn bars_to_seconds(&self, bars: f64) -> f64 {
        time::bars_to_seconds(bars, self.tempo, self.signature)
    }

    pub fn musical_position(&self) -> MusicalPosition {
        time::musical_position(self.position, self.tempo, self.signature, DEFAULT_PPQ)
    }

    /// Indices of every beat that starts inside `(current, next]` by the
    /// floor comparison, in order.
    pub fn beats_crossed(&self, current: f64, next: f64) -> Range<u64> {
        let beat = self.beat_duration();
        let before = (current / beat).floor();
        let after = (next / beat).floor();
        if after <= before || after < 0.0 {
            return 0..0;
        }
        let first = (before + 1.0).max(0.0) as u64;
        first..after as u64 + 1
    }

    /// First beat starting inside `(current, next]`, if any.
    pub fn beat_crossed(&self, current: f64, next: f64) -> Option<u64> {
        self.beats_crossed(current, next).next()
    }

    pub fn should_click(&self, current: f64, next: f64) -> bool {
        self.beat_crossed(current, next).is_some()
    }

    pub fn is_downbeat(&self, beat_index: u64) -> bool {
        beat_index % self.signature.beats_per_bar() as u64 == 0
    }
}

/// Lock-free view of the render side's transport, published once per block.
#[derive(Debug)]
pub struct TransportStatus {
    state: AtomicU8,
    position: AtomicF64,
    bpm: AtomicF64,
    loop_enabled: AtomicBool,
    loop_count: AtomicU64,
    blocks: AtomicU64,
}

impl Default for TransportStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(TransportState::Stopped.to_u8()),
            position: AtomicF64::new(0.0),
            bpm: AtomicF64::new(Tempo::default().beats_per_minute()),
            loop_enabled: AtomicBool::new(false),
            loop_count: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
        }
    }
}

impl TransportStatus {
    pub(crate) fn publish(&self, transport: &Transport) {
        self.state.store(transport.state.to_u8(), Ordering::Relaxed);
        self.position.store(transport.position, Ordering::Relaxed);
        self.bpm
            .store(transport.tempo.beats_per_minute(), Ordering::Relaxed);
        self.loop_enabled
            .store(transport.loop_enabled, Ordering::Relaxed);
        self.loop_count.store(transport.loop_count, Ordering::Relaxed);
        self.blocks.fetch_add(1, Ordering::Release);
    }

    pub fn state(&self) -> TransportState {
        TransportState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub fn position(&self) -> f64 {
        self.position.load(Ordering::Relaxed)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm.load(Ordering::Relaxed)
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled.load(Ordering::Relaxed)
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count.load(Ordering::Relaxed)
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.blocks.load(Ordering::Acquire)
    }
}
