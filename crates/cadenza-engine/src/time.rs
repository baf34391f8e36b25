use serde::{Deserialize, Serialize};

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;
/// Ticks per quarter note used for musical positions.
pub const DEFAULT_PPQ: u32 = 960;

/// Utility helpers for converting between musical and time domains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo(pub f64);

impl Tempo {
    /// Builds a tempo clamped to the supported 20–300 BPM range.
    pub fn new(bpm: f64) -> Self {
        if bpm.is_finite() {
            Self(bpm.clamp(MIN_BPM, MAX_BPM))
        } else {
            Self::default()
        }
    }

    #[inline]
    pub fn beats_per_minute(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn beats_per_second(&self) -> f64 {
        self.0 / 60.0
    }

    #[inline]
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.0
    }

    #[inline]
    pub fn samples_per_beat(&self, sample_rate: f32) -> f64 {
        self.seconds_per_beat() * sample_rate as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(120.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    /// Both fields are kept in 1–32.
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator: numerator.clamp(1, 32) as u8,
            denominator: denominator.clamp(1, 32) as u8,
        }
    }

    pub fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.numerator.max(1) as u32
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

/// Half-open loop region `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start: f64,
    pub end: f64,
}

impl LoopRegion {
    /// Orders the bounds and clamps them at zero.
    pub fn new(start: f64, end: f64) -> Self {
        let start = start.max(0.0);
        let end = end.max(0.0);
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.start && seconds < self.end
    }
}

impl Default for LoopRegion {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 60.0,
        }
    }
}

/// Bar/beat/tick position. Bars and beats are zero-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicalPosition {
    pub bar: u64,
    pub beat: u32,
    pub tick: u32,
    /// Sub-tick remainder in `[0, 1)`.
    pub tick_fraction: f64,
}

#[inline]
pub fn seconds_to_beats(seconds: f64, tempo: Tempo) -> f64 {
    seconds * tempo.beats_per_second()
}

#[inline]
pub fn beats_to_seconds(beats: f64, tempo: Tempo) -> f64 {
    beats / tempo.beats_per_second()
}

#[inline]
pub fn beats_to_bars(beats: f64, signature: TimeSignature) -> f64 {
    beats / signature.beats_per_bar() as f64
}

#[inline]
pub fn bars_to_beats(bars: f64, signature: TimeSignature) -> f64 {
    bars * signature.beats_per_bar() as f64
}

#[inline]
pub fn seconds_to_bars(seconds: f64, tempo: Tempo, signature: TimeSignature) -> f64 {
    beats_to_bars(seconds_to_beats(seconds, tempo), signature)
}

#[inline]
pub fn bars_to_seconds(bars: f64, tempo: Tempo, signature: TimeSignature) -> f64 {
    beats_to_seconds(bars_to_beats(bars, signature), tempo)
}

pub fn musical_position(
    seconds: f64,
    tempo: Tempo,
    signature: TimeSignature,
    ppq: u32,
) -> MusicalPosition {
    let beats = seconds_to_beats(seconds.max(0.0), tempo);
    let per_bar = signature.beats_per_bar() as f64;
    let bar = (beats / per_bar).floor();
    let beat_in_bar = beats - bar * per_bar;
    let beat = beat_in_bar.floor();
    let ticks = (beat_in_bar - beat) * ppq.max(1) as f64;
    let tick = ticks.floor();
    MusicalPosition {
        bar: bar as u64,
        beat: beat as u32,
        tick: tick as u32,
        tick_fraction: ticks - tick,
    }
}
