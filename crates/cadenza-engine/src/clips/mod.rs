mod clip;
mod fade;
mod source;

pub use clip::{Clip, ClipId, DEFAULT_CLIP_COLOR, MAX_CLIP_GAIN};
pub use fade::{fade_multiplier, FadeCurve};
pub use source::SourceAudio;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("split point {at}s lies outside clip ({start}s..{end}s)")]
    InvalidSplitPoint { at: f64, start: f64, end: f64 },
    #[error("clip source has no audio")]
    EmptySource,
}

/// True when the half-open ranges of `a` and `b` intersect.
pub fn overlaps(a: &Clip, b: &Clip) -> bool {
    a.start_time() < b.end_time() && b.start_time() < a.end_time()
}
