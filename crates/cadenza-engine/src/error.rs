use std::path::PathBuf;

use thiserror::Error;

use crate::clips::{ClipError, ClipId};
use crate::effects::EffectId;
use crate::track::TrackId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors returned by the control side of the engine. The render side never
/// produces these.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("track {0} not found")]
    TrackNotFound(TrackId),
    #[error("clip {0} not found")]
    ClipNotFound(ClipId),
    #[error("effect {0} not found")]
    EffectNotFound(EffectId),
    #[error("unknown effect kind `{0}`")]
    UnknownEffect(String),
    #[error("effect `{effect}` has no parameter `{name}`")]
    UnknownParameter { effect: &'static str, name: String },
    #[error("track limit of {0} reached")]
    TrackLimit(usize),
    #[error("effect chain of track {track} is full ({limit} slots)")]
    EffectChainFull { track: TrackId, limit: usize },
    #[error("render command queue is full")]
    CommandQueueFull,
    #[error("recorder for track {0} has already been taken")]
    RecorderTaken(TrackId),
    #[error(transparent)]
    Clip(#[from] ClipError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type EngineResult<T> = Result<T, EngineError>;
