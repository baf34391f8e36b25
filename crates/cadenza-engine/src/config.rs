use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable the soak binary reads an optional config path from.
pub const CONFIG_ENV: &str = "CADENZA_CONFIG";

const MIN_SAMPLE_RATE: f32 = 8_000.0;
const MAX_SAMPLE_RATE: f32 = 384_000.0;
const MIN_BLOCK: usize = 16;
const MAX_BLOCK: usize = 8_192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    #[default]
    Stereo,
}

impl ChannelLayout {
    pub fn channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// Fixed shape and capacity settings agreed at engine construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    pub layout: ChannelLayout,
    pub max_tracks: usize,
    pub max_effects_per_track: usize,
    pub command_capacity: usize,
    /// Per-track recorder capacity in frames. `0` means five seconds at the
    /// configured sample rate.
    pub record_capacity_frames: usize,
    pub record_flush_frames: usize,
    pub master_gain: f32,
    pub default_track_volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            layout: ChannelLayout::Stereo,
            max_tracks: 64,
            max_effects_per_track: 16,
            command_capacity: 1024,
            record_capacity_frames: 0,
            record_flush_frames: 4096,
            master_gain: 1.0,
            default_track_volume: 0.8,
        }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: f32, block_size: usize, layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            block_size,
            layout,
            ..Self::default()
        }
        .validated()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config.validated())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(path = %path.display(), sample_rate = config.sample_rate, block_size = config.block_size, "loaded engine config");
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values that cannot be repaired by clamping.
    fn check(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: format!("{} is not a positive rate", self.sample_rate),
            });
        }
        if !self.master_gain.is_finite() {
            return Err(ConfigError::Invalid {
                field: "master_gain",
                reason: "must be finite".into(),
            });
        }
        Ok(())
    }

    /// Clamps every field into its supported range.
    pub fn validate(&mut self) {
        self.sample_rate = if self.sample_rate.is_finite() {
            self.sample_rate.clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE)
        } else {
            48_000.0
        };
        self.block_size = self.block_size.clamp(MIN_BLOCK, MAX_BLOCK);
        self.max_tracks = self.max_tracks.max(1);
        self.max_effects_per_track = self.max_effects_per_track.max(1);
        self.command_capacity = self.command_capacity.max(16);
        if self.record_capacity_frames == 0 {
            self.record_capacity_frames = (self.sample_rate * 5.0) as usize;
        }
        self.record_capacity_frames = self.record_capacity_frames.max(self.block_size);
        self.record_flush_frames = self
            .record_flush_frames
            .clamp(1, self.record_capacity_frames);
        self.master_gain = sanitize_gain(self.master_gain, 2.0, 1.0);
        self.default_track_volume = sanitize_gain(self.default_track_volume, 2.0, 0.8);
    }

    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn block_duration(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64
    }
}

fn sanitize_gain(value: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        fallback
    }
}
