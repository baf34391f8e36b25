//! Cadenza Engine
//! ==============
//! Multi-track mixing core for Cadenza. Tracks play clips through per-track
//! effect chains into a master bus, driven by a transport and fed to
//! lock-free record rings. The render half ([`MixEngine`]) never blocks or
//! allocates; the control half ([`EngineController`]) owns the editable
//! model and publishes it block by block.

pub mod click;
pub mod clips;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod meter;
pub mod mixer;
pub mod record;
pub mod time;
pub mod track;
pub mod transport;

pub use cadenza_dsp::SampleBuffer;
pub use clips::{Clip, ClipId, FadeCurve, SourceAudio};
pub use config::{ChannelLayout, EngineConfig};
pub use effects::{EffectId, EffectProcessor, EffectRegistry, ParameterSpec};
pub use engine::{engine, EngineController};
pub use error::{ConfigError, EngineError, EngineResult};
pub use meter::ChannelLevels;
pub use mixer::{is_audible, EngineStatus, MixEngine};
pub use record::{RecordConsumer, RecordDrain, RecordSink};
pub use time::{MusicalPosition, Tempo, TimeSignature};
pub use track::{TrackId, TrackParams};
pub use transport::TransportState;
