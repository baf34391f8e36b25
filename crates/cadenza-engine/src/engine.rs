use std::sync::Arc;

use cadenza_dsp::SampleBuffer;
use ringbuf::HeapRb;

use crate::clips::{Clip, ClipError, ClipId, FadeCurve, SourceAudio};
use crate::config::EngineConfig;
use crate::effects::{EffectChain, EffectId, EffectRegistry, EffectSlot, ParameterSpec};
use crate::error::{EngineError, EngineResult};
use crate::meter::ChannelLevels;
use crate::mixer::{
    Command, CommandTx, EngineStatus, MixEngine, RetireRx, Retired, TransportCommand,
};
use crate::record::{record_ring, RecordConsumer, RecordDrain, RecordSink};
use crate::time::{self, MusicalPosition, Tempo, TimeSignature, DEFAULT_PPQ};
use crate::track::{self, ClipSet, Track, TrackId, TrackParams, TrackShared};
use crate::transport::TransportState;

/// Builds a connected controller/renderer pair. The [`MixEngine`] goes to
/// the audio thread, the controller stays with the UI or CLI.
pub fn engine(config: EngineConfig, registry: EffectRegistry) -> (EngineController, MixEngine) {
    let config = config.validated();
    let (tx, rx) = HeapRb::<Command>::new(config.command_capacity).split();
    let retire_capacity = config.command_capacity.max(config.max_tracks);
    let (retire_tx, retire_rx) = HeapRb::<Retired>::new(retire_capacity).split();
    let status = Arc::new(EngineStatus::new(config.channels(), config.master_gain));
    let mixer = MixEngine::new(&config, rx, retire_tx, Arc::clone(&status));
    tracing::info!(
        sample_rate = config.sample_rate,
        block_size = config.block_size,
        channels = config.channels(),
        "engine created"
    );
    let controller = EngineController {
        tempo: Tempo::default(),
        signature: TimeSignature::default(),
        config,
        registry,
        tracks: Vec::new(),
        next_id: 0,
        tx,
        retired: retire_rx,
        stale: Vec::new(),
        status,
    };
    (controller, mixer)
}

#[derive(Debug)]
struct EffectEntry {
    id: EffectId,
    kind: &'static str,
    parameters: &'static [ParameterSpec],
    values: Vec<f32>,
    bypassed: bool,
}

#[derive(Debug)]
struct TrackEntry {
    id: TrackId,
    name: String,
    params: TrackParams,
    shared: Arc<TrackShared>,
    clips: Vec<Clip>,
    effects: Vec<EffectEntry>,
    recorder: Option<RecordConsumer>,
}

impl TrackEntry {
    fn effect(&self, id: EffectId) -> EngineResult<&EffectEntry> {
        self.effects
            .iter()
            .find(|effect| effect.id == id)
            .ok_or(EngineError::EffectNotFound(id))
    }

    fn effect_index(&self, id: EffectId) -> EngineResult<usize> {
        self.effects
            .iter()
            .position(|effect| effect.id == id)
            .ok_or(EngineError::EffectNotFound(id))
    }
}

/// Snapshot swapped out while the render thread may still be reading it.
/// Only held so the final drop happens on this side.
#[derive(Debug)]
#[allow(dead_code)]
enum Stale {
    Clips(Arc<ClipSet>),
    Params(Arc<TrackParams>),
}

/// Control side of the engine.
///
/// Holds the authoritative model of tracks, clips and effect chains. Every
/// edit is validated here first, then published to the renderer either by
/// swapping a snapshot (track params, clip lists) or by queueing a command
/// that [`MixEngine`] applies at the next block boundary (structure, effect
/// state, transport).
pub struct EngineController {
    config: EngineConfig,
    registry: EffectRegistry,
    tracks: Vec<TrackEntry>,
    next_id: u64,
    tempo: Tempo,
    signature: TimeSignature,
    tx: CommandTx,
    retired: RetireRx,
    stale: Vec<(u64, Stale)>,
    status: Arc<EngineStatus>,
}

impl EngineController {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub fn status(&self) -> &Arc<EngineStatus> {
        &self.status
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn send(&mut self, cmd: Command) -> EngineResult<()> {
        self.collect_garbage();
        let capacity = self.config.command_capacity;
        self.tx.push(cmd).map_err(|_| {
            tracing::warn!(capacity, "render command queue full");
            EngineError::CommandQueueFull
        })
    }

    fn defer(&mut self, stale: Stale) {
        let stamp = self.status.blocks_started();
        self.stale.push((stamp, stale));
        self.release_stale();
    }

    /// A snapshot swapped out while block n was in flight may be held until
    /// block n finishes. With no block in flight it is released at once.
    fn release_stale(&mut self) {
        let rendered = self.status.transport().blocks_rendered();
        self.stale.retain(|(stamp, _)| *stamp > rendered);
    }

    /// Frees objects the renderer has let go of. Runs on every command;
    /// call it directly when the controller sits idle for long stretches.
    /// Returns the number of render-side objects released.
    pub fn collect_garbage(&mut self) -> usize {
        let mut released = 0;
        while let Some(item) = self.retired.pop() {
            drop(item);
            released += 1;
        }
        self.release_stale();
        released
    }

    // ----- tracks -----

    fn entry(&self, id: TrackId) -> EngineResult<&TrackEntry> {
        self.tracks
            .iter()
            .find(|entry| entry.id == id)
            .ok_or(EngineError::TrackNotFound(id))
    }

    fn entry_mut(&mut self, id: TrackId) -> EngineResult<&mut TrackEntry> {
        self.tracks
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(EngineError::TrackNotFound(id))
    }

    pub fn create_track(&mut self, name: impl Into<String>) -> EngineResult<TrackId> {
        let limit = self.config.max_tracks;
        if self.tracks.len() >= limit {
            return Err(EngineError::TrackLimit(limit));
        }
        let id = TrackId(self.next_id());
        let name = name.into();
        let channels = self.config.channels();
        let params = TrackParams::new(self.config.default_track_volume);
        let shared = Arc::new(TrackShared::new(params, channels));
        let (producer, consumer) = record_ring(
            self.config.record_capacity_frames,
            channels,
            self.config.sample_rate,
        );
        let track = Track::new(
            id,
            Arc::clone(&shared),
            SampleBuffer::new(channels, self.config.block_size, self.config.sample_rate),
            EffectChain::with_capacity(self.config.max_effects_per_track),
            producer,
        );
        self.send(Command::AddTrack(Box::new(track)))?;
        tracing::info!(track = %id, name = %name, "created track");
        self.tracks.push(TrackEntry {
            id,
            name,
            params,
            shared,
            clips: Vec::new(),
            effects: Vec::new(),
            recorder: Some(consumer),
        });
        Ok(id)
    }

    /// Removes the track and everything on it. Later tracks move up one
    /// index.
    pub fn delete_track(&mut self, id: TrackId) -> EngineResult<()> {
        let index = self.track_index(id)?;
        self.send(Command::RemoveTrack(id))?;
        let entry = self.tracks.remove(index);
        tracing::info!(track = %id, name = %entry.name, clips = entry.clips.len(), "deleted track");
        Ok(())
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Track ids in index order.
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|entry| entry.id).collect()
    }

    pub fn track_index(&self, id: TrackId) -> EngineResult<usize> {
        self.tracks
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(EngineError::TrackNotFound(id))
    }

    pub fn track_name(&self, id: TrackId) -> EngineResult<&str> {
        Ok(&self.entry(id)?.name)
    }

    pub fn rename_track(&mut self, id: TrackId, name: impl Into<String>) -> EngineResult<()> {
        self.entry_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn track_params(&self, id: TrackId) -> EngineResult<TrackParams> {
        Ok(self.entry(id)?.params)
    }

    fn update_params(
        &mut self,
        id: TrackId,
        update: impl FnOnce(TrackParams) -> TrackParams,
    ) -> EngineResult<()> {
        let entry = self.entry_mut(id)?;
        entry.params = update(entry.params);
        let old = entry.shared.publish_params(entry.params);
        self.defer(Stale::Params(old));
        Ok(())
    }

    /// Volume is clamped to `0..=2`.
    pub fn set_volume(&mut self, id: TrackId, volume: f32) -> EngineResult<()> {
        self.update_params(id, |params| params.with_volume(volume))
    }

    /// Pan is clamped to `-1..=1`.
    pub fn set_pan(&mut self, id: TrackId, pan: f32) -> EngineResult<()> {
        self.update_params(id, |params| params.with_pan(pan))
    }

    pub fn set_muted(&mut self, id: TrackId, muted: bool) -> EngineResult<()> {
        self.update_params(id, |params| TrackParams { muted, ..params })
    }

    pub fn set_soloed(&mut self, id: TrackId, soloed: bool) -> EngineResult<()> {
        self.update_params(id, |params| TrackParams { soloed, ..params })
    }

    pub fn set_record_armed(&mut self, id: TrackId, record_armed: bool) -> EngineResult<()> {
        self.update_params(id, |params| TrackParams {
            record_armed,
            ..params
        })
    }

    pub fn track_levels(&self, id: TrackId) -> EngineResult<Vec<ChannelLevels>> {
        Ok(self.entry(id)?.shared.meter().snapshot())
    }

    pub fn track_peak(&self, id: TrackId, channel: usize) -> EngineResult<f32> {
        Ok(self.entry(id)?.shared.meter().peak(channel))
    }

    pub fn track_rms(&self, id: TrackId, channel: usize) -> EngineResult<f32> {
        Ok(self.entry(id)?.shared.meter().rms(channel))
    }

    // ----- clips -----

    fn locate_clip(&self, id: ClipId) -> EngineResult<(usize, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(track, entry)| {
                entry
                    .clips
                    .iter()
                    .position(|clip| clip.id() == id)
                    .map(|clip| (track, clip))
            })
            .ok_or(EngineError::ClipNotFound(id))
    }

    fn publish_clips_at(&mut self, track: usize) {
        let Some(entry) = self.tracks.get(track) else {
            return;
        };
        let old = entry.shared.publish_clips(Arc::new(entry.clips.clone()));
        self.defer(Stale::Clips(old));
    }

    /// Places `source` on `track` at `start` seconds. The clip spans the
    /// whole source.
    pub fn add_clip(
        &mut self,
        track: TrackId,
        name: impl Into<String>,
        source: SourceAudio,
        start: f64,
    ) -> EngineResult<ClipId> {
        let index = self.track_index(track)?;
        if source.frames() == 0 || source.sample_rate() <= 0.0 {
            return Err(ClipError::EmptySource.into());
        }
        let id = ClipId(self.next_id());
        let clip = Clip::new(id, name, source, start);
        tracing::debug!(track = %track, clip = %id, start = clip.start_time(), duration = clip.duration(), "added clip");
        self.tracks[index].clips.push(clip);
        self.publish_clips_at(index);
        Ok(id)
    }

    pub fn clip(&self, id: ClipId) -> EngineResult<&Clip> {
        let (track, index) = self.locate_clip(id)?;
        Ok(&self.tracks[track].clips[index])
    }

    /// Track owning clip `id`.
    pub fn clip_track(&self, id: ClipId) -> EngineResult<TrackId> {
        let (track, _) = self.locate_clip(id)?;
        Ok(self.tracks[track].id)
    }

    /// Clips of `track` in insertion order.
    pub fn clips(&self, track: TrackId) -> EngineResult<&[Clip]> {
        Ok(&self.entry(track)?.clips)
    }

    pub fn clips_at_time(&self, track: TrackId, t: f64) -> EngineResult<Vec<&Clip>> {
        Ok(track::clips_at_time(&self.entry(track)?.clips, t))
    }

    /// Runs `edit` on the clip and publishes the owning track's new clip
    /// list.
    pub fn edit_clip<R>(
        &mut self,
        id: ClipId,
        edit: impl FnOnce(&mut Clip) -> R,
    ) -> EngineResult<R> {
        let (track, index) = self.locate_clip(id)?;
        let result = edit(&mut self.tracks[track].clips[index]);
        self.publish_clips_at(track);
        Ok(result)
    }

    pub fn move_clip(&mut self, id: ClipId, start: f64) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.move_to(start))
    }

    pub fn resize_clip(&mut self, id: ClipId, duration: f64) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.resize(duration))
    }

    pub fn trim_clip(&mut self, id: ClipId, new_start: f64, new_end: f64) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.trim(new_start, new_end))
    }

    pub fn trim_clip_start(&mut self, id: ClipId, amount: f64) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.trim_start(amount))
    }

    pub fn trim_clip_end(&mut self, id: ClipId, amount: f64) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.trim_end(amount))
    }

    pub fn quantize_clip(&mut self, id: ClipId, grid: f64) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.quantize(grid))
    }

    /// Snaps the clip start to the nearest beat at the current tempo.
    pub fn quantize_clip_to_beats(&mut self, id: ClipId) -> EngineResult<()> {
        let tempo = self.tempo;
        self.edit_clip(id, |clip| clip.quantize_to_beats(tempo))
    }

    pub fn set_clip_gain(&mut self, id: ClipId, gain: f32) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.set_gain(gain))
    }

    pub fn normalize_clip(&mut self, id: ClipId, target_peak: f32) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.normalize(target_peak))
    }

    pub fn set_clip_fades(
        &mut self,
        id: ClipId,
        fade_in: f64,
        fade_out: f64,
        curve: FadeCurve,
    ) -> EngineResult<()> {
        self.edit_clip(id, |clip| {
            clip.set_fade_curve(curve);
            clip.set_fade_in(fade_in);
            clip.set_fade_out(fade_out);
        })
    }

    pub fn set_clip_muted(&mut self, id: ClipId, muted: bool) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.set_muted(muted))
    }

    pub fn set_clip_looped(&mut self, id: ClipId, looped: bool) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.set_looped(looped))
    }

    pub fn set_clip_loop_points(&mut self, id: ClipId, start: f64, end: f64) -> EngineResult<()> {
        self.edit_clip(id, |clip| clip.set_loop_points(start, end))
    }

    /// Splits the clip at timeline time `at`. The new clip holds the tail
    /// and is inserted right after the original.
    pub fn split_clip(&mut self, id: ClipId, at: f64) -> EngineResult<ClipId> {
        let (track, index) = self.locate_clip(id)?;
        let new_id = ClipId(self.next_id());
        let tail = self.tracks[track].clips[index].split(at, new_id)?;
        self.tracks[track].clips.insert(index + 1, tail);
        self.publish_clips_at(track);
        Ok(new_id)
    }

    /// Copies the clip onto the same track, starting where the original
    /// ends.
    pub fn duplicate_clip(&mut self, id: ClipId) -> EngineResult<ClipId> {
        let (track, index) = self.locate_clip(id)?;
        let new_id = ClipId(self.next_id());
        let original = &self.tracks[track].clips[index];
        let mut copy = original.duplicate(new_id);
        copy.move_to(original.end_time());
        copy.set_name(format!("{} Copy", original.name()));
        self.tracks[track].clips.push(copy);
        self.publish_clips_at(track);
        Ok(new_id)
    }

    pub fn remove_clip(&mut self, id: ClipId) -> EngineResult<Clip> {
        let (track, index) = self.locate_clip(id)?;
        let clip = self.tracks[track].clips.remove(index);
        self.publish_clips_at(track);
        tracing::debug!(clip = %id, "removed clip");
        Ok(clip)
    }

    /// Moves a clip to the end of another track's list, keeping its
    /// timeline position.
    pub fn move_clip_to_track(&mut self, id: ClipId, destination: TrackId) -> EngineResult<()> {
        let to = self.track_index(destination)?;
        let (from, index) = self.locate_clip(id)?;
        if from == to {
            return Ok(());
        }
        let clip = self.tracks[from].clips.remove(index);
        self.tracks[to].clips.push(clip);
        self.publish_clips_at(from);
        self.publish_clips_at(to);
        Ok(())
    }

    // ----- effects -----

    /// Instantiates `kind` from the registry and appends it to the track's
    /// chain.
    pub fn add_effect(&mut self, track: TrackId, kind: &str) -> EngineResult<EffectId> {
        let limit = self.config.max_effects_per_track;
        if self.entry(track)?.effects.len() >= limit {
            return Err(EngineError::EffectChainFull { track, limit });
        }
        let processor = self
            .registry
            .create(kind, self.config.sample_rate, self.config.channels())?;
        let id = EffectId(self.next_id());
        let parameters = processor.parameters();
        let values = parameters
            .iter()
            .map(|spec| processor.parameter(spec.name).unwrap_or(spec.default))
            .collect();
        let entry = EffectEntry {
            id,
            kind: processor.name(),
            parameters,
            values,
            bypassed: false,
        };
        self.send(Command::AddEffect {
            track,
            slot: EffectSlot::new(id, processor),
        })?;
        tracing::info!(track = %track, effect = %id, kind = entry.kind, "added effect");
        self.entry_mut(track)?.effects.push(entry);
        Ok(id)
    }

    pub fn remove_effect(&mut self, track: TrackId, effect: EffectId) -> EngineResult<()> {
        let index = self.entry(track)?.effect_index(effect)?;
        self.send(Command::RemoveEffect { track, effect })?;
        let entry = self.entry_mut(track)?.effects.remove(index);
        tracing::info!(track = %track, effect = %effect, kind = entry.kind, "removed effect");
        Ok(())
    }

    /// Moves the effect to chain position `index`, clamped to the last
    /// slot.
    pub fn move_effect(
        &mut self,
        track: TrackId,
        effect: EffectId,
        index: usize,
    ) -> EngineResult<()> {
        let from = self.entry(track)?.effect_index(effect)?;
        self.send(Command::MoveEffect {
            track,
            effect,
            index,
        })?;
        let effects = &mut self.entry_mut(track)?.effects;
        let entry = effects.remove(from);
        let to = index.min(effects.len());
        effects.insert(to, entry);
        Ok(())
    }

    pub fn set_effect_bypass(
        &mut self,
        track: TrackId,
        effect: EffectId,
        bypassed: bool,
    ) -> EngineResult<()> {
        let index = self.entry(track)?.effect_index(effect)?;
        self.send(Command::SetEffectBypass {
            track,
            effect,
            bypassed,
        })?;
        self.entry_mut(track)?.effects[index].bypassed = bypassed;
        Ok(())
    }

    /// Sets a named parameter. The value is clamped into the parameter's
    /// range and the clamped value is returned.
    pub fn set_effect_parameter(
        &mut self,
        track: TrackId,
        effect: EffectId,
        name: &str,
        value: f32,
    ) -> EngineResult<f32> {
        let entry = self.entry(track)?;
        let index = entry.effect_index(effect)?;
        let slot = &entry.effects[index];
        let Some(param) = slot.parameters.iter().position(|spec| spec.name == name) else {
            return Err(EngineError::UnknownParameter {
                effect: slot.kind,
                name: name.to_string(),
            });
        };
        let spec = slot.parameters[param];
        let value = spec.clamp(value);
        self.send(Command::SetEffectParameter {
            track,
            effect,
            name: spec.name,
            value,
        })?;
        self.entry_mut(track)?.effects[index].values[param] = value;
        Ok(value)
    }

    pub fn effect_parameter(
        &self,
        track: TrackId,
        effect: EffectId,
        name: &str,
    ) -> EngineResult<f32> {
        let slot = self.entry(track)?.effect(effect)?;
        slot.parameters
            .iter()
            .zip(&slot.values)
            .find(|(spec, _)| spec.name == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| EngineError::UnknownParameter {
                effect: slot.kind,
                name: name.to_string(),
            })
    }

    pub fn effect_parameters(
        &self,
        track: TrackId,
        effect: EffectId,
    ) -> EngineResult<&'static [ParameterSpec]> {
        Ok(self.entry(track)?.effect(effect)?.parameters)
    }

    pub fn effect_kind(&self, track: TrackId, effect: EffectId) -> EngineResult<&'static str> {
        Ok(self.entry(track)?.effect(effect)?.kind)
    }

    pub fn effect_bypassed(&self, track: TrackId, effect: EffectId) -> EngineResult<bool> {
        Ok(self.entry(track)?.effect(effect)?.bypassed)
    }

    /// Effect ids of `track` in signal-chain order.
    pub fn effect_ids(&self, track: TrackId) -> EngineResult<Vec<EffectId>> {
        Ok(self.entry(track)?.effects.iter().map(|e| e.id).collect())
    }

    /// Clears delay lines and filter state of every effect on the track.
    pub fn reset_effects(&mut self, track: TrackId) -> EngineResult<()> {
        self.entry(track)?;
        self.send(Command::ResetEffects(track))
    }

    // ----- transport -----

    fn transport(&mut self, cmd: TransportCommand) -> EngineResult<()> {
        self.send(Command::Transport(cmd))
    }

    pub fn play(&mut self) -> EngineResult<()> {
        self.transport(TransportCommand::Play)
    }

    pub fn pause(&mut self) -> EngineResult<()> {
        self.transport(TransportCommand::Pause)
    }

    /// Stops and rewinds to zero at the next block boundary.
    pub fn stop(&mut self) -> EngineResult<()> {
        self.transport(TransportCommand::Stop)
    }

    pub fn record(&mut self) -> EngineResult<()> {
        self.transport(TransportCommand::Record)
    }

    pub fn set_position(&mut self, seconds: f64) -> EngineResult<()> {
        self.transport(TransportCommand::SetPosition(seconds))
    }

    pub fn set_bpm(&mut self, bpm: f64) -> EngineResult<()> {
        self.transport(TransportCommand::SetBpm(bpm))?;
        self.tempo = Tempo::new(bpm);
        Ok(())
    }

    pub fn set_time_signature(&mut self, numerator: u32, denominator: u32) -> EngineResult<()> {
        self.transport(TransportCommand::SetTimeSignature(numerator, denominator))?;
        self.signature = TimeSignature::new(numerator, denominator);
        Ok(())
    }

    pub fn set_loop_region(&mut self, start: f64, end: f64) -> EngineResult<()> {
        self.transport(TransportCommand::SetLoopRegion(start, end))
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) -> EngineResult<()> {
        self.transport(TransportCommand::SetLoopEnabled(enabled))
    }

    pub fn transport_state(&self) -> TransportState {
        self.status.transport().state()
    }

    /// Position published by the last rendered block.
    pub fn position(&self) -> f64 {
        self.status.transport().position()
    }

    pub fn loop_count(&self) -> u64 {
        self.status.transport().loop_count()
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.status.transport().blocks_rendered()
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.signature
    }

    pub fn musical_position(&self) -> MusicalPosition {
        time::musical_position(self.position(), self.tempo, self.signature, DEFAULT_PPQ)
    }

    // ----- master -----

    /// Master gain is clamped to `0..=2`.
    pub fn set_master_gain(&mut self, gain: f32) -> EngineResult<()> {
        let gain = if gain.is_finite() {
            gain.clamp(0.0, 2.0)
        } else {
            1.0
        };
        self.send(Command::SetMasterGain(gain))
    }

    pub fn master_gain(&self) -> f32 {
        self.status.master_gain()
    }

    pub fn master_levels(&self) -> Vec<ChannelLevels> {
        self.status.master_meter().snapshot()
    }

    pub fn master_peak(&self, channel: usize) -> f32 {
        self.status.master_meter().peak(channel)
    }

    pub fn master_rms(&self, channel: usize) -> f32 {
        self.status.master_meter().rms(channel)
    }

    pub fn set_metronome(&mut self, enabled: bool) -> EngineResult<()> {
        self.send(Command::SetMetronome(enabled))
    }

    pub fn metronome_enabled(&self) -> bool {
        self.status.metronome_enabled()
    }

    // ----- recording -----

    /// Armed tracks start writing into their recorders at the next block.
    pub fn start_recording(&mut self) -> EngineResult<()> {
        self.record()
    }

    pub fn stop_recording(&mut self) -> EngineResult<()> {
        self.stop()
    }

    /// Hands out the I/O-side end of the track's record ring. Each track has
    /// exactly one.
    pub fn take_recorder(&mut self, track: TrackId) -> EngineResult<RecordConsumer> {
        self.entry_mut(track)?
            .recorder
            .take()
            .ok_or(EngineError::RecorderTaken(track))
    }

    /// Takes the track's recorder and wraps it in a drain that flushes into
    /// `sink` in chunks of the configured flush size.
    pub fn record_drain<S: RecordSink>(
        &mut self,
        track: TrackId,
        sink: S,
    ) -> EngineResult<RecordDrain<S>> {
        let consumer = self.take_recorder(track)?;
        Ok(RecordDrain::new(
            consumer,
            sink,
            self.config.record_flush_frames,
        ))
    }
}

impl std::fmt::Debug for EngineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineController")
            .field("config", &self.config)
            .field("tracks", &self.tracks)
            .field("stale", &self.stale.len())
            .finish()
    }
}
