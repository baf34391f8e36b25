use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF32;
use cadenza_dsp::utils::{sanitize, NoDenormalsGuard};
use cadenza_dsp::SampleBuffer;
use ringbuf::{HeapConsumer, HeapProducer};

use crate::click::Metronome;
use crate::config::EngineConfig;
use crate::effects::{EffectId, EffectSlot};
use crate::meter::LevelMeter;
use crate::track::{Track, TrackId, TrackParams};
use crate::transport::{Transport, TransportStatus};

/// Transport requests. Applied at the start of the next block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    Play,
    Pause,
    Stop,
    Record,
    SetPosition(f64),
    SetBpm(f64),
    SetTimeSignature(u32, u32),
    SetLoopRegion(f64, f64),
    SetLoopEnabled(bool),
}

/// Commands written by the control thread and drained by the render thread.
#[derive(Debug)]
pub enum Command {
    AddTrack(Box<Track>),
    RemoveTrack(TrackId),
    AddEffect {
        track: TrackId,
        slot: EffectSlot,
    },
    RemoveEffect {
        track: TrackId,
        effect: EffectId,
    },
    MoveEffect {
        track: TrackId,
        effect: EffectId,
        index: usize,
    },
    SetEffectBypass {
        track: TrackId,
        effect: EffectId,
        bypassed: bool,
    },
    SetEffectParameter {
        track: TrackId,
        effect: EffectId,
        name: &'static str,
        value: f32,
    },
    ResetEffects(TrackId),
    Transport(TransportCommand),
    SetMasterGain(f32),
    SetMetronome(bool),
}

/// Objects leaving the render graph. Sent back so their memory is freed on
/// the control thread.
#[derive(Debug)]
pub enum Retired {
    Track(Box<Track>),
    Effect(EffectSlot),
}

pub type CommandTx = HeapProducer<Command>;
pub type CommandRx = HeapConsumer<Command>;
pub type RetireTx = HeapProducer<Retired>;
pub type RetireRx = HeapConsumer<Retired>;

/// Render-thread state published for the control side once per block.
#[derive(Debug)]
pub struct EngineStatus {
    transport: TransportStatus,
    master: LevelMeter,
    master_gain: AtomicF32,
    metronome: AtomicBool,
    blocks_started: AtomicU64,
}

impl EngineStatus {
    pub fn new(channels: usize, master_gain: f32) -> Self {
        Self {
            transport: TransportStatus::default(),
            master: LevelMeter::new(channels),
            master_gain: AtomicF32::new(master_gain),
            metronome: AtomicBool::new(false),
            blocks_started: AtomicU64::new(0),
        }
    }

    pub fn transport(&self) -> &TransportStatus {
        &self.transport
    }

    pub fn master_meter(&self) -> &LevelMeter {
        &self.master
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain.load(Ordering::Relaxed)
    }

    pub fn metronome_enabled(&self) -> bool {
        self.metronome.load(Ordering::Relaxed)
    }

    /// Blocks the renderer has entered. Runs one ahead of
    /// [`TransportStatus::blocks_rendered`] while a block is in flight.
    pub fn blocks_started(&self) -> u64 {
        self.blocks_started.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_block_started(&self) {
        self.blocks_started.fetch_add(1, Ordering::SeqCst);
    }
}

/// Solo policy: with any track soloed only soloed tracks are heard (solo
/// wins over mute), otherwise every unmuted track is.
pub fn is_audible(params: &TrackParams, any_solo: bool) -> bool {
    if any_solo {
        params.soloed
    } else {
        !params.muted
    }
}

/// The render half of the engine. Lives on the audio thread; everything it
/// owns is touched only from [`MixEngine::render_into`].
pub struct MixEngine {
    sample_rate: f32,
    block_size: usize,
    max_tracks: usize,
    tracks: Vec<Box<Track>>,
    params: Vec<TrackParams>,
    transport: Transport,
    metronome: Metronome,
    master: SampleBuffer,
    master_gain: f32,
    rx: CommandRx,
    retire: RetireTx,
    status: Arc<EngineStatus>,
}

impl MixEngine {
    pub(crate) fn new(
        config: &EngineConfig,
        rx: CommandRx,
        retire: RetireTx,
        status: Arc<EngineStatus>,
    ) -> Self {
        let channels = config.channels();
        Self {
            sample_rate: config.sample_rate,
            block_size: config.block_size,
            max_tracks: config.max_tracks,
            tracks: Vec::with_capacity(config.max_tracks),
            params: Vec::with_capacity(config.max_tracks),
            transport: Transport::new(),
            metronome: Metronome::default(),
            master: SampleBuffer::new(channels, config.block_size, config.sample_rate),
            master_gain: config.master_gain,
            rx,
            retire,
            status,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn channels(&self) -> usize {
        self.master.channel_count()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn status(&self) -> &Arc<EngineStatus> {
        &self.status
    }

    /// Renders one block of `block_size` frames into `output`.
    pub fn render_into(&mut self, output: &mut SampleBuffer) {
        self.render_block(None, output);
    }

    /// Like [`render_into`](Self::render_into) but armed tracks record
    /// `input` instead of their own output while the transport records.
    pub fn render_with_input(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) {
        self.render_block(Some(input), output);
    }

    /// Drains pending control commands. Called at the top of every block.
    pub fn begin_block(&mut self) {
        while let Some(cmd) = self.rx.pop() {
            self.apply_cmd(cmd);
        }
    }

    fn render_block(&mut self, input: Option<&SampleBuffer>, output: &mut SampleBuffer) {
        let _denormals = NoDenormalsGuard::new();
        self.status.mark_block_started();
        self.begin_block();

        let sample_rate = self.sample_rate;
        let window_start = self.transport.position();
        let window_end = window_start + self.block_size as f64 / sample_rate as f64;
        let playing = self.transport.is_playing();
        let recording = self.transport.is_recording();

        self.params.clear();
        self.params
            .extend(self.tracks.iter().map(|track| track.params()));
        let any_solo = self.params.iter().any(|params| params.soloed);

        self.master.clear();
        for (track, params) in self.tracks.iter_mut().zip(self.params.iter()) {
            track.render(params, window_start, window_end, sample_rate, playing);
            if is_audible(params, any_solo) {
                self.master.add_from(track.output(), 1.0, 0);
            }
            if recording && params.record_armed {
                track.record(input);
            }
        }

        self.master.apply_gain(self.master_gain);
        if playing {
            self.metronome
                .render(&mut self.master, &self.transport, window_start, sample_rate);
        }
        for channel in self.master.channels_mut() {
            sanitize(channel);
        }
        self.status.master.update(&self.master);

        output.clear();
        output.copy_from(&self.master);

        if self.transport.advance_position(self.block_size, sample_rate) {
            self.metronome.reset();
        }
        self.status.transport.publish(&self.transport);
    }

    fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| track.id() == id)
            .map(|track| track.as_mut())
    }

    fn retire(&mut self, item: Retired) {
        // A full retire queue means the controller stopped collecting; the
        // item is then dropped here.
        let _ = self.retire.push(item);
    }

    fn apply_cmd(&mut self, cmd: Command) {
        match cmd {
            Command::AddTrack(track) => {
                if self.tracks.len() < self.max_tracks {
                    self.tracks.push(track);
                } else {
                    self.retire(Retired::Track(track));
                }
            }
            Command::RemoveTrack(id) => {
                if let Some(index) = self.tracks.iter().position(|track| track.id() == id) {
                    let track = self.tracks.remove(index);
                    self.retire(Retired::Track(track));
                }
            }
            Command::AddEffect { track, slot } => {
                let rejected = match self.track_mut(track) {
                    Some(track) => track.effects_mut().push(slot).err(),
                    None => Some(slot),
                };
                if let Some(slot) = rejected {
                    self.retire(Retired::Effect(slot));
                }
            }
            Command::RemoveEffect { track, effect } => {
                let removed = self
                    .track_mut(track)
                    .and_then(|track| track.effects_mut().remove(effect));
                if let Some(slot) = removed {
                    self.retire(Retired::Effect(slot));
                }
            }
            Command::MoveEffect {
                track,
                effect,
                index,
            } => {
                if let Some(track) = self.track_mut(track) {
                    track.effects_mut().move_to(effect, index);
                }
            }
            Command::SetEffectBypass {
                track,
                effect,
                bypassed,
            } => {
                if let Some(slot) = self
                    .track_mut(track)
                    .and_then(|track| track.effects_mut().get_mut(effect))
                {
                    slot.bypassed = bypassed;
                }
            }
            Command::SetEffectParameter {
                track,
                effect,
                name,
                value,
            } => {
                if let Some(slot) = self
                    .track_mut(track)
                    .and_then(|track| track.effects_mut().get_mut(effect))
                {
                    slot.processor_mut().set_parameter(name, value);
                }
            }
            Command::ResetEffects(track) => {
                if let Some(track) = self.track_mut(track) {
                    track.effects_mut().reset();
                }
            }
            Command::Transport(cmd) => self.apply_transport(cmd),
            Command::SetMasterGain(gain) => {
                self.master_gain = gain;
                self.status.master_gain.store(gain, Ordering::Relaxed);
            }
            Command::SetMetronome(enabled) => {
                self.metronome.set_enabled(enabled);
                self.status.metronome.store(enabled, Ordering::Relaxed);
            }
        }
    }

    fn apply_transport(&mut self, cmd: TransportCommand) {
        let transport = &mut self.transport;
        match cmd {
            TransportCommand::Play => {
                transport.play();
            }
            TransportCommand::Pause => {
                transport.pause();
            }
            TransportCommand::Stop => {
                transport.stop();
                self.metronome.reset();
            }
            TransportCommand::Record => {
                transport.record();
            }
            TransportCommand::SetPosition(seconds) => {
                transport.set_position(seconds);
                self.metronome.reset();
            }
            TransportCommand::SetBpm(bpm) => transport.set_bpm(bpm),
            TransportCommand::SetTimeSignature(numerator, denominator) => {
                transport.set_time_signature(numerator, denominator)
            }
            TransportCommand::SetLoopRegion(start, end) => transport.set_loop_region(start, end),
            TransportCommand::SetLoopEnabled(enabled) => transport.set_loop_enabled(enabled),
        }
    }
}

impl std::fmt::Debug for MixEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixEngine")
            .field("sample_rate", &self.sample_rate)
            .field("block_size", &self.block_size)
            .field("tracks", &self.tracks.len())
            .field("transport", &self.transport.state())
            .finish()
    }
}
