//! Lock-free recording path between the render thread and file I/O.
//!
//! The render thread force-pushes whole frames into a bounded
//! [`ArrayQueue`]; the I/O thread pops them. The writer never waits: once
//! the queue is full every push evicts the oldest frame, which is counted
//! as dropped.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cadenza_dsp::SampleBuffer;
use crossbeam_queue::ArrayQueue;

/// Widest frame the recorder stores. Matches the widest [`ChannelLayout`].
///
/// [`ChannelLayout`]: crate::config::ChannelLayout
pub const MAX_RECORD_CHANNELS: usize = 2;

type Frame = [f32; MAX_RECORD_CHANNELS];

#[derive(Debug)]
struct RingShared {
    queue: ArrayQueue<Frame>,
    channels: usize,
    sample_rate: f32,
    dropped: AtomicU64,
}

/// Creates a ring holding `capacity_frames` frames of `channels` channels
/// (clamped to `1..=MAX_RECORD_CHANNELS`).
pub fn record_ring(
    capacity_frames: usize,
    channels: usize,
    sample_rate: f32,
) -> (RecordProducer, RecordConsumer) {
    let shared = Arc::new(RingShared {
        queue: ArrayQueue::new(capacity_frames.max(1)),
        channels: channels.clamp(1, MAX_RECORD_CHANNELS),
        sample_rate,
        dropped: AtomicU64::new(0),
    });
    (
        RecordProducer {
            shared: Arc::clone(&shared),
        },
        RecordConsumer { shared },
    )
}

/// Render-side half. Writing never blocks and never allocates.
#[derive(Debug)]
pub struct RecordProducer {
    shared: Arc<RingShared>,
}

impl RecordProducer {
    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    fn write_with<F>(&mut self, frames: usize, mut sample: F)
    where
        F: FnMut(usize, usize) -> f32,
    {
        let shared = &*self.shared;
        let mut evicted = 0u64;
        for frame in 0..frames {
            let mut value: Frame = [0.0; MAX_RECORD_CHANNELS];
            for (channel, slot) in value.iter_mut().take(shared.channels).enumerate() {
                *slot = sample(frame, channel);
            }
            if shared.queue.force_push(value).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            shared.dropped.fetch_add(evicted, Ordering::Relaxed);
        }
    }

    /// Appends every frame of `buffer`. Missing channels are written as
    /// silence, extra channels are ignored.
    pub fn write_planar(&mut self, buffer: &SampleBuffer) {
        self.write_with(buffer.frame_count(), |frame, channel| {
            buffer.sample(channel, frame)
        });
    }

    /// Appends `frames` interleaved frames laid out with this ring's channel
    /// count. A short slice is truncated to whole frames.
    pub fn write_interleaved(&mut self, samples: &[f32], frames: usize) {
        let channels = self.shared.channels;
        let frames = frames.min(samples.len() / channels);
        self.write_with(frames, |frame, channel| samples[frame * channels + channel]);
    }
}

/// I/O-side half.
#[derive(Debug)]
pub struct RecordConsumer {
    shared: Arc<RingShared>,
}

impl RecordConsumer {
    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn sample_rate(&self) -> f32 {
        self.shared.sample_rate
    }

    /// Frames ready to read, saturating at capacity.
    pub fn available_frames(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Copies up to `max_frames` interleaved frames into `dest` and returns
    /// how many were read.
    pub fn read(&mut self, dest: &mut [f32], max_frames: usize) -> usize {
        let channels = self.shared.channels;
        let max_frames = max_frames.min(dest.len() / channels);
        let mut count = 0;
        for out in dest.chunks_exact_mut(channels).take(max_frames) {
            let Some(frame) = self.shared.queue.pop() else {
                break;
            };
            out.copy_from_slice(&frame[..channels]);
            count += 1;
        }
        count
    }

    /// Drops everything currently buffered.
    pub fn skip_all(&mut self) -> usize {
        let pending = self.shared.queue.len();
        (0..pending)
            .take_while(|_| self.shared.queue.pop().is_some())
            .count()
    }
}

/// Destination for recorded audio, typically a file writer.
pub trait RecordSink {
    fn write_frames(
        &mut self,
        interleaved: &[f32],
        channels: usize,
        sample_rate: f32,
    ) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<f32> {
    fn write_frames(
        &mut self,
        interleaved: &[f32],
        _channels: usize,
        _sample_rate: f32,
    ) -> io::Result<()> {
        self.extend_from_slice(interleaved);
        Ok(())
    }
}

/// Moves recorded frames from a consumer into a sink in flush-sized chunks.
pub struct RecordDrain<S: RecordSink> {
    consumer: RecordConsumer,
    sink: S,
    scratch: Vec<f32>,
    flush_frames: usize,
    seen_dropped: u64,
    frames_written: u64,
}

impl<S: RecordSink> RecordDrain<S> {
    pub fn new(consumer: RecordConsumer, sink: S, flush_frames: usize) -> Self {
        let flush_frames = flush_frames.clamp(1, consumer.capacity());
        let scratch = vec![0.0; flush_frames * consumer.channels()];
        Self {
            consumer,
            sink,
            scratch,
            flush_frames,
            seen_dropped: 0,
            frames_written: 0,
        }
    }

    pub fn flush_frames(&self) -> usize {
        self.flush_frames
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn dropped_frames(&self) -> u64 {
        self.consumer.dropped_frames()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Flushes whole chunks while at least `flush_frames` are waiting.
    /// Returns the number of frames handed to the sink.
    pub fn pump(&mut self) -> io::Result<usize> {
        let mut total = 0;
        while self.consumer.available_frames() >= self.flush_frames {
            let read = self.transfer()?;
            if read == 0 {
                break;
            }
            total += read;
        }
        Ok(total)
    }

    /// Drains whatever is left, finalizes the sink and hands it back.
    pub fn finish(mut self) -> io::Result<S> {
        while self.consumer.available_frames() > 0 {
            if self.transfer()? == 0 {
                break;
            }
        }
        self.sink.finish()?;
        tracing::debug!(
            frames = self.frames_written,
            dropped = self.consumer.dropped_frames(),
            "recording drained"
        );
        Ok(self.sink)
    }

    fn transfer(&mut self) -> io::Result<usize> {
        let channels = self.consumer.channels();
        let read = self.consumer.read(&mut self.scratch, self.flush_frames);
        self.report_drops();
        if read > 0 {
            self.sink.write_frames(
                &self.scratch[..read * channels],
                channels,
                self.consumer.sample_rate(),
            )?;
            self.frames_written += read as u64;
        }
        Ok(read)
    }

    fn report_drops(&mut self) {
        let dropped = self.consumer.dropped_frames();
        if dropped > self.seen_dropped {
            tracing::warn!(
                lost = dropped - self.seen_dropped,
                total = dropped,
                "recorder overflow, oldest frames dropped"
            );
            self.seen_dropped = dropped;
        }
    }
}
