use std::f32::consts::TAU;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use cadenza_dsp::gain::linear_to_db;
use cadenza_engine::config::CONFIG_ENV;
use cadenza_engine::{
    engine, EffectRegistry, EngineConfig, RecordSink, SampleBuffer, SourceAudio,
};
use tracing_subscriber::EnvFilter;

/// Discards recorded audio, keeping only counters the report needs.
struct CountingSink {
    frames: Arc<AtomicU64>,
    peak: f32,
}

impl RecordSink for CountingSink {
    fn write_frames(
        &mut self,
        interleaved: &[f32],
        channels: usize,
        _sample_rate: f32,
    ) -> io::Result<()> {
        self.peak = interleaved
            .iter()
            .fold(self.peak, |peak, sample| peak.max(sample.abs()));
        self.frames
            .fetch_add((interleaved.len() / channels.max(1)) as u64, Ordering::Relaxed);
        Ok(())
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn sine(hz: f32, seconds: f32, config: &EngineConfig) -> SourceAudio {
    let frames = (seconds * config.sample_rate) as usize;
    let samples: Vec<f32> = (0..frames)
        .map(|i| (TAU * hz * i as f32 / config.sample_rate).sin() * 0.25)
        .collect();
    SourceAudio::from_channels(vec![samples; config.channels()], config.sample_rate)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let duration_secs = env_u64("SOAK_DURATION_SECONDS", 8 * 60 * 60);
    let report_secs = env_u64("SOAK_REPORT_SECONDS", 60);
    let log_path = std::env::var("SOAK_LOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("soak_render.log"));

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("loading {CONFIG_ENV}={}", PathBuf::from(&path).display()))?,
        None => EngineConfig::default(),
    };

    let (mut ctl, mut mix) = engine(config.clone(), EffectRegistry::with_builtins());
    let track = ctl.create_track("soak")?;
    let clip = ctl.add_clip(track, "tone", sine(220.0, 4.0, &config), 0.0)?;
    ctl.set_clip_looped(clip, true)?;
    ctl.resize_clip(clip, 60.0)?;
    ctl.add_effect(track, "delay")?;
    ctl.add_effect(track, "reverb")?;
    ctl.set_record_armed(track, true)?;
    ctl.set_loop_region(0.0, 60.0)?;
    ctl.set_loop_enabled(true)?;
    ctl.set_metronome(true)?;

    let recorded = Arc::new(AtomicU64::new(0));
    let dropped = Arc::new(AtomicU64::new(0));
    let running = Arc::new(AtomicBool::new(true));
    let mut drain = ctl.record_drain(
        track,
        CountingSink {
            frames: Arc::clone(&recorded),
            peak: 0.0,
        },
    )?;
    let drain_thread = {
        let dropped = Arc::clone(&dropped);
        let running = Arc::clone(&running);
        std::thread::Builder::new()
            .name("cadenza-record-drain".into())
            .spawn(move || -> io::Result<CountingSink> {
                while running.load(Ordering::Relaxed) {
                    drain.pump()?;
                    dropped.store(drain.dropped_frames(), Ordering::Relaxed);
                    std::thread::sleep(Duration::from_millis(10));
                }
                drain.finish()
            })
            .context("spawning drain thread")?
    };

    ctl.start_recording()?;

    let mut log = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;
    writeln!(
        log,
        "elapsed_s,blocks,late_blocks,max_block_us,recorded_frames,dropped_frames,master_peak"
    )?;

    let mut buffer = SampleBuffer::new(config.channels(), config.block_size, config.sample_rate);
    let block_period = Duration::from_secs_f64(config.block_duration());
    let report_interval = Duration::from_secs(report_secs.max(1));

    let start = Instant::now();
    let mut last_report = start;
    let mut blocks: u64 = 0;
    let mut late_blocks: u64 = 0;
    let mut max_block = Duration::ZERO;

    while start.elapsed() < Duration::from_secs(duration_secs) {
        let block_start = Instant::now();
        mix.render_into(&mut buffer);
        blocks += 1;

        let took = block_start.elapsed();
        max_block = max_block.max(took);
        match block_period.checked_sub(took) {
            Some(remaining) => std::thread::sleep(remaining),
            None => late_blocks += 1,
        }

        if last_report.elapsed() >= report_interval {
            ctl.collect_garbage();
            writeln!(
                log,
                "{:.3},{},{},{},{},{},{:.4}",
                start.elapsed().as_secs_f64(),
                blocks,
                late_blocks,
                max_block.as_micros(),
                recorded.load(Ordering::Relaxed),
                dropped.load(Ordering::Relaxed),
                ctl.master_peak(0),
            )?;
            log.flush()?;
            if late_blocks > 0 {
                tracing::warn!(late_blocks, "render blocks overran the block period");
            }
            tracing::debug!(
                blocks,
                master_peak_db = linear_to_db(ctl.master_peak(0)),
                "soak progress"
            );
            last_report = Instant::now();
        }
    }

    ctl.stop_recording()?;
    mix.render_into(&mut buffer);
    running.store(false, Ordering::Relaxed);
    let sink = drain_thread
        .join()
        .map_err(|_| anyhow::anyhow!("drain thread panicked"))?
        .context("draining recorder")?;

    writeln!(
        log,
        "{:.3},{},{},{},{},{},{:.4}",
        start.elapsed().as_secs_f64(),
        blocks,
        late_blocks,
        max_block.as_micros(),
        recorded.load(Ordering::Relaxed),
        dropped.load(Ordering::Relaxed),
        ctl.master_peak(0),
    )?;
    log.flush()?;

    println!(
        "render soak complete: duration={:.1}s blocks={} late={} recorded={} dropped={} record_peak={:.3}",
        start.elapsed().as_secs_f32(),
        blocks,
        late_blocks,
        recorded.load(Ordering::Relaxed),
        dropped.load(Ordering::Relaxed),
        sink.peak,
    );

    Ok(())
}
