use cadenza_dsp::{gain::db_to_linear, SampleBuffer};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;

fn noise(channels: usize, frames: usize) -> SampleBuffer {
    let mut rng = rand::thread_rng();
    let data = (0..channels)
        .map(|_| (0..frames).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    SampleBuffer::from_channels(data, 48_000.0)
}

fn bench_mix(c: &mut Criterion) {
    let sources: Vec<SampleBuffer> = (0..16).map(|_| noise(2, 512)).collect();
    let mut bus = SampleBuffer::new(2, 512, 48_000.0);
    let gain = db_to_linear(-3.0);
    c.bench_function("add_from 16x2x512", |b| {
        b.iter(|| {
            bus.clear();
            for source in &sources {
                bus.add_from(source, gain, 0);
            }
        })
    });

    let mut block = noise(2, 512);
    c.bench_function("gain ramp 2x512", |b| {
        b.iter(|| block.apply_gain_ramp(0.5, 1.0))
    });

    let meter = noise(2, 512);
    c.bench_function("peak+rms 2x512", |b| {
        b.iter(|| (meter.peak_level(0), meter.rms_level(1)))
    });
}

criterion_group!(benches, bench_mix);
criterion_main!(benches);
