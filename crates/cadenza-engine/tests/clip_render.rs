use cadenza_engine::clips::overlaps;
use cadenza_engine::{Clip, ClipId, FadeCurve, SampleBuffer, SourceAudio};

const SR: f32 = 1_000.0;

fn ramp_source(frames: usize) -> SourceAudio {
    let samples: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32).collect();
    SourceAudio::from_channels(vec![samples.clone(), samples], SR)
}

fn render(clips: &[&Clip], start: f64, frames: usize) -> SampleBuffer {
    let mut out = SampleBuffer::new(2, frames, SR);
    let end = start + frames as f64 / SR as f64;
    for clip in clips {
        clip.render_into(&mut out, start, end, SR);
    }
    out
}

#[test]
fn split_halves_render_like_the_original() {
    let original = Clip::new(ClipId(1), "take", ramp_source(1_000), 0.25);
    let mut head = original.clone();
    let tail = head.split(0.8, ClipId(2)).unwrap();
    assert!(!overlaps(&head, &tail));

    let whole = render(&[&original], 0.0, 1_500);
    let pieces = render(&[&head, &tail], 0.0, 1_500);
    for frame in 0..1_500 {
        assert!(
            (whole.sample(0, frame) - pieces.sample(0, frame)).abs() < 1e-6,
            "frame {frame}"
        );
    }
}

#[test]
fn fades_shape_the_rendered_block() {
    let source = SourceAudio::from_channels(vec![vec![1.0; 1_000]], SR);
    let mut clip = Clip::new(ClipId(1), "pad", source, 0.0);
    clip.set_fade_in(0.1);
    clip.set_fade_out(0.2);

    let out = render(&[&clip], 0.0, 1_000);
    assert_eq!(out.sample(0, 0), 0.0);
    assert!((out.sample(0, 50) - 0.5).abs() < 1e-3);
    assert!((out.sample(0, 500) - 1.0).abs() < 1e-6);
    assert!((out.sample(0, 900) - 0.5).abs() < 1e-3);
    assert!(out.sample(0, 999) < 0.01);
    // Mono source into stereo output leaves the second channel alone.
    assert_eq!(out.peak_level(1), 0.0);
}

#[test]
fn equal_power_fade_is_louder_midway() {
    let source = SourceAudio::from_channels(vec![vec![1.0; 1_000]], SR);
    let mut linear = Clip::new(ClipId(1), "a", source.clone(), 0.0);
    linear.set_fade_in(0.4);
    let mut curved = linear.duplicate(ClipId(2));
    curved.set_fade_curve(FadeCurve::EqualPower);

    let a = render(&[&linear], 0.0, 1_000);
    let b = render(&[&curved], 0.0, 1_000);
    assert!(b.sample(0, 200) > a.sample(0, 200));
}

#[test]
fn looped_clip_wraps_inside_its_region() {
    let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let source = SourceAudio::from_channels(vec![samples], SR);
    let mut clip = Clip::new(ClipId(1), "loop", source, 0.0);
    clip.set_loop_points(0.05, 0.1);
    clip.set_looped(true);
    clip.resize(0.3);

    let out = render(&[&clip], 0.0, 300);
    assert_eq!(out.sample(0, 99), 99.0);
    assert_eq!(out.sample(0, 100), 50.0);
    assert_eq!(out.sample(0, 149), 99.0);
    assert_eq!(out.sample(0, 150), 50.0);
}

#[test]
fn unlooped_clip_goes_silent_past_source_end() {
    let source = SourceAudio::from_channels(vec![vec![1.0; 100]], SR);
    let mut clip = Clip::new(ClipId(1), "short", source, 0.0);
    clip.resize(0.3);
    let out = render(&[&clip], 0.0, 300);
    assert_eq!(out.sample(0, 99), 1.0);
    assert_eq!(out.sample(0, 100), 0.0);
}

#[test]
fn window_offsets_and_source_offset_align() {
    let mut clip = Clip::new(ClipId(1), "ramp", ramp_source(1_000), 1.0);
    clip.trim_start(0.25);
    assert_eq!(clip.start_time(), 1.25);
    assert_eq!(clip.source_offset(), 0.25);

    let out = render(&[&clip], 1.2, 100);
    assert_eq!(out.sample(0, 49), 0.0);
    assert!((out.sample(0, 50) - 0.25).abs() < 1e-6);
    assert!((out.sample(0, 60) - 0.26).abs() < 1e-6);
}

#[test]
fn clip_gain_and_mute_apply() {
    let source = SourceAudio::from_channels(vec![vec![0.5; 100]], SR);
    let mut clip = Clip::new(ClipId(1), "g", source, 0.0);
    clip.set_gain(2.0);
    assert_eq!(render(&[&clip], 0.0, 10).sample(0, 5), 1.0);
    clip.set_muted(true);
    assert_eq!(render(&[&clip], 0.0, 10).peak_level(0), 0.0);
}

#[test]
fn normalize_targets_source_peak() {
    let source = SourceAudio::from_channels(vec![vec![0.25; 100]], SR);
    let mut clip = Clip::new(ClipId(1), "n", source, 0.0);
    clip.normalize(1.0);
    assert!((clip.gain() - 4.0).abs() < 1e-6);
    assert_eq!(clip.source().peak(), 0.25);
}
