use cadenza_engine::transport::Transport;
use cadenza_engine::{
    engine, ChannelLayout, EffectRegistry, EngineConfig, SampleBuffer, TransportState,
};

const SR: f32 = 48_000.0;
const BLOCK: usize = 256;

fn setup() -> (cadenza_engine::EngineController, cadenza_engine::MixEngine) {
    engine(
        EngineConfig::new(SR, BLOCK, ChannelLayout::Stereo),
        EffectRegistry::with_builtins(),
    )
}

#[test]
fn loop_wraps_keeping_overshoot_at_any_rate() {
    for rate in [22_050.0f32, 44_100.0, 48_000.0, 96_000.0, 192_000.0] {
        let mut transport = Transport::new();
        transport.set_loop_region(2.0, 5.0);
        transport.set_loop_enabled(true);
        transport.set_position(4.9);
        transport.play();
        let frames = (0.2 * rate as f64).round() as usize;
        assert!(transport.advance_position(frames, rate));
        assert!(
            (transport.position() - 2.1).abs() < 1e-6,
            "rate {rate}: {}",
            transport.position()
        );
    }
}

#[test]
fn engine_loops_and_counts_loopbacks() {
    let (mut ctl, mut mix) = setup();
    ctl.set_loop_region(0.0, 0.1).unwrap();
    ctl.set_loop_enabled(true).unwrap();
    ctl.play().unwrap();

    let mut out = SampleBuffer::new(2, BLOCK, SR);
    for _ in 0..18 {
        mix.render_into(&mut out);
    }
    assert_eq!(ctl.loop_count(), 0);
    assert!((ctl.position() - 18.0 * BLOCK as f64 / SR as f64).abs() < 1e-9);

    mix.render_into(&mut out);
    assert_eq!(ctl.loop_count(), 1);
    let overshoot = 19.0 * BLOCK as f64 / SR as f64 - 0.1;
    assert!((ctl.position() - overshoot).abs() < 1e-9);
}

#[test]
fn stop_rewinds_and_pause_holds_position() {
    let (mut ctl, mut mix) = setup();
    let mut out = SampleBuffer::new(2, BLOCK, SR);
    ctl.play().unwrap();
    for _ in 0..4 {
        mix.render_into(&mut out);
    }
    let playing_at = ctl.position();
    assert!(playing_at > 0.0);

    ctl.pause().unwrap();
    mix.render_into(&mut out);
    mix.render_into(&mut out);
    assert_eq!(ctl.transport_state(), TransportState::Paused);
    assert_eq!(ctl.position(), playing_at);

    ctl.stop().unwrap();
    mix.render_into(&mut out);
    assert_eq!(ctl.transport_state(), TransportState::Stopped);
    assert_eq!(ctl.position(), 0.0);
}

#[test]
fn record_only_starts_from_stopped_or_paused() {
    let (mut ctl, mut mix) = setup();
    let mut out = SampleBuffer::new(2, BLOCK, SR);
    ctl.play().unwrap();
    ctl.record().unwrap();
    mix.render_into(&mut out);
    assert_eq!(ctl.transport_state(), TransportState::Playing);

    ctl.pause().unwrap();
    ctl.record().unwrap();
    mix.render_into(&mut out);
    assert_eq!(ctl.transport_state(), TransportState::Recording);
}

#[test]
fn metronome_clicks_where_the_beat_starts() {
    let (mut ctl, mut mix) = setup();
    ctl.set_bpm(120.0).unwrap();
    ctl.set_metronome(true).unwrap();
    ctl.play().unwrap();

    let mut out = SampleBuffer::new(2, BLOCK, SR);
    // Beat 1 lands at 0.5 s = frame 24_000, i.e. block 93 offset 192.
    for block in 0..93 {
        mix.render_into(&mut out);
        assert_eq!(out.peak_level(0), 0.0, "unexpected click in block {block}");
    }
    mix.render_into(&mut out);
    assert!(out.channel(0)[..192].iter().all(|s| *s == 0.0));
    assert!(out.channel(0)[193..].iter().any(|s| s.abs() > 0.01));
    assert!(ctl.metronome_enabled());
}

#[test]
fn musical_position_follows_tempo() {
    let (mut ctl, mut mix) = setup();
    ctl.set_bpm(120.0).unwrap();
    ctl.set_position(2.25).unwrap();
    let mut out = SampleBuffer::new(2, BLOCK, SR);
    mix.render_into(&mut out);

    // 2.25 s at 120 bpm is beat 4.5: second bar, first beat, half a beat in.
    let position = ctl.musical_position();
    assert_eq!(position.bar, 1);
    assert_eq!(position.beat, 0);
    assert_eq!(position.tick, 480);
}
