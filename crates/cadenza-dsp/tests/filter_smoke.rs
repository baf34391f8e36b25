use cadenza_dsp::{AllpassFilter, CombFilter, DelayLine, OnePole};
use rand::Rng;

#[test]
fn one_pole_stays_bounded_on_noise() {
    let mut rng = rand::thread_rng();
    let mut filter = OnePole::lowpass(48_000.0, 1_000.0, 0.707);
    for _ in 0..48_000 {
        let y = filter.process(rng.gen_range(-1.0..1.0));
        assert!(y.is_finite());
        assert!(y.abs() <= 1.0 + 1e-6);
    }
}

#[test]
fn diffuser_chain_is_finite() {
    let mut combs: Vec<CombFilter> = [1557, 1617, 1491, 1422]
        .iter()
        .map(|&n| CombFilter::new(n))
        .collect();
    for comb in &mut combs {
        comb.set_feedback(0.84);
        comb.set_damp(0.2);
    }
    let mut allpasses: Vec<AllpassFilter> =
        [225, 556].iter().map(|&n| AllpassFilter::new(n)).collect();
    let mut y = 0.0;
    for i in 0..200_000 {
        let x = if i == 0 { 1.0 } else { 0.0 };
        let mut sum: f32 = combs.iter_mut().map(|c| c.process(x)).sum();
        for allpass in &mut allpasses {
            sum = allpass.process(sum);
        }
        y = sum;
        assert!(y.is_finite());
    }
    assert!(y.abs() < 1e-3);
}

#[test]
fn delay_line_reproduces_input_after_delay() {
    let mut line = DelayLine::with_seconds(1_000.0, 0.1);
    let input: Vec<f32> = (0..200).map(|i| (i as f32 * 0.1).sin()).collect();
    let mut output = Vec::with_capacity(input.len());
    for &x in &input {
        line.write(x);
        output.push(line.read(50));
    }
    for i in 50..200 {
        assert!((output[i] - input[i - 49]).abs() < 1e-6);
    }
}
