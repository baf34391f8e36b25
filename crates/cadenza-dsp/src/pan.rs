/// Constant-power pan law. `pan` is clamped to [-1, 1]; the returned
/// `(left, right)` gains satisfy `l² + r² = 1`.
#[inline]
pub fn constant_power(pan: f32) -> (f32, f32) {
    let angle = ((pan.clamp(-1.0, 1.0) + 1.0) * 0.5) * core::f32::consts::FRAC_PI_2;
    (angle.cos(), angle.sin())
}
