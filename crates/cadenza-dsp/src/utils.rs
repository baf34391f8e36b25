/// Sets flush-to-zero and denormals-are-zero for the lifetime of the guard
/// and restores the previous MXCSR state on drop.
#[cfg(all(feature = "no-denormals", target_arch = "x86_64"))]
pub struct NoDenormalsGuard {
    prev: u32,
}

#[cfg(all(feature = "no-denormals", target_arch = "x86_64"))]
impl NoDenormalsGuard {
    #[inline]
    pub fn new() -> Self {
        const DAZ_FTZ: u32 = 0x8040;
        #[allow(deprecated)]
        // SAFETY: reading and writing MXCSR only changes float rounding
        // behaviour of the current thread.
        let prev = unsafe {
            use core::arch::x86_64::{_mm_getcsr, _mm_setcsr};
            let prev = _mm_getcsr();
            _mm_setcsr(prev | DAZ_FTZ);
            prev
        };
        Self { prev }
    }
}

#[cfg(all(feature = "no-denormals", target_arch = "x86_64"))]
impl Drop for NoDenormalsGuard {
    fn drop(&mut self) {
        #[allow(deprecated)]
        // SAFETY: restores the value captured in `new`.
        unsafe {
            core::arch::x86_64::_mm_setcsr(self.prev);
        }
    }
}

#[cfg(not(all(feature = "no-denormals", target_arch = "x86_64")))]
#[derive(Clone, Copy, Debug)]
pub struct NoDenormalsGuard;

#[cfg(not(all(feature = "no-denormals", target_arch = "x86_64")))]
impl NoDenormalsGuard {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoDenormalsGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces values too small to matter with exact zero. Feedback paths call
/// this on their stored state so decaying tails never sit in the subnormal
/// range.
#[inline]
pub fn flush_tiny(value: f32) -> f32 {
    if value.abs() < 1.0e-20 {
        0.0
    } else {
        value
    }
}

/// Zeroes NaN and infinite samples in place. Returns true if anything was
/// replaced.
pub fn sanitize(samples: &mut [f32]) -> bool {
    let mut replaced = false;
    for sample in samples.iter_mut() {
        if !sample.is_finite() {
            *sample = 0.0;
            replaced = true;
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_tiny_zeroes_subnormal_state() {
        assert_eq!(flush_tiny(1.0e-30), 0.0);
        assert_eq!(flush_tiny(-1.0e-25), 0.0);
        assert_eq!(flush_tiny(0.25), 0.25);
    }

    #[test]
    fn sanitize_replaces_non_finite_samples() {
        let mut data = [0.5, f32::NAN, f32::INFINITY, -0.5];
        assert!(sanitize(&mut data));
        assert_eq!(data, [0.5, 0.0, 0.0, -0.5]);
        assert!(!sanitize(&mut data));
    }

    #[test]
    fn guard_can_be_nested() {
        let _outer = NoDenormalsGuard::new();
        let _inner = NoDenormalsGuard::new();
    }
}
