//! Helpers shared by the signal objects.

pub mod parameter_interpolator;
pub mod param;

const EXPONENT_MASK: u32 = 0x7f80_0000;

/// Returns true if `x` is denormalized, NaN or infinite.
///
/// Zero is not flagged.
#[inline]
pub fn is_denormal_or_nan(x: f32) -> bool {
    let exponent = x.to_bits() & EXPONENT_MASK;
    (exponent == 0 && x != 0.0) || exponent == EXPONENT_MASK
}

/// Replaces denormalized and non-finite values with zero.
#[inline]
pub fn fix_denormal(x: f32) -> f32 {
    if is_denormal_or_nan(x) {
        0.0
    } else {
        x
    }
}

/// Fills `out` with silence.
#[inline]
pub fn zero(out: &mut [f32]) {
    out.fill(0.0);
}

/// Returns the first sample of a control signal, if the inlet has one.
#[inline]
pub fn first_sample(signal: Option<&[f32]>) -> Option<f32> {
    signal.and_then(|s| s.first().copied())
}
