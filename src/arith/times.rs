//! Signal multiplication.

use super::{Arith, Operator};

#[cfg(feature = "flush-denormals")]
use crate::utils::fix_denormal;

#[derive(Debug, Clone, Copy, Default)]
pub struct Multiply;

impl Operator for Multiply {
    const NAME: &'static str = "times";
    const SCALAR_INLET: usize = 1;

    /// Denormal and NaN products are flushed to zero when the
    /// `flush-denormals` feature is enabled.
    #[inline(always)]
    fn apply(a: f32, b: f32) -> f32 {
        #[cfg(feature = "flush-denormals")]
        {
            fix_denormal(a * b)
        }
        #[cfg(not(feature = "flush-denormals"))]
        {
            a * b
        }
    }
}

/// `out = a * b`, or `out = value * a` with a single signal.
pub type Times = Arith<Multiply>;
