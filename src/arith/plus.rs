//! Signal addition.

use super::{Arith, Operator};

#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl Operator for Add {
    const NAME: &'static str = "plus";
    const SCALAR_INLET: usize = 0;

    #[inline(always)]
    fn apply(a: f32, b: f32) -> f32 {
        a + b
    }
}

/// `out = a + b`, or `out = value + a` with a single signal.
pub type Plus = Arith<Add>;
