//! Elementwise binary operators on signals.
//!
//! Each operator has two inlets. When both carry signals the dual-signal
//! kernel combines them sample by sample. When one of them has no signal the
//! scalar kernel combines the live inlet with the last float received. The
//! choice is made once in `prepare`.

pub mod plus;
pub mod times;

use alloc::sync::Arc;
use core::marker::PhantomData;

use crate::utils::param::{Flag, Param};
use crate::{DspSetup, Perform};

pub use plus::{Add, Plus};
pub use times::{Multiply, Times};

/// A binary operation on samples.
pub trait Operator {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// Inlet checked first for a missing signal when picking the kernel.
    /// Only matters when neither inlet carries a signal.
    const SCALAR_INLET: usize;

    fn apply(a: f32, b: f32) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithKernel {
    /// `scalar op inputs[signal]`
    Scalar { signal: usize, unrolled: bool },
    /// `inputs[0] op inputs[1]`
    Dual { unrolled: bool },
}

impl ArithKernel {
    /// Pick the kernel of operator `O` for a configuration.
    pub fn select<O: Operator>(setup: &DspSetup) -> Self {
        let unrolled = setup.can_unroll();
        let first = O::SCALAR_INLET.min(1);
        let second = 1 - first;
        if !setup.is_connected(first) {
            Self::Scalar {
                signal: second,
                unrolled,
            }
        } else if !setup.is_connected(second) {
            Self::Scalar {
                signal: first,
                unrolled,
            }
        } else {
            Self::Dual { unrolled }
        }
    }
}

/// Control-thread side of an [`Arith`] object.
#[derive(Debug)]
pub struct ArithParams {
    value: Param,
    disabled: Flag,
}

impl ArithParams {
    /// Set the scalar operand, used for whichever inlet has no signal.
    pub fn set_value(&self, value: f32) {
        self.value.set(value);
    }

    pub fn value(&self) -> f32 {
        self.value.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }
}

#[derive(Debug)]
pub struct Arith<O: Operator> {
    params: Arc<ArithParams>,
    kernel: Option<ArithKernel>,
    _operator: PhantomData<O>,
}

impl<O: Operator> Arith<O> {
    pub fn new(value: f32) -> Self {
        Self {
            params: Arc::new(ArithParams {
                value: Param::new(value),
                disabled: Flag::new(false),
            }),
            kernel: None,
            _operator: PhantomData,
        }
    }

    pub fn params(&self) -> Arc<ArithParams> {
        self.params.clone()
    }

    pub fn kernel(&self) -> Option<ArithKernel> {
        self.kernel
    }

    /// Combine `scalar` with every sample of `input`.
    #[inline]
    pub fn process_scalar(scalar: f32, input: &[f32], out: &mut [f32], unrolled: bool) {
        if unrolled && input.len() % 4 == 0 && out.len() % 4 == 0 {
            for (x, y) in input.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
                y[0] = O::apply(scalar, x[0]);
                y[1] = O::apply(scalar, x[1]);
                y[2] = O::apply(scalar, x[2]);
                y[3] = O::apply(scalar, x[3]);
            }
        } else {
            for (x, y) in input.iter().zip(out.iter_mut()) {
                *y = O::apply(scalar, *x);
            }
        }
    }

    /// Combine two signals sample by sample.
    #[inline]
    pub fn process_dual(a: &[f32], b: &[f32], out: &mut [f32], unrolled: bool) {
        if unrolled && a.len() % 4 == 0 && b.len() % 4 == 0 && out.len() % 4 == 0 {
            for ((x, z), y) in a
                .chunks_exact(4)
                .zip(b.chunks_exact(4))
                .zip(out.chunks_exact_mut(4))
            {
                y[0] = O::apply(x[0], z[0]);
                y[1] = O::apply(x[1], z[1]);
                y[2] = O::apply(x[2], z[2]);
                y[3] = O::apply(x[3], z[3]);
            }
        } else {
            for ((x, z), y) in a.iter().zip(b.iter()).zip(out.iter_mut()) {
                *y = O::apply(*x, *z);
            }
        }
    }

    /// Process one block with the kernel installed by `prepare`.
    ///
    /// `b` may be `None` when the scalar kernel reads inlet 0. When disabled
    /// or not prepared `out` is left untouched.
    pub fn process(&mut self, a: &[f32], b: Option<&[f32]>, out: &mut [f32]) {
        let Some(kernel) = self.kernel else {
            return;
        };
        if self.params.disabled.get() {
            return;
        }

        match kernel {
            ArithKernel::Scalar { signal, unrolled } => {
                let input = if signal == 0 { Some(a) } else { b };
                if let Some(input) = input {
                    Self::process_scalar(self.params.value(), input, out, unrolled);
                }
            }
            ArithKernel::Dual { unrolled } => {
                if let Some(b) = b {
                    Self::process_dual(a, b, out, unrolled);
                }
            }
        }
    }
}

impl<O: Operator> Perform for Arith<O> {
    fn num_inputs(&self) -> usize {
        2
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, setup: &DspSetup) {
        let kernel = ArithKernel::select::<O>(setup);
        log::debug!("{}: {kernel:?} kernel", O::NAME);
        self.kernel = Some(kernel);
    }

    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let (Some(a), Some(out)) = (inputs.first(), outputs.first_mut()) else {
            return;
        };
        self.process(a, inputs.get(1).copied(), out);
    }
}
