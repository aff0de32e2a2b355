//! Kernels reading from shared sample buffers.

pub mod index;
pub mod wavetable;
