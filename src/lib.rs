#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod arith;
pub mod buffer;
pub mod filter;
pub mod meter;
pub mod playback;
pub mod stress;
pub mod utils;

/// Maximum number of signal inlets any object in this crate declares.
pub const MAX_INLETS: usize = 4;

/// Audio configuration handed to [`Perform::prepare`] whenever the host
/// (re)compiles its signal chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DspSetup {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Number of samples per block; constant until the next prepare call
    pub block_size: usize,
    /// Which signal inlets carry a live per-sample signal
    pub connected: [bool; MAX_INLETS],
    /// Host allows accelerated kernel variants
    pub vectorize: bool,
}

impl DspSetup {
    /// Create a setup with every inlet connected and acceleration disabled.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            connected: [true; MAX_INLETS],
            vectorize: false,
        }
    }

    pub fn with_connected(mut self, inlet: usize, connected: bool) -> Self {
        if let Some(slot) = self.connected.get_mut(inlet) {
            *slot = connected;
        }
        self
    }

    pub fn with_vectorize(mut self, vectorize: bool) -> Self {
        self.vectorize = vectorize;
        self
    }

    /// Returns true if a signal is connected to `inlet`.
    #[inline]
    pub fn is_connected(&self, inlet: usize) -> bool {
        self.connected.get(inlet).copied().unwrap_or(false)
    }

    /// Duration of one block in milliseconds.
    #[inline]
    pub fn block_duration_ms(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64 * 1000.0
    }

    /// Number of samples per millisecond.
    #[inline]
    pub fn samples_per_ms(&self) -> f32 {
        self.sample_rate * 0.001
    }

    /// Returns true if a 4-way unrolled kernel may be installed.
    #[inline]
    pub fn can_unroll(&self) -> bool {
        self.vectorize && self.block_size >= 4 && self.block_size % 4 == 0
    }
}

/// A signal object driven by the host's DSP scheduler.
///
/// `prepare` runs on the control side whenever the audio configuration
/// changes and installs a kernel variant. `perform` runs once per block on the
/// audio thread and must not block or allocate. Slices in `inputs` map to the
/// object's signal inlets in order, `outputs` to its signal outlets.
pub trait Perform {
    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    fn prepare(&mut self, setup: &DspSetup);

    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]);
}
