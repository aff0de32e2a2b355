//! Control parameters shared between the control thread and the audio thread.
//!
//! Every parameter is an independent relaxed atomic. There are no compound
//! transactions: the audio thread reads each field once per block, so a reader
//! sees a consistent value per field at block granularity only. Two fields
//! written back to back by the control thread may be observed in different
//! blocks.

use atomic_float::AtomicF32;
use core::sync::atomic::{AtomicBool, Ordering};

/// A float parameter written at any time and read once per block.
#[derive(Debug, Default)]
pub struct Param(AtomicF32);

impl Param {
    pub const fn new(value: f32) -> Self {
        Self(AtomicF32::new(value))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value, Ordering::Relaxed);
    }
}

/// A boolean flag with the same block-granularity semantics as [`Param`].
#[derive(Debug, Default)]
pub struct Flag(AtomicBool);

impl Flag {
    pub const fn new(value: bool) -> Self {
        Self(AtomicBool::new(value))
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Clears the flag and returns its previous value.
    #[inline]
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}
