//! Lock-free read access to externally owned sample buffers.
//!
//! A [`SharedBuffer`] belongs to some named entity outside the signal objects.
//! Readers take a transient [`BufferLease`] once per block. Leasing bumps an
//! advisory in-use counter and never blocks; the owner marks the buffer invalid
//! and waits for the counter to drain before it touches the samples (see
//! [`SharedBuffer::edit`]). A lease is released when it is dropped, so every
//! exit path of a kernel releases exactly once.

pub mod registry;

use alloc::vec;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use spin::{Mutex, MutexGuard};
use thiserror::Error;

/// Reasons a lease could not be granted. Callers output silence for the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LeaseError {
    #[error("no buffer bound")]
    NotFound,
    #[error("buffer is being modified")]
    Invalid,
}

/// Shape and contents of a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferData {
    samples: Vec<f32>,
    frames: usize,
    channels: usize,
    sample_rate: f32,
}

impl BufferData {
    /// Interleaved samples, `frames * channels` long.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Native sample rate of the buffer contents in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Changes the shape of the buffer. New samples are silent.
    pub fn resize(&mut self, frames: usize, channels: usize) {
        let channels = channels.max(1);
        self.samples.resize(frames * channels, 0.0);
        self.frames = frames;
        self.channels = channels;
    }

    /// Replaces the contents with `samples` interleaved over `channels`.
    /// Trailing samples that do not fill a frame are dropped.
    pub fn replace(&mut self, mut samples: Vec<f32>, channels: usize) {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        samples.truncate(frames * channels);
        self.samples = samples;
        self.frames = frames;
        self.channels = channels;
    }
}

/// An externally owned, resizable array of interleaved samples.
pub struct SharedBuffer {
    data: UnsafeCell<BufferData>,
    valid: AtomicBool,
    in_use: AtomicUsize,
    modtime: AtomicU64,
    acquisitions: AtomicU64,
    writer: Mutex<()>,
}

// SAFETY: `data` is only read through a `BufferLease`, which exists only while
// `in_use > 0` and `valid` was observed true after the increment. It is only
// written through an `EditGuard`, which exists only after `valid` was cleared
// and `in_use` was observed zero, with a single writer at a time enforced by
// `writer`. All accesses to `valid` and `in_use` are sequentially consistent,
// so a reader and the writer can never both pass their checks.
unsafe impl Sync for SharedBuffer {}

impl core::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("valid", &self.is_valid())
            .field("in_use", &self.in_use())
            .field("modtime", &self.modtime())
            .finish_non_exhaustive()
    }
}

impl SharedBuffer {
    /// Create a silent buffer.
    pub fn new(frames: usize, channels: usize, sample_rate: f32) -> Self {
        let channels = channels.max(1);
        Self::from_data(BufferData {
            samples: vec![0.0; frames * channels],
            frames,
            channels,
            sample_rate,
        })
    }

    /// Create a buffer from interleaved samples.
    pub fn from_samples(samples: Vec<f32>, channels: usize, sample_rate: f32) -> Self {
        let mut data = BufferData {
            samples: Vec::new(),
            frames: 0,
            channels: 1,
            sample_rate,
        };
        data.replace(samples, channels);
        Self::from_data(data)
    }

    fn from_data(data: BufferData) -> Self {
        Self {
            data: UnsafeCell::new(data),
            valid: AtomicBool::new(true),
            in_use: AtomicUsize::new(0),
            modtime: AtomicU64::new(0),
            acquisitions: AtomicU64::new(0),
            writer: Mutex::new(()),
        }
    }

    /// Take a read lease. Never blocks.
    #[inline]
    pub fn lease(&self) -> Result<BufferLease<'_>, LeaseError> {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        let count = UseCount::enter(self);

        if !self.valid.load(Ordering::SeqCst) {
            return Err(LeaseError::Invalid);
        }

        Ok(BufferLease {
            // SAFETY: see the `Sync` impl, the count is held and the buffer is valid.
            data: unsafe { &*self.data.get() },
            modtime: self.modtime.load(Ordering::Acquire),
            _count: count,
        })
    }

    /// Owner side: get exclusive access to the contents.
    ///
    /// Marks the buffer invalid, then waits until all outstanding leases are
    /// released. Readers arriving in the meantime see [`LeaseError::Invalid`].
    /// Must never be called from the audio thread.
    pub fn edit(&self) -> EditGuard<'_> {
        let writer = self.writer.lock();
        self.valid.store(false, Ordering::SeqCst);
        while self.in_use.load(Ordering::SeqCst) != 0 {
            core::hint::spin_loop();
        }
        EditGuard {
            buffer: self,
            _writer: writer,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    /// Number of leases currently held.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    /// Counter bumped every time an edit completes.
    #[inline]
    pub fn modtime(&self) -> u64 {
        self.modtime.load(Ordering::Acquire)
    }

    /// Total number of lease attempts, granted or not.
    #[inline]
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

/// Acquire a lease on an optional buffer handle.
#[inline]
pub fn acquire(buffer: Option<&SharedBuffer>) -> Result<BufferLease<'_>, LeaseError> {
    buffer.ok_or(LeaseError::NotFound)?.lease()
}

/// Holds one unit of a buffer's in-use counter.
struct UseCount<'a>(&'a SharedBuffer);

impl<'a> UseCount<'a> {
    #[inline]
    fn enter(buffer: &'a SharedBuffer) -> Self {
        buffer.in_use.fetch_add(1, Ordering::SeqCst);
        Self(buffer)
    }
}

impl Drop for UseCount<'_> {
    #[inline]
    fn drop(&mut self) {
        self.0.in_use.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A transient read-only view of a [`SharedBuffer`].
///
/// The shape fields are a stable snapshot for as long as the lease is held.
pub struct BufferLease<'a> {
    data: &'a BufferData,
    modtime: u64,
    _count: UseCount<'a>,
}

impl BufferLease<'_> {
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.data.samples
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.data.frames
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.data.channels
    }

    /// Samples per millisecond at the buffer's native rate.
    #[inline]
    pub fn samples_per_ms(&self) -> f32 {
        self.data.sample_rate * 0.001
    }

    #[inline]
    pub fn modtime(&self) -> u64 {
        self.modtime
    }

    /// Release the lease. Same as dropping it.
    #[inline]
    pub fn release(self) {}
}

impl core::fmt::Debug for BufferLease<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferLease")
            .field("frames", &self.frames())
            .field("channels", &self.channels())
            .field("modtime", &self.modtime)
            .finish()
    }
}

/// Exclusive write access to a [`SharedBuffer`], see [`SharedBuffer::edit`].
///
/// Dropping the guard bumps the modification counter and marks the buffer
/// valid again.
pub struct EditGuard<'a> {
    buffer: &'a SharedBuffer,
    _writer: MutexGuard<'a, ()>,
}

impl Deref for EditGuard<'_> {
    type Target = BufferData;

    fn deref(&self) -> &BufferData {
        // SAFETY: see the `Sync` impl of `SharedBuffer`.
        unsafe { &*self.buffer.data.get() }
    }
}

impl DerefMut for EditGuard<'_> {
    fn deref_mut(&mut self) -> &mut BufferData {
        // SAFETY: see the `Sync` impl of `SharedBuffer`.
        unsafe { &mut *self.buffer.data.get() }
    }
}

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        self.buffer.modtime.fetch_add(1, Ordering::Release);
        self.buffer.valid.store(true, Ordering::SeqCst);
    }
}
