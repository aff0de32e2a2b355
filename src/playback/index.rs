//! Sample lookup by index.
//!
//! Reads the sample at a signal-supplied frame index from a shared buffer,
//! rounding to the nearest frame.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::buffer::registry::{BufferBinding, BufferRegistry};
use crate::buffer::{acquire, BufferLease};
use crate::utils::param::Flag;
use crate::utils::zero;
use crate::{DspSetup, Perform};

/// Highest selectable channel, one-based.
pub const MAX_CHANNEL: i32 = 4;

/// Convert a one-based channel message to a zero-based channel.
///
/// Zero selects the first channel, anything else is clamped to
/// `1..=MAX_CHANNEL` first.
#[inline]
pub fn channel_index(channel: i32) -> usize {
    if channel == 0 {
        0
    } else {
        (channel.clamp(1, MAX_CHANNEL) - 1) as usize
    }
}

/// Control-thread side of an [`Index`].
#[derive(Debug)]
pub struct IndexParams {
    binding: BufferBinding,
    channel: AtomicUsize,
    disabled: Flag,
}

impl IndexParams {
    /// Bind to another buffer. Returns false if no buffer has that name.
    pub fn set_buffer(&self, name: &str, registry: &BufferRegistry) -> bool {
        self.binding.set(name, registry)
    }

    pub fn binding(&self) -> &BufferBinding {
        &self.binding
    }

    /// Select the channel to read, one-based.
    pub fn set_channel(&self, channel: i32) {
        self.channel.store(channel_index(channel), Ordering::Relaxed);
    }

    /// Selected channel, zero-based.
    pub fn channel(&self) -> usize {
        self.channel.load(Ordering::Relaxed)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }
}

#[derive(Debug)]
pub struct Index {
    params: Arc<IndexParams>,
    registry: Arc<BufferRegistry>,
}

impl Index {
    /// Create an object reading `channel` (one-based) of the buffer `name`.
    pub fn new(name: &str, channel: i32, registry: Arc<BufferRegistry>) -> Self {
        let params = IndexParams {
            binding: BufferBinding::new(name),
            channel: AtomicUsize::new(channel_index(channel)),
            disabled: Flag::new(false),
        };
        Self {
            params: Arc::new(params),
            registry,
        }
    }

    pub fn params(&self) -> Arc<IndexParams> {
        self.params.clone()
    }

    /// Process one block. Outputs silence without a valid buffer and leaves
    /// `out` untouched when disabled.
    pub fn process(&mut self, input: &[f32], out: &mut [f32]) {
        if self.params.disabled.get() {
            return;
        }
        let channel = self.params.channel();
        self.params
            .binding
            .with_buffer(|buffer| match acquire(buffer) {
                Ok(lease) => render(&lease, channel, input, out),
                Err(_) => zero(out),
            });
    }
}

#[inline]
fn render(lease: &BufferLease<'_>, channel: usize, input: &[f32], out: &mut [f32]) {
    let frames = lease.frames();
    if frames == 0 {
        zero(out);
        return;
    }
    let samples = lease.samples();
    let channels = lease.channels();
    let last = frames - 1;
    let channel = channel.min(channels - 1);

    for (in_sample, out_sample) in input.iter().zip(out.iter_mut()) {
        let index = ((*in_sample + 0.5).floor().max(0.0) as usize).min(last);
        *out_sample = samples[index * channels + channel];
    }
}

impl Perform for Index {
    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, _setup: &DspSetup) {
        self.params.binding.resolve(&self.registry);
    }

    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        if let (Some(input), Some(out)) = (inputs.first(), outputs.first_mut()) {
            self.process(input, out);
        }
    }
}
