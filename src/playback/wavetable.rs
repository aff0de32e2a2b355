//! Simple wavetable playback.
//!
//! A position signal from 0 to 1 scans a window of a shared buffer. The window
//! is given in milliseconds at the buffer's own sample rate, either by float
//! messages or by signals on inlets 1 (start) and 2 (end). An end of 0 means
//! the whole table. Only the first channel of the buffer is played.

use alloc::sync::Arc;

use crate::buffer::registry::{BufferBinding, BufferRegistry};
use crate::buffer::{acquire, BufferLease};
use crate::utils::param::{Flag, Param};
use crate::utils::{first_sample, zero};
use crate::{DspSetup, Perform};

/// Region of a buffer in frames.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub begin: usize,
    pub len: usize,
}

impl Window {
    /// Compute the window for a range in milliseconds, clamped to the buffer.
    ///
    /// Returns an empty window for an empty buffer, otherwise the window holds
    /// at least one frame.
    pub fn new(start_ms: f32, end_ms: f32, frames: usize, samples_per_ms: f32) -> Self {
        if frames == 0 {
            return Self::default();
        }

        let mut begin = (start_ms * samples_per_ms) as usize;
        let mut len = if end_ms == 0.0 {
            frames
        } else {
            ((end_ms - start_ms) * samples_per_ms) as usize
        };

        if begin >= frames {
            begin = frames - 1;
        }
        if len >= frames - begin {
            len = frames - begin;
        }

        Self {
            begin,
            len: len.max(1),
        }
    }
}

/// Control-thread side of a [`Wavetable`].
#[derive(Debug)]
pub struct WavetableParams {
    binding: BufferBinding,
    start: Param,
    end: Param,
    disabled: Flag,
}

impl WavetableParams {
    /// Bind to the buffer `name` and reset the range. Negative values become 0.
    pub fn set(&self, name: &str, start_ms: f32, end_ms: f32, registry: &BufferRegistry) -> bool {
        self.start.set(start_ms.max(0.0));
        self.end.set(end_ms.max(0.0));
        self.binding.set(name, registry)
    }

    pub fn binding(&self) -> &BufferBinding {
        &self.binding
    }

    /// Set the start of the window. Moves the end along if it would fall
    /// before the new start.
    pub fn set_start(&self, start_ms: f32) {
        let start_ms = start_ms.max(0.0);
        if start_ms > self.end.get() {
            self.end.set(start_ms);
        }
        self.start.set(start_ms);
    }

    /// Set the end of the window. Moves the start along if it would fall
    /// after the new end.
    pub fn set_end(&self, end_ms: f32) {
        let end_ms = end_ms.max(0.0);
        if end_ms < self.start.get() {
            self.start.set(end_ms);
        }
        self.end.set(end_ms);
    }

    pub fn start(&self) -> f32 {
        self.start.get()
    }

    pub fn end(&self) -> f32 {
        self.end.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }
}

/// Identifies the buffer state a window was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    generation: u64,
    frames: usize,
    modtime: u64,
    start: u32,
    end: u32,
}

#[derive(Debug)]
pub struct Wavetable {
    params: Arc<WavetableParams>,
    registry: Arc<BufferRegistry>,
    start_connected: bool,
    end_connected: bool,
    geometry: Option<Geometry>,
    window: Window,
}

impl Wavetable {
    pub fn new(name: &str, start_ms: f32, end_ms: f32, registry: Arc<BufferRegistry>) -> Self {
        let params = WavetableParams {
            binding: BufferBinding::new(name),
            start: Param::new(start_ms.max(0.0)),
            end: Param::new(end_ms.max(0.0)),
            disabled: Flag::new(false),
        };
        Self {
            params: Arc::new(params),
            registry,
            start_connected: false,
            end_connected: false,
            geometry: None,
            window: Window::default(),
        }
    }

    pub fn params(&self) -> Arc<WavetableParams> {
        self.params.clone()
    }

    /// Window used for the last block.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Process one block.
    ///
    /// `start` and `end` are the range signals if the respective inlets are
    /// connected; only their first sample is used. Outputs silence without a
    /// valid buffer and leaves `out` untouched when disabled.
    pub fn process(
        &mut self,
        input: &[f32],
        start: Option<&[f32]>,
        end: Option<&[f32]>,
        out: &mut [f32],
    ) {
        if self.params.disabled.get() {
            return;
        }

        let start = first_sample(start.filter(|_| self.start_connected))
            .unwrap_or_else(|| self.params.start());
        let end = first_sample(end.filter(|_| self.end_connected))
            .unwrap_or_else(|| self.params.end());
        let (start, end) = order_range(start, end);

        let Self {
            params,
            geometry,
            window,
            ..
        } = self;
        let binding = &params.binding;
        binding.with_buffer(|buffer| match acquire(buffer) {
            Ok(lease) => {
                let generation = binding.generation();
                update_window(geometry, window, &lease, generation, start, end);
                render(&lease, *window, input, out);
            }
            Err(_) => zero(out),
        });
    }
}

/// Recompute `window` if the buffer or the range changed since it was cached.
#[inline]
fn update_window(
    geometry: &mut Option<Geometry>,
    window: &mut Window,
    lease: &BufferLease<'_>,
    generation: u64,
    start: f32,
    end: f32,
) {
    let current = Geometry {
        generation,
        frames: lease.frames(),
        modtime: lease.modtime(),
        start: start.to_bits(),
        end: end.to_bits(),
    };
    if *geometry != Some(current) {
        *window = Window::new(start, end, lease.frames(), lease.samples_per_ms());
        *geometry = Some(current);
    }
}

/// Clamp negative bounds to zero; a start past the end collapses the range
/// onto the start.
#[inline]
fn order_range(start: f32, end: f32) -> (f32, f32) {
    let start = start.max(0.0);
    let end = end.max(0.0);
    if start > end {
        (start, start)
    } else {
        (start, end)
    }
}

#[inline]
fn render(lease: &BufferLease<'_>, window: Window, input: &[f32], out: &mut [f32]) {
    if window.len == 0 {
        zero(out);
        return;
    }
    let samples = lease.samples();
    let channels = lease.channels();
    let len = window.len as f64;
    let last = window.len - 1;

    for (in_sample, out_sample) in input.iter().zip(out.iter_mut()) {
        let position = in_sample.max(0.0).min(1.0) as f64;
        let index = ((position * len) as usize).min(last);
        *out_sample = samples[(window.begin + index) * channels];
    }
}

impl Perform for Wavetable {
    fn num_inputs(&self) -> usize {
        3
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, setup: &DspSetup) {
        self.params.binding.resolve(&self.registry);
        self.start_connected = setup.is_connected(1);
        self.end_connected = setup.is_connected(2);
        self.geometry = None;
    }

    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let (Some(input), Some(out)) = (inputs.first(), outputs.first_mut()) else {
            return;
        };
        self.process(input, inputs.get(1).copied(), inputs.get(2).copied(), out);
    }
}
