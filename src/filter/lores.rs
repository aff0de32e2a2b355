//! Resonant two-pole low-pass filter.
//!
//! Inlet 0 is the audio input, inlet 1 the cutoff frequency in Hz and inlet 2
//! the resonance (0..1). Frequency and resonance come from a float message or,
//! when a signal is connected, from the first sample of each block.

use alloc::sync::Arc;

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::utils::{first_sample, is_denormal_or_nan};
use crate::utils::param::{Flag, Param};
use crate::utils::parameter_interpolator::ParameterInterpolator;
use crate::{DspSetup, Perform};

/// Largest resonance used by the filter, the closest `f32` below 1.
pub const MAX_RESONANCE: f32 = 1.0 - f32::EPSILON / 2.0;

const RESONANCE_SCALE: f32 = 0.125;
const RESONANCE_GAIN: f32 = 0.882497;

/// Clamp a resonance value to `[0, MAX_RESONANCE]`.
#[inline]
pub fn clamp_resonance(resonance: f32) -> f32 {
    if resonance >= 1.0 {
        MAX_RESONANCE
    } else if resonance < 0.0 {
        0.0
    } else {
        resonance
    }
}

/// Pole radius for a given resonance.
#[inline]
pub fn resonance_term(resonance: f32) -> f32 {
    (resonance * RESONANCE_SCALE).exp() * RESONANCE_GAIN
}

/// Recursive coefficients of the filter.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub a1: f32,
    pub a2: f32,
}

impl Coefficients {
    #[inline]
    pub fn from_terms(resonance_term: f32, frequency_term: f32) -> Self {
        Self {
            a1: -2.0 * resonance_term * frequency_term,
            a2: resonance_term * resonance_term,
        }
    }

    /// Gain normalizing the filter to unity at DC.
    #[inline]
    pub fn scale(&self) -> f32 {
        1.0 + self.a1 + self.a2
    }
}

/// Control-thread side of a [`Lores`].
#[derive(Debug)]
pub struct LoresParams {
    frequency: Param,
    resonance: Param,
    disabled: Flag,
    clear: Flag,
}

impl LoresParams {
    pub fn set_frequency(&self, frequency: f32) {
        self.frequency.set(frequency);
    }

    /// Values of 1 and above are clamped just below 1.
    pub fn set_resonance(&self, resonance: f32) {
        let resonance = if resonance >= 1.0 {
            MAX_RESONANCE
        } else {
            resonance
        };
        self.resonance.set(resonance);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency.get()
    }

    pub fn resonance(&self) -> f32 {
        self.resonance.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    /// Zero the filter memory at the start of the next block.
    pub fn clear(&self) {
        self.clear.set(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoresState {
    /// Not prepared yet
    Idle,
    /// Prepared, no block processed since
    Armed,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoresKernel {
    /// One sample per iteration, any block size
    Scalar,
    /// Four samples per iteration
    Unrolled,
    /// Four samples per iteration with coefficients ramped across the block
    Smoothed,
}

#[derive(Debug)]
pub struct Lores {
    params: Arc<LoresParams>,
    smoothing: bool,
    kernel: Option<LoresKernel>,
    running: bool,

    two_pi_over_sr: f32,
    frequency_connected: bool,
    resonance_connected: bool,

    // Values the coefficients were last computed from.
    frequency: f32,
    resonance: f32,
    frequency_term: f32,
    resonance_term: f32,

    coefficients: Coefficients,
    previous: Coefficients,
    ym1: f32,
    ym2: f32,
}

impl Lores {
    pub fn new(frequency: f32, resonance: f32) -> Self {
        let params = LoresParams {
            frequency: Param::new(frequency),
            resonance: Param::new(0.0),
            disabled: Flag::new(false),
            clear: Flag::new(false),
        };
        params.set_resonance(resonance);

        Self {
            params: Arc::new(params),
            smoothing: false,
            kernel: None,
            running: false,
            two_pi_over_sr: 0.0,
            frequency_connected: false,
            resonance_connected: false,
            frequency: 0.0,
            resonance: 0.0,
            frequency_term: 0.0,
            resonance_term: 0.0,
            coefficients: Coefficients::default(),
            previous: Coefficients::default(),
            ym1: 0.0,
            ym2: 0.0,
        }
    }

    /// Ramp coefficients across each block when unrolled kernels are allowed.
    pub fn with_smoothing(mut self, smoothing: bool) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn params(&self) -> Arc<LoresParams> {
        self.params.clone()
    }

    pub fn state(&self) -> LoresState {
        match (self.kernel, self.running) {
            (None, _) => LoresState::Idle,
            (Some(_), false) => LoresState::Armed,
            (Some(_), true) => LoresState::Running,
        }
    }

    pub fn kernel(&self) -> Option<LoresKernel> {
        self.kernel
    }

    pub fn coefficients(&self) -> Coefficients {
        self.coefficients
    }

    /// Coefficients the smoothed kernel ramps from in the next block.
    pub fn previous_coefficients(&self) -> Coefficients {
        self.previous
    }

    /// Zero the filter memory.
    pub fn clear(&mut self) {
        self.ym1 = 0.0;
        self.ym2 = 0.0;
    }

    /// Recompute the coefficients from the current parameters.
    fn calc(&mut self) {
        self.frequency = self.params.frequency();
        self.resonance = clamp_resonance(self.params.resonance());
        self.resonance_term = resonance_term(self.resonance);
        self.frequency_term = (self.two_pi_over_sr * self.frequency).cos();
        self.coefficients = Coefficients::from_terms(self.resonance_term, self.frequency_term);
    }

    /// Recompute only the terms whose input changed.
    #[inline]
    fn update(&mut self, frequency: f32, resonance: f32) {
        let resonance = clamp_resonance(resonance);
        if frequency == self.frequency && resonance == self.resonance {
            return;
        }
        if resonance != self.resonance {
            self.resonance_term = resonance_term(resonance);
            self.resonance = resonance;
        }
        if frequency != self.frequency {
            self.frequency_term = (self.two_pi_over_sr * frequency).cos();
            self.frequency = frequency;
        }
        self.coefficients = Coefficients::from_terms(self.resonance_term, self.frequency_term);
    }

    /// Process one block.
    ///
    /// `frequency` and `resonance` are the control signals if the respective
    /// inlets are connected; only their first sample is used. When disabled
    /// `out` is left untouched.
    pub fn process(
        &mut self,
        input: &[f32],
        frequency: Option<&[f32]>,
        resonance: Option<&[f32]>,
        out: &mut [f32],
    ) {
        let Some(kernel) = self.kernel else {
            return;
        };
        if self.params.disabled.get() {
            return;
        }
        self.running = true;

        if self.params.clear.take() {
            self.clear();
        }

        let frequency = first_sample(frequency.filter(|_| self.frequency_connected))
            .unwrap_or_else(|| self.params.frequency());
        let resonance = first_sample(resonance.filter(|_| self.resonance_connected))
            .unwrap_or_else(|| self.params.resonance());
        self.update(frequency, resonance);

        let size = input.len().min(out.len());
        let (input, out) = (&input[..size], &mut out[..size]);

        match kernel {
            LoresKernel::Scalar => self.render(input, out),
            LoresKernel::Unrolled if size % 4 == 0 => self.render_unrolled(input, out),
            LoresKernel::Smoothed if size % 4 == 0 => self.render_smoothed(input, out),
            _ => self.render(input, out),
        }
    }

    #[inline]
    fn render(&mut self, input: &[f32], out: &mut [f32]) {
        let Coefficients { a1, a2 } = self.coefficients;
        let scale = self.coefficients.scale();
        let mut ym1 = self.ym1;
        let mut ym2 = self.ym2;

        for (in_sample, out_sample) in input.iter().zip(out.iter_mut()) {
            let mut y = scale * *in_sample - a1 * ym1 - a2 * ym2;
            ym2 = ym1;
            if is_denormal_or_nan(y) {
                y = 0.0;
                ym2 = 0.0;
            }
            ym1 = y;
            *out_sample = y;
        }

        self.ym1 = ym1;
        self.ym2 = ym2;
    }

    #[inline]
    fn render_unrolled(&mut self, input: &[f32], out: &mut [f32]) {
        let Coefficients { a1, a2 } = self.coefficients;
        let scale = self.coefficients.scale();
        let mut yna = self.ym2;
        let mut ynb = self.ym1;

        for (x, y) in input.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
            yna = scale * x[0] - a1 * ynb - a2 * yna;
            flush(&mut yna, &mut ynb);
            y[0] = yna;
            ynb = scale * x[1] - a1 * yna - a2 * ynb;
            flush(&mut ynb, &mut yna);
            y[1] = ynb;
            yna = scale * x[2] - a1 * ynb - a2 * yna;
            flush(&mut yna, &mut ynb);
            y[2] = yna;
            ynb = scale * x[3] - a1 * yna - a2 * ynb;
            flush(&mut ynb, &mut yna);
            y[3] = ynb;
        }

        self.ym1 = ynb;
        self.ym2 = yna;
    }

    #[inline]
    fn render_smoothed(&mut self, input: &[f32], out: &mut [f32]) {
        let size = out.len();
        let target = self.coefficients;

        let mut a1 = self.previous.a1;
        let mut a2 = self.previous.a2;
        let mut scale = self.previous.scale();
        let a1_modulation = ParameterInterpolator::new(a1, target.a1, size);
        let a2_modulation = ParameterInterpolator::new(a2, target.a2, size);
        let scale_modulation = ParameterInterpolator::new(scale, target.scale(), size);

        let mut yna = self.ym2;
        let mut ynb = self.ym1;

        for (x, y) in input.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
            for (n, (in_sample, out_sample)) in x.iter().zip(y.iter_mut()).enumerate() {
                scale_modulation.update(&mut scale);
                a1_modulation.update(&mut a1);
                a2_modulation.update(&mut a2);
                if n % 2 == 0 {
                    yna = scale * *in_sample - a1 * ynb - a2 * yna;
                    flush(&mut yna, &mut ynb);
                    *out_sample = yna;
                } else {
                    ynb = scale * *in_sample - a1 * yna - a2 * ynb;
                    flush(&mut ynb, &mut yna);
                    *out_sample = ynb;
                }
            }
        }

        self.ym1 = ynb;
        self.ym2 = yna;
        self.previous = target;
    }
}

/// Zero both memory cells if the newest output is denormal or NaN.
#[inline(always)]
fn flush(newest: &mut f32, other: &mut f32) {
    if is_denormal_or_nan(*newest) {
        *newest = 0.0;
        *other = 0.0;
    }
}

impl Perform for Lores {
    fn num_inputs(&self) -> usize {
        3
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, setup: &DspSetup) {
        self.two_pi_over_sr = core::f32::consts::TAU / setup.sample_rate;
        self.calc();
        self.previous = self.coefficients;
        self.frequency_connected = setup.is_connected(1);
        self.resonance_connected = setup.is_connected(2);
        self.clear();

        let kernel = if setup.can_unroll() {
            if self.smoothing {
                LoresKernel::Smoothed
            } else {
                LoresKernel::Unrolled
            }
        } else {
            LoresKernel::Scalar
        };
        log::debug!("lores: {kernel:?} kernel for {} samples", setup.block_size);
        self.kernel = Some(kernel);
        self.running = false;
    }

    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let (Some(input), Some(out)) = (inputs.first(), outputs.first_mut()) else {
            return;
        };
        self.process(input, inputs.get(1).copied(), inputs.get(2).copied(), out);
    }
}
