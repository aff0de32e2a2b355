//! Peak level meter.
//!
//! The audio thread keeps the running maximum of the absolute input. A
//! control-side timer polls it with [`PeakMeterParams::tick`], which publishes
//! the value to display and restarts the measurement. The two sides share the
//! maximum without locking; a block finishing between the read and the reset in
//! `tick` may get lost, which only affects one display frame.

use alloc::sync::Arc;

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::utils::param::{Flag, Param};
use crate::{DspSetup, Perform};

/// Control-thread side of a [`PeakMeter`].
#[derive(Debug)]
pub struct PeakMeterParams {
    max: Param,
    value: Param,
    disabled: Flag,
}

impl PeakMeterParams {
    /// Poll the meter.
    ///
    /// Returns the new display value, clipped to 1, if it changed since the
    /// last tick. The running maximum restarts from zero in that case.
    pub fn tick(&self) -> Option<f32> {
        let max = self.max.get();
        if self.value.get() == max {
            return None;
        }
        let value = max.min(1.0);
        self.value.set(value);
        self.max.set(0.0);
        Some(value)
    }

    /// Last published display value.
    pub fn value(&self) -> f32 {
        self.value.get()
    }

    /// Running maximum since the last tick.
    pub fn max(&self) -> f32 {
        self.max.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }
}

#[derive(Debug)]
pub struct PeakMeter {
    params: Arc<PeakMeterParams>,
    active: bool,
}

impl PeakMeter {
    pub fn new() -> Self {
        Self {
            params: Arc::new(PeakMeterParams {
                max: Param::new(0.0),
                value: Param::new(0.0),
                disabled: Flag::new(false),
            }),
            active: false,
        }
    }

    pub fn params(&self) -> Arc<PeakMeterParams> {
        self.params.clone()
    }

    /// Returns true if the input is connected and blocks are measured.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn process(&mut self, input: &[f32]) {
        if !self.active || self.params.disabled.get() {
            return;
        }
        let max = input
            .iter()
            .fold(self.params.max.get(), |max, x| max.max(x.abs()));
        self.params.max.set(max);
    }
}

impl Default for PeakMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Perform for PeakMeter {
    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        0
    }

    fn prepare(&mut self, setup: &DspSetup) {
        self.params.value.set(0.0);
        self.params.max.set(0.0);
        self.active = setup.is_connected(0);
    }

    fn perform(&mut self, inputs: &[&[f32]], _outputs: &mut [&mut [f32]]) {
        if let Some(input) = inputs.first() {
            self.process(input);
        }
    }
}
