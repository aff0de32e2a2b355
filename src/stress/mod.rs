//! CPU load simulation.

pub mod clock;

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::utils::param::{Flag, Param};
use crate::{DspSetup, Perform};

pub use clock::Clock;
#[cfg(feature = "std")]
pub use clock::StdClock;

/// Control-thread side of a [`DspStress`].
#[derive(Debug)]
pub struct DspStressParams {
    target: Param,
    disabled: Flag,
}

impl DspStressParams {
    /// Percentage of each block's duration to spend spinning. Values above
    /// 100 make the block overrun its budget.
    pub fn set_target(&self, percent: f32) {
        self.target.set(percent);
    }

    pub fn target(&self) -> f32 {
        self.target.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }
}

/// Burns a fixed share of every block's time budget in a busy loop.
#[derive(Clone)]
pub struct DspStress {
    params: Arc<DspStressParams>,
    clock: Box<dyn Clock>,
    block_duration_ms: f64,
    spin_count: u64,
}

impl core::fmt::Debug for DspStress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DspStress")
            .field("params", &self.params)
            .field("block_duration_ms", &self.block_duration_ms)
            .field("spin_count", &self.spin_count)
            .finish_non_exhaustive()
    }
}

impl DspStress {
    pub fn new(percent: f32, clock: Box<dyn Clock>) -> Self {
        Self {
            params: Arc::new(DspStressParams {
                target: Param::new(percent),
                disabled: Flag::new(false),
            }),
            clock,
            block_duration_ms: 0.0,
            spin_count: 0,
        }
    }

    pub fn params(&self) -> Arc<DspStressParams> {
        self.params.clone()
    }

    /// Duration of one block as computed by the last `prepare`.
    pub fn block_duration_ms(&self) -> f64 {
        self.block_duration_ms
    }

    /// Time to spend spinning per block at the current target.
    pub fn spin_time_ms(&self) -> f64 {
        self.block_duration_ms * self.params.target() as f64 / 100.0
    }

    /// Loop iterations of the last processed block.
    pub fn spin_count(&self) -> u64 {
        self.spin_count
    }

    /// Spin for the configured share of the block.
    pub fn process(&mut self) {
        if self.params.disabled.get() {
            return;
        }

        let deadline = self.clock.now_ms() + self.spin_time_ms();
        let mut count: u64 = 0;
        while self.clock.now_ms() < deadline {
            count = count.wrapping_add(1);
        }
        self.spin_count = count;
    }
}

impl Perform for DspStress {
    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        0
    }

    fn prepare(&mut self, setup: &DspSetup) {
        self.block_duration_ms = setup.block_duration_ms();
        log::debug!("dspstress: {:.3} ms per block", self.block_duration_ms);
    }

    fn perform(&mut self, _inputs: &[&[f32]], _outputs: &mut [&mut [f32]]) {
        self.process();
    }
}
