//! Tests for the CPU load simulator

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dsp_externals::stress::*;
use dsp_externals::{DspSetup, Perform};

/// Clock that advances by a fixed step every time it is read.
#[derive(Debug, Clone)]
struct StepClock {
    micros: Arc<AtomicU64>,
    step: u64,
}

impl StepClock {
    fn new(step: u64) -> Self {
        Self {
            micros: Arc::new(AtomicU64::new(0)),
            step,
        }
    }

    fn reads(&self) -> u64 {
        self.micros.load(Ordering::Relaxed) / self.step
    }
}

impl Clock for StepClock {
    fn now_ms(&self) -> f64 {
        self.micros.fetch_add(self.step, Ordering::Relaxed) as f64 / 1000.0
    }
}

#[test]
fn block_duration_follows_setup() {
    let mut stress = DspStress::new(25.0, Box::new(StepClock::new(1)));
    assert_eq!(stress.num_inputs(), 1);
    assert_eq!(stress.num_outputs(), 0);

    stress.prepare(&DspSetup::new(44100.0, 64));
    assert!((stress.block_duration_ms() - 1.451247).abs() < 1e-6);

    stress.prepare(&DspSetup::new(48000.0, 480));
    assert!((stress.block_duration_ms() - 10.0).abs() < 1e-9);
    assert!((stress.spin_time_ms() - 2.5).abs() < 1e-9);

    stress.params().set_target(150.0);
    assert!((stress.spin_time_ms() - 15.0).abs() < 1e-9);
}

#[test]
fn spins_for_share_of_block() {
    let clock = StepClock::new(300);
    let mut stress = DspStress::new(0.0, Box::new(clock.clone()));
    stress.prepare(&DspSetup::new(48000.0, 480));
    let params = stress.params();

    stress.perform(&[&[0.0; 480][..]], &mut []);
    assert_eq!(stress.spin_count(), 0);

    // 5 ms at 0.3 ms per read
    params.set_target(50.0);
    stress.process();
    assert_eq!(stress.spin_count(), 16);

    params.set_target(100.0);
    stress.process();
    assert_eq!(stress.spin_count(), 33);

    params.set_disabled(true);
    let reads = clock.reads();
    stress.process();
    assert_eq!(clock.reads(), reads);
    assert_eq!(stress.spin_count(), 33);
}

#[test]
fn spins_in_real_time() {
    let mut stress = DspStress::new(0.0, Box::new(StdClock::new()));
    stress.prepare(&DspSetup::new(44100.0, 4410));
    let params = stress.params();

    let start = Instant::now();
    stress.process();
    assert!(start.elapsed().as_secs_f64() < 0.05);

    params.set_target(50.0);
    let start = Instant::now();
    stress.process();
    assert!(start.elapsed().as_secs_f64() >= 0.05);
    assert!(stress.spin_count() > 0);

    params.set_target(100.0);
    let start = Instant::now();
    stress.process();
    assert!(start.elapsed().as_secs_f64() >= 0.1);
}
