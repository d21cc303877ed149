//! # Feedback control module
//!
//! Proportional controllers that turn a sensor reading into wheel demands,
//! and the [`CycleRunner`] which drives them at a fixed period.
//!
//! Each controller implements [`util::module::State`]: `proc` is a pure
//! function of the reading, with the hardware reads and writes done by the
//! behaviour that owns the loop.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod bump;
mod line_follow;
mod stand_off;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Internal
use crate::hw::{Drive, HwError, MotorId, Timer};

pub use bump::*;
pub use line_follow::*;
pub use stand_off::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity demands for the two drive motors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelDems {
    /// Units: rpm
    pub left_rpm: f64,

    /// Units: rpm
    pub right_rpm: f64,
}

/// Shared flag used to ask a running control loop to stop.
///
/// Clones share the same flag, so one can be handed to another thread.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

/// Runs a control cycle at a fixed period until it completes, is stopped, or
/// reaches a cycle limit.
#[derive(Debug, Clone)]
pub struct CycleRunner {
    max_cycles: Option<u64>,
    stop: StopSignal,
    num_cycles: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Sleep for the period, then run another cycle.
    Continue,
    /// The loop's exit condition has been met.
    Done,
}

/// Why a control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopExit {
    /// The loop's own exit condition was met.
    Completed,
    /// The stop signal was raised.
    Stopped,
    /// The runner's cycle limit was reached.
    CycleLimit,
}

/// Errors raised while initialising a controller.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CtrlInitError {
    #[error("Controller parameter {0} must be finite, found {1}")]
    NonFiniteParam(&'static str, f64),

    #[error("Reflectivity threshold must be between 0 and 100 %, found {0}")]
    InvalidThreshold(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelDems {
    /// Steer about a base velocity: the left wheel gets `base - turn`, the
    /// right `base + turn`.
    pub fn steer(base_rpm: f64, turn_rpm: f64) -> Self {
        Self {
            left_rpm: base_rpm - turn_rpm,
            right_rpm: base_rpm + turn_rpm,
        }
    }

    /// Send the demands to the motors.
    pub fn apply<D>(&self, drive: &mut D) -> Result<(), HwError>
    where
        D: Drive + ?Sized,
    {
        drive.set_velocity(MotorId::Left, self.left_rpm)?;
        drive.set_velocity(MotorId::Right, self.right_rpm)
    }
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every loop using this signal to stop at its next cycle.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl CycleRunner {
    /// Create a runner with no cycle limit.
    pub fn new(stop: StopSignal) -> Self {
        Self {
            max_cycles: None,
            stop,
            num_cycles: 0,
        }
    }

    /// Limit the number of cycles per loop.
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Number of cycles executed by the last call to [`CycleRunner::run`].
    pub fn num_cycles(&self) -> u64 {
        self.num_cycles
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Run `cycle` every `period` until it returns [`CycleStatus::Done`], the
    /// stop signal is raised, or the cycle limit is reached.
    ///
    /// The stop signal and limit are checked before each cycle, the sleep
    /// happens after each cycle that continues.
    pub fn run<H, F, E>(
        &mut self,
        hw: &mut H,
        period: Duration,
        mut cycle: F,
    ) -> Result<LoopExit, E>
    where
        H: Timer + ?Sized,
        F: FnMut(&mut H) -> Result<CycleStatus, E>,
    {
        self.num_cycles = 0;

        loop {
            if self.stop.is_stopped() {
                debug!("Control loop stopped after {} cycles", self.num_cycles);
                return Ok(LoopExit::Stopped);
            }

            if let Some(max) = self.max_cycles {
                if self.num_cycles >= max {
                    debug!("Control loop reached the {} cycle limit", max);
                    return Ok(LoopExit::CycleLimit);
                }
            }

            let status = cycle(hw)?;
            self.num_cycles += 1;

            match status {
                CycleStatus::Continue => hw.sleep(period),
                CycleStatus::Done => return Ok(LoopExit::Completed),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_finite(name: &'static str, value: f64) -> Result<(), CtrlInitError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CtrlInitError::NonFiniteParam(name, value))
    }
}
