//! Bump switch reflex: reverse the left motor while the switch is pressed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;

use super::{check_finite, CtrlInitError};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the bump reflex.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BumpParams {
    /// Units: milliseconds
    pub period_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BumpInput {
    pub pressing: bool,
}

/// Bump reflex controller.
#[derive(Debug, Default)]
pub struct BumpCtrl {
    reverse_rpm: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Demand for the left motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BumpDem {
    /// Spin in reverse at this (unsigned) rpm.
    Reverse(f64),
    Stop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BumpParams {
    fn default() -> Self {
        Self { period_ms: 100 }
    }
}

impl BumpParams {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl BumpCtrl {
    pub fn new(reverse_rpm: f64) -> Result<Self, CtrlInitError> {
        let mut ctrl = Self::default();
        ctrl.init(reverse_rpm)?;
        Ok(ctrl)
    }
}

impl State for BumpCtrl {
    /// Reverse speed in rpm.
    type InitData = f64;
    type InitError = CtrlInitError;

    type InputData = BumpInput;
    type OutputData = BumpDem;
    type StatusReport = ();
    type ProcError = Infallible;

    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        check_finite("reverse_rpm", init_data)?;
        self.reverse_rpm = init_data.abs();
        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let dem = if input_data.pressing {
            BumpDem::Reverse(self.reverse_rpm)
        } else {
            BumpDem::Stop
        };

        Ok((dem, ()))
    }
}
