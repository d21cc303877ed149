//! Standoff distance controller
//!
//! Holds the rangefinder reading at a target distance. The correction is
//! `k * (reading - target)` with no integral or derivative term and no
//! limit on the demanded velocity.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;

// Internal
use super::{check_finite, CtrlInitError, WheelDems};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters shared by both standoff modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StandOffParams {
    /// Signed velocity both wheels run at along the wall, used in
    /// [`StandOffMode::FollowWall`] only.
    ///
    /// Units: rpm
    pub base_rpm: f64,

    /// Control cycle period.
    ///
    /// Units: milliseconds
    pub period_ms: u64,
}

/// Initialisation data for [`StandOffCtrl`].
#[derive(Debug, Clone)]
pub struct StandOffInit {
    pub mode: StandOffMode,

    /// Units: centimeters
    pub target_cm: f64,

    /// Proportional gain.
    ///
    /// Units: rpm/centimeter
    pub k: f64,

    pub params: StandOffParams,
}

/// Rangefinder reading for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandOffInput {
    pub distance_cm: f64,
}

/// Status of one standoff cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StandOffReport {
    /// Reading minus target.
    ///
    /// Units: centimeters
    pub diff_cm: f64,

    /// Units: rpm
    pub turn_speed_rpm: f64,
}

/// Standoff distance controller.
#[derive(Debug)]
pub struct StandOffCtrl {
    mode: StandOffMode,
    target_cm: f64,
    k: f64,
    params: StandOffParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the correction is applied to the wheels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandOffMode {
    /// Both wheels are driven at `-turn`, moving the robot towards or away
    /// from the object in front of the rangefinder.
    Approach,

    /// Advance at the base velocity and steer with `turn` to keep the
    /// distance to a wall alongside.
    FollowWall,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for StandOffParams {
    fn default() -> Self {
        Self {
            base_rpm: -100.0,
            period_ms: 30,
        }
    }
}

impl StandOffParams {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for StandOffCtrl {
    fn default() -> Self {
        Self {
            mode: StandOffMode::FollowWall,
            target_cm: 0.0,
            k: 0.0,
            params: StandOffParams::default(),
        }
    }
}

impl StandOffCtrl {
    /// Create and initialise a new controller.
    pub fn new(
        mode: StandOffMode,
        target_cm: f64,
        k: f64,
        params: StandOffParams,
    ) -> Result<Self, CtrlInitError> {
        let mut ctrl = Self::default();
        ctrl.init(StandOffInit { mode, target_cm, k, params })?;
        Ok(ctrl)
    }

    pub fn params(&self) -> &StandOffParams {
        &self.params
    }
}

impl State for StandOffCtrl {
    type InitData = StandOffInit;
    type InitError = CtrlInitError;

    type InputData = StandOffInput;
    type OutputData = WheelDems;
    type StatusReport = StandOffReport;
    type ProcError = Infallible;

    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        check_finite("target_cm", init_data.target_cm)?;
        check_finite("k", init_data.k)?;
        check_finite("base_rpm", init_data.params.base_rpm)?;

        self.mode = init_data.mode;
        self.target_cm = init_data.target_cm;
        self.k = init_data.k;
        self.params = init_data.params;

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let diff_cm = input_data.distance_cm - self.target_cm;
        let turn_speed_rpm = self.k * diff_cm;

        let dems = match self.mode {
            StandOffMode::Approach => WheelDems {
                left_rpm: -turn_speed_rpm,
                right_rpm: -turn_speed_rpm,
            },
            StandOffMode::FollowWall => WheelDems::steer(self.params.base_rpm, turn_speed_rpm),
        };

        trace!("StandOff: diff {} cm, dems {:?}", diff_cm, dems);

        Ok((dems, StandOffReport { diff_cm, turn_speed_rpm }))
    }
}
