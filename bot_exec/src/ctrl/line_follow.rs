//! Line following controller
//!
//! Steers with the difference between the two line trackers. The line is
//! followed while either tracker sees a reflectivity above the threshold,
//! once both are at or below it the line has ended.

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

/// Parameters for line following.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFollowParams {
    /// Reflectivity at or below which a tracker is over the dark line end.
    ///
    /// Units: percent
    pub threshold_pct: f64,

    /// Signed velocity of both wheels when the trackers read the same.
    ///
    /// Units: rpm
    pub base_rpm: f64,

    /// Pause after starting the motors, before the first cycle.
    ///
    /// Units: milliseconds
    pub settle_ms: u64,

    /// Control cycle period.
    ///
    /// Units: milliseconds
    pub period_ms: u64,

    /// Turn made once the line has ended.
    ///
    /// Units: degrees
    pub exit_turn_deg: f64,
}

/// Initialisation data for [`LineFollowCtrl`].
#[derive(Debug, Clone)]
pub struct LineFollowInit {
    /// Proportional gain.
    ///
    /// Units: rpm/percent
    pub k: f64,

    pub params: LineFollowParams,
}

/// Tracker readings for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFollowInput {
    pub refl_a_pct: f64,
    pub refl_b_pct: f64,
}

/// Status of one line following cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LineFollowReport {
    /// Units: rpm
    pub turn_speed_rpm: f64,
}

/// Line following controller.
#[derive(Debug, Default)]
pub struct LineFollowCtrl {
    k: f64,
    params: LineFollowParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Output of one line following cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineFollowOutput {
    /// Still on the line, apply these demands.
    Track(WheelDems),

    /// Both trackers are over the dark line end.
    LineEnd,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LineFollowParams {
    fn default() -> Self {
        Self {
            threshold_pct: 20.0,
            base_rpm: -100.0,
            settle_ms: 1000,
            period_ms: 30,
            exit_turn_deg: 90.0,
        }
    }
}

impl LineFollowParams {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl LineFollowCtrl {
    /// Create and initialise a new controller.
    pub fn new(k: f64, params: LineFollowParams) -> Result<Self, CtrlInitError> {
        let mut ctrl = Self::default();
        ctrl.init(LineFollowInit { k, params })?;
        Ok(ctrl)
    }

    pub fn params(&self) -> &LineFollowParams {
        &self.params
    }
}

impl State for LineFollowCtrl {
    type InitData = LineFollowInit;
    type InitError = CtrlInitError;

    type InputData = LineFollowInput;
    type OutputData = LineFollowOutput;
    type StatusReport = LineFollowReport;
    type ProcError = Infallible;

    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        check_finite("k", init_data.k)?;
        check_finite("base_rpm", init_data.params.base_rpm)?;
        check_finite("exit_turn_deg", init_data.params.exit_turn_deg)?;

        let threshold = init_data.params.threshold_pct;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(CtrlInitError::InvalidThreshold(threshold));
        }

        self.k = init_data.k;
        self.params = init_data.params;

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let LineFollowInput { refl_a_pct, refl_b_pct } = *input_data;
        let threshold = self.params.threshold_pct;

        if refl_a_pct <= threshold && refl_b_pct <= threshold {
            return Ok((LineFollowOutput::LineEnd, LineFollowReport::default()));
        }

        let turn_speed_rpm = self.k * (refl_a_pct - refl_b_pct);
        let dems = WheelDems::steer(self.params.base_rpm, turn_speed_rpm);

        trace!("LineFollow: turn {} rpm, dems {:?}", turn_speed_rpm, dems);

        Ok((LineFollowOutput::Track(dems), LineFollowReport { turn_speed_rpm }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn input(a: f64, b: f64) -> LineFollowInput {
        LineFollowInput { refl_a_pct: a, refl_b_pct: b }
    }

    #[test]
    fn test_proportional_steering() {
        let mut ctrl = LineFollowCtrl::new(1.0, LineFollowParams::default()).unwrap();

        let (out, rpt) = ctrl.proc(&input(30.0, 10.0)).unwrap();
        assert_eq!(rpt.turn_speed_rpm, 20.0);
        assert_eq!(
            out,
            LineFollowOutput::Track(WheelDems { left_rpm: -120.0, right_rpm: -80.0 })
        );

        let mut ctrl = LineFollowCtrl::new(0.5, LineFollowParams::default()).unwrap();
        let (out, _) = ctrl.proc(&input(40.0, 60.0)).unwrap();
        assert_eq!(
            out,
            LineFollowOutput::Track(WheelDems { left_rpm: -90.0, right_rpm: -110.0 })
        );
    }

    #[test]
    fn test_line_end() {
        let mut ctrl = LineFollowCtrl::new(1.0, LineFollowParams::default()).unwrap();

        // Either tracker above the threshold keeps following
        assert!(matches!(ctrl.proc(&input(21.0, 0.0)).unwrap().0, LineFollowOutput::Track(_)));
        assert!(matches!(ctrl.proc(&input(0.0, 20.5)).unwrap().0, LineFollowOutput::Track(_)));

        // Both at or below ends the line
        assert_eq!(ctrl.proc(&input(20.0, 20.0)).unwrap().0, LineFollowOutput::LineEnd);
        assert_eq!(ctrl.proc(&input(5.0, 19.0)).unwrap().0, LineFollowOutput::LineEnd);
    }

    #[test]
    fn test_init_checks() {
        assert!(matches!(
            LineFollowCtrl::new(std::f64::NAN, LineFollowParams::default()),
            Err(CtrlInitError::NonFiniteParam("k", _))
        ));

        let params = LineFollowParams {
            threshold_pct: 120.0,
            ..Default::default()
        };
        assert_eq!(
            LineFollowCtrl::new(1.0, params).unwrap_err(),
            CtrlInitError::InvalidThreshold(120.0)
        );
    }
}
