//! # Behaviour module
//!
//! A behaviour is one complete thing the robot can be asked to do: an open
//! loop manoeuvre, a closed loop controller run until its exit condition (or
//! until it is cancelled), or a vision query.
//!
//! Behaviours are selected on the command line or listed in a behaviour
//! script, see [`BehaviourCmd`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use structopt::StructOpt;

// Internal
use crate::ctrl::{
    BumpCtrl, BumpDem, BumpInput, CycleRunner, CycleStatus, CtrlInitError, LineFollowCtrl,
    LineFollowInput, LineFollowOutput, LoopExit, StandOffCtrl, StandOffInput, StandOffMode,
};
use crate::geometry::{ArcPlan, GeometryError};
use crate::hw::{DetectedObject, Drive, Hardware, HwError, LineTracker, MotorId, SpinDirection};
use crate::motion;
use crate::params::BotParams;
use crate::vision;
use util::module::State;
use util::script_interpreter::ScriptInterpreter;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// What happened during a behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BehaviourOutcome {
    /// Name of the behaviour that ran.
    pub behaviour: &'static str,

    /// Why the control loop ended, `None` for open loop behaviours.
    pub exit: Option<LoopExit>,

    /// Number of control cycles executed.
    pub num_cycles: u64,

    /// The arc driven by a `circle`.
    pub arc: Option<ArcPlan>,

    /// The object found by `detect`.
    pub detected: Option<DetectedObject>,

    /// Bearing of the detected object.
    ///
    /// Units: degrees
    pub bearing_deg: Option<f64>,

    /// Estimated range to the detected object.
    ///
    /// Units: centimeters
    pub range_cm: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A behaviour the robot can perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
pub enum BehaviourCmd {
    /// Drive straight for a distance, backwards if negative.
    #[structopt(name = "move", setting = structopt::clap::AppSettings::AllowNegativeNumbers)]
    Move {
        /// Distance to drive in centimeters.
        cm: f64,
    },

    /// Turn in place, positive angles turn clockwise.
    #[structopt(name = "turn", setting = structopt::clap::AppSettings::AllowNegativeNumbers)]
    Turn {
        /// Angle to turn in degrees.
        angle_deg: f64,
    },

    /// Drive a square.
    #[structopt(name = "square")]
    Square {
        /// Length of each side in centimeters.
        side_cm: f64,
    },

    /// Drive a five pointed star.
    #[structopt(name = "star")]
    Star {
        /// Length of each side in centimeters.
        side_cm: f64,
    },

    /// Drive part of a circle, with the left wheel on the inside.
    #[structopt(name = "circle", setting = structopt::clap::AppSettings::AllowNegativeNumbers)]
    Circle {
        /// Radius of the circle in centimeters, measured to the robot's centre.
        radius_cm: f64,

        /// Speed of the outer (right) wheel in rpm.
        outer_rpm: f64,

        /// Fraction of the full circle to drive.
        frac: f64,
    },

    /// Drive the fixed maze course.
    #[structopt(name = "maze")]
    Maze,

    /// Follow a line until both trackers see the dark line end, then turn.
    #[structopt(name = "line-follow", setting = structopt::clap::AppSettings::AllowNegativeNumbers)]
    LineFollow {
        /// Proportional gain in rpm per percent of reflectivity difference.
        k: f64,
    },

    /// Hold a distance from the object in front of the rangefinder.
    #[structopt(name = "stand-off", setting = structopt::clap::AppSettings::AllowNegativeNumbers)]
    StandOff {
        /// Distance to hold in centimeters.
        target_cm: f64,

        /// Proportional gain in rpm per centimeter.
        k: f64,
    },

    /// Drive along a wall, holding a distance from it.
    #[structopt(name = "wall-stand-off", setting = structopt::clap::AppSettings::AllowNegativeNumbers)]
    WallStandOff {
        /// Distance to hold in centimeters.
        target_cm: f64,

        /// Proportional gain in rpm per centimeter.
        k: f64,
    },

    /// Reverse the left motor while the bump switch is pressed.
    #[structopt(name = "bump")]
    Bump,

    /// Look for an object with the vision sensor.
    #[structopt(name = "detect")]
    Detect,
}

/// Errors which end a behaviour.
#[derive(Debug, thiserror::Error)]
pub enum BehaviourError {
    #[error("Hardware error: {0}")]
    HwError(#[from] HwError),

    #[error("Geometry error: {0}")]
    GeometryError(#[from] GeometryError),

    #[error("Could not initialise the controller: {0}")]
    CtrlInitError(#[from] CtrlInitError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BehaviourCmd {
    fn default() -> Self {
        BehaviourCmd::WallStandOff {
            target_cm: 20.0,
            k: 5.0,
        }
    }
}

impl BehaviourCmd {
    pub fn name(&self) -> &'static str {
        match self {
            BehaviourCmd::Move { .. } => "move",
            BehaviourCmd::Turn { .. } => "turn",
            BehaviourCmd::Square { .. } => "square",
            BehaviourCmd::Star { .. } => "star",
            BehaviourCmd::Circle { .. } => "circle",
            BehaviourCmd::Maze => "maze",
            BehaviourCmd::LineFollow { .. } => "line-follow",
            BehaviourCmd::StandOff { .. } => "stand-off",
            BehaviourCmd::WallStandOff { .. } => "wall-stand-off",
            BehaviourCmd::Bump => "bump",
            BehaviourCmd::Detect => "detect",
        }
    }
}

impl From<Infallible> for BehaviourError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run a single behaviour to completion.
///
/// Closed loop behaviours run through `runner`, so they end early if its stop
/// signal is raised or its cycle limit is reached. The geometry is validated
/// before anything is sent to the motors.
pub fn run<H>(
    cmd: &BehaviourCmd,
    hw: &mut H,
    params: &BotParams,
    runner: &mut CycleRunner,
) -> Result<BehaviourOutcome, BehaviourError>
where
    H: Hardware + ?Sized,
{
    params.validate()?;
    let geom = &params.geometry;

    info!("Running behaviour {:?}", cmd);

    let mut outcome = BehaviourOutcome {
        behaviour: cmd.name(),
        ..Default::default()
    };

    match *cmd {
        BehaviourCmd::Move { cm } => motion::move_cm(hw, geom, cm)?,
        BehaviourCmd::Turn { angle_deg } => motion::turn_angle(hw, geom, angle_deg)?,
        BehaviourCmd::Square { side_cm } => motion::square(hw, geom, side_cm)?,
        BehaviourCmd::Star { side_cm } => motion::star(hw, geom, side_cm)?,
        BehaviourCmd::Circle { radius_cm, outer_rpm, frac } => {
            outcome.arc = Some(motion::circle(hw, geom, radius_cm, outer_rpm, frac)?);
        }
        BehaviourCmd::Maze => motion::maze(hw, geom)?,
        BehaviourCmd::LineFollow { k } => {
            outcome.exit = Some(line_follow(hw, params, runner, k)?);
        }
        BehaviourCmd::StandOff { target_cm, k } => {
            outcome.exit = Some(
                stand_off(hw, params, runner, StandOffMode::Approach, target_cm, k)?
            );
        }
        BehaviourCmd::WallStandOff { target_cm, k } => {
            outcome.exit = Some(
                stand_off(hw, params, runner, StandOffMode::FollowWall, target_cm, k)?
            );
        }
        BehaviourCmd::Bump => outcome.exit = Some(bump(hw, params, runner)?),
        BehaviourCmd::Detect => {
            if let Some(obj) = vision::detect_object(hw, &params.vision)? {
                outcome.detected = Some(obj);
                outcome.bearing_deg = Some(vision::bearing_deg(&obj, &params.vision));
                outcome.range_cm = vision::range_cm(&obj, &params.vision);
            }
        }
    }

    if outcome.exit.is_some() {
        outcome.num_cycles = runner.num_cycles();
    }

    info!("Behaviour {} complete", cmd.name());

    Ok(outcome)
}

/// Run every command in a behaviour script in order.
///
/// Stops at the first error, or before the next command once the runner's
/// stop signal has been raised.
pub fn run_script<H>(
    script: &mut ScriptInterpreter<BehaviourCmd>,
    hw: &mut H,
    params: &BotParams,
    runner: &mut CycleRunner,
) -> Result<Vec<BehaviourOutcome>, BehaviourError>
where
    H: Hardware + ?Sized,
{
    let mut outcomes = Vec::with_capacity(script.get_num_cmds());

    while let Some(cmd) = script.next_cmd() {
        if runner.stop_signal().is_stopped() {
            warn!(
                "Script stopped with {} command(s) remaining",
                script.get_num_cmds() + 1
            );
            break;
        }

        outcomes.push(run(&cmd, hw, params, runner)?);
    }

    Ok(outcomes)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Follow the line until both trackers see the line end, then make the exit
/// turn.
///
/// The motors are spun forwards at their current velocity to start with, and
/// the trackers read once each per cycle, A then B.
fn line_follow<H>(
    hw: &mut H,
    params: &BotParams,
    runner: &mut CycleRunner,
    k: f64,
) -> Result<LoopExit, BehaviourError>
where
    H: Hardware + ?Sized,
{
    let mut ctrl = LineFollowCtrl::new(k, params.line_follow.clone())?;
    let exit_turn_deg = ctrl.params().exit_turn_deg;

    let res = track_line(hw, &mut ctrl, runner);
    let (exit, last) = stop_on_error(hw, res)?;

    match exit {
        LoopExit::Completed => {
            info!("Line end: A {} %, B {} %", last.refl_a_pct, last.refl_b_pct);
            motion::turn_angle(hw, &params.geometry, exit_turn_deg)?;
        }
        _ => stop_both(hw)?,
    }

    Ok(exit)
}

/// Line following loop, returning the last tracker readings.
fn track_line<H>(
    hw: &mut H,
    ctrl: &mut LineFollowCtrl,
    runner: &mut CycleRunner,
) -> Result<(LoopExit, LineFollowInput), BehaviourError>
where
    H: Hardware + ?Sized,
{
    let lf = ctrl.params().clone();

    spin_both_fwd(hw)?;
    let mut last = read_trackers(hw)?;
    hw.sleep(lf.settle());

    let exit = runner.run(hw, lf.period(), |hw: &mut H| -> Result<_, BehaviourError> {
        let input = read_trackers(hw)?;
        last = input;

        match ctrl.proc(&input)?.0 {
            LineFollowOutput::Track(dems) => {
                dems.apply(hw)?;
                Ok(CycleStatus::Continue)
            }
            LineFollowOutput::LineEnd => Ok(CycleStatus::Done),
        }
    })?;

    Ok((exit, last))
}

/// Hold the rangefinder reading at `target_cm` until cancelled.
fn stand_off<H>(
    hw: &mut H,
    params: &BotParams,
    runner: &mut CycleRunner,
    mode: StandOffMode,
    target_cm: f64,
    k: f64,
) -> Result<LoopExit, BehaviourError>
where
    H: Hardware + ?Sized,
{
    let mut ctrl = StandOffCtrl::new(mode, target_cm, k, params.stand_off.clone())?;

    let res = hold_distance(hw, &mut ctrl, runner);
    let exit = stop_on_error(hw, res)?;

    stop_both(hw)?;

    Ok(exit)
}

fn hold_distance<H>(
    hw: &mut H,
    ctrl: &mut StandOffCtrl,
    runner: &mut CycleRunner,
) -> Result<LoopExit, BehaviourError>
where
    H: Hardware + ?Sized,
{
    let period = ctrl.params().period();

    spin_both_fwd(hw)?;

    runner.run(hw, period, |hw: &mut H| -> Result<_, BehaviourError> {
        let distance_cm = hw.distance_cm()?;
        info!("distance: {} cm", distance_cm);

        let (dems, _) = ctrl.proc(&StandOffInput { distance_cm })?;
        dems.apply(hw)?;

        Ok(CycleStatus::Continue)
    })
}

/// Reverse the left motor at the base speed while the bump switch is pressed.
fn bump<H>(
    hw: &mut H,
    params: &BotParams,
    runner: &mut CycleRunner,
) -> Result<LoopExit, BehaviourError>
where
    H: Hardware + ?Sized,
{
    let mut ctrl = BumpCtrl::new(params.geometry.base_rpm)?;

    let res = runner.run(hw, params.bump.period(), |hw: &mut H| -> Result<_, BehaviourError> {
        let pressing = hw.bumper_pressing()?;
        info!("bumper: {}", pressing);

        match ctrl.proc(&BumpInput { pressing })?.0 {
            BumpDem::Reverse(rpm) => hw.spin(MotorId::Left, SpinDirection::Rev, Some(rpm))?,
            BumpDem::Stop => hw.stop(MotorId::Left)?,
        }

        Ok(CycleStatus::Continue)
    });
    let exit = stop_on_error(hw, res)?;

    hw.stop(MotorId::Left)?;

    Ok(exit)
}

/// Stop both motors if `res` is an error, then hand `res` back unchanged.
///
/// A failure to stop is logged, the original error is the one returned.
fn stop_on_error<D, T>(
    drive: &mut D,
    res: Result<T, BehaviourError>,
) -> Result<T, BehaviourError>
where
    D: Drive + ?Sized,
{
    if let Err(ref e) = res {
        warn!("Stopping the motors after an error: {}", e);

        if let Err(stop_err) = stop_both(drive) {
            warn!("Could not stop the motors: {}", stop_err);
        }
    }

    res
}

fn spin_both_fwd<D>(drive: &mut D) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    drive.spin(MotorId::Left, SpinDirection::Fwd, None)?;
    drive.spin(MotorId::Right, SpinDirection::Fwd, None)
}

fn stop_both<D>(drive: &mut D) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    debug!("Stopping both motors");
    drive.stop(MotorId::Left)?;
    drive.stop(MotorId::Right)
}

fn read_trackers<H>(hw: &mut H) -> Result<LineFollowInput, HwError>
where
    H: Hardware + ?Sized,
{
    let input = LineFollowInput {
        refl_a_pct: hw.reflectivity_pct(LineTracker::A)?,
        refl_b_pct: hw.reflectivity_pct(LineTracker::B)?,
    };

    info!("A: {} %, B: {} %", input.refl_a_pct, input.refl_b_pct);

    Ok(input)
}
