//! # Motion primitives
//!
//! Open loop manoeuvres built from motor rotations: straight lines, in-place
//! turns and arcs. Each primitive issues the left motor's rotation without
//! waiting and then blocks on the right motor's rotation, so both wheels
//! start together and the call returns once the manoeuvre is complete.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod paths;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;

// Internal
use crate::geometry::{ArcPlan, Geometry};
use crate::hw::{Drive, HwError, MotorId};

pub use paths::*;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Drive straight for `cm`, backwards if negative.
pub fn move_cm<D>(drive: &mut D, geom: &Geometry, cm: f64) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    info!("moving {} cm...", cm);

    let degree = geom.distance_to_degree(cm);
    rotate_pair(drive, degree, degree, geom.base_rpm)
}

/// Turn in place by `angle_deg`. Positive angles turn clockwise.
pub fn turn_angle<D>(drive: &mut D, geom: &Geometry, angle_deg: f64) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    info!("turning {} degree...", angle_deg);

    let degree = geom.turn_degrees(angle_deg);
    rotate_pair(drive, degree, -degree, geom.base_rpm)
}

/// Drive `frac` of a circle of radius `r_cm` with the outer (right) wheel at
/// `outer_rpm`.
///
/// The commanded speeds are whole and unsigned, the rotations keep the signs
/// given by `r_cm` and `frac`. With a negative radius and fraction the inner
/// wheel becomes the faster one.
pub fn circle<D>(
    drive: &mut D,
    geom: &Geometry,
    r_cm: f64,
    outer_rpm: f64,
    frac: f64,
) -> Result<ArcPlan, HwError>
where
    D: Drive + ?Sized,
{
    let plan = geom.plan_arc(r_cm, outer_rpm, frac);

    info!("Motor {}: {} degree, {} rpm", MotorId::Left.port(), plan.inner_deg, plan.inner_rpm);
    info!("Motor {}: {} degree, {} rpm", MotorId::Right.port(), plan.outer_deg, plan.outer_rpm);

    drive.rotate_for(MotorId::Left, plan.inner_deg, plan.inner_cmd_rpm(), false)?;
    drive.rotate_for(MotorId::Right, plan.outer_deg, plan.outer_cmd_rpm(), true)?;

    Ok(plan)
}

/// Rotate the left motor without waiting, then the right motor, waiting for it
/// to finish.
pub fn rotate_pair<D>(
    drive: &mut D,
    left_deg: f64,
    right_deg: f64,
    rpm: f64,
) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    drive.rotate_for(MotorId::Left, left_deg, rpm, false)?;
    drive.rotate_for(MotorId::Right, right_deg, rpm, true)
}
