//! Scripted paths built from the motion primitives

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;

use super::{circle, move_cm, rotate_pair, turn_angle};
use crate::geometry::Geometry;
use crate::hw::{Drive, HwError, MotorId};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Turn between the sides of a square.
const SQUARE_TURN_DEG: f64 = 90.0;

/// Turn between the points of the star.
const STAR_TURN_DEG: f64 = 143.0;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Drive a square with sides of `side_cm`.
pub fn square<D>(drive: &mut D, geom: &Geometry, side_cm: f64) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    info!("square of {} cm...", side_cm);
    polygon(drive, geom, side_cm, SQUARE_TURN_DEG, 4)
}

/// Drive a five sided star with sides of `side_cm`.
pub fn star<D>(drive: &mut D, geom: &Geometry, side_cm: f64) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    info!("star of {} cm...", side_cm);
    polygon(drive, geom, side_cm, STAR_TURN_DEG, 5)
}

/// Drive the fixed maze course.
pub fn maze<D>(drive: &mut D, geom: &Geometry) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    info!("starting maze...");

    circle(drive, geom, 45.0, geom.base_rpm, 0.25)?;
    circle(drive, geom, -25.0, geom.base_rpm, -0.25)?;

    let degree = geom.distance_to_degree(12.0);
    rotate_pair(drive, degree, degree, geom.base_rpm)?;

    turn_angle(drive, geom, 45.0)?;
    move_cm(drive, geom, 40.0)?;

    // Pivot: here both rotations block, so the wheels turn one after the
    // other.
    let degree = geom.distance_to_degree(21.0);
    drive.rotate_for(MotorId::Left, -degree, geom.base_rpm, true)?;
    drive.rotate_for(MotorId::Right, degree, geom.base_rpm, true)?;

    move_cm(drive, geom, -30.0)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Drive `num_sides` sides, turning between each but not after the last.
fn polygon<D>(
    drive: &mut D,
    geom: &Geometry,
    side_cm: f64,
    turn_deg: f64,
    num_sides: usize,
) -> Result<(), HwError>
where
    D: Drive + ?Sized,
{
    for _ in 1..num_sides {
        move_cm(drive, geom, side_cm)?;
        turn_angle(drive, geom, turn_deg)?;
    }

    move_cm(drive, geom, side_cm)
}
