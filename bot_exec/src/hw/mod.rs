//! # Hardware capability module
//!
//! The control code never talks to the robot's motors and sensors directly.
//! Instead it is generic over the capability traits defined here, which are
//! implemented by a hardware adapter or by the simulated robot in [`sim`].
//!
//! All calls are synchronous. A blocking rotation (`wait == true`) returns once
//! the motor has reached its target.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Simulated robot used by the executable and by the tests.
pub mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// IDs of the drive motors.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum MotorId {
    /// Left drive motor, port 1. The inner wheel during a `circle`.
    Left,
    /// Right drive motor, port 10.
    Right,
}

/// Direction for a continuous spin.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Copy, Clone)]
pub enum SpinDirection {
    Fwd,
    Rev,
}

/// The downward facing line trackers.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum LineTracker {
    /// Tracker on port A, mounted on the left.
    A,
    /// Tracker on port B, mounted on the right.
    B,
}

/// Errors reported by a hardware capability.
#[derive(Debug, thiserror::Error)]
pub enum HwError {
    #[error("Motor {0:?} on port {} is not connected", .0.port())]
    MotorDisconnected(MotorId),

    #[error("Sensor {0} is not connected")]
    SensorDisconnected(&'static str),

    #[error("The vision sensor has no signature with id {0}")]
    UnknownSignature(u8),

    #[error("Hardware fault: {0}")]
    Fault(String),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object found by the vision sensor.
///
/// Coordinates are in pixels, with the origin in the top left of the frame.
#[derive(Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Default)]
pub struct DetectedObject {
    pub center_x: i32,
    pub center_y: i32,
    pub width: i32,
    pub height: i32,
}

/// The result of a single vision snapshot.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct Snapshot {
    /// Number of objects matching the signature.
    pub object_count: usize,

    /// The largest matching object, present if `object_count > 0`.
    pub largest_object: Option<DetectedObject>,
}

/// A [`Timer`] which blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadTimer;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Drive motor actuation.
pub trait Drive {
    /// Rotate the motor by `degrees` at `rpm`.
    ///
    /// The sign of `degrees` gives the direction of rotation, `rpm` is an
    /// unsigned speed. If `wait` is true the call blocks until the rotation
    /// is complete.
    fn rotate_for(
        &mut self,
        motor: MotorId,
        degrees: f64,
        rpm: f64,
        wait: bool,
    ) -> Result<(), HwError>;

    /// Spin the motor continuously. If `rpm` is `None` the motor's current
    /// velocity setting is used.
    fn spin(
        &mut self,
        motor: MotorId,
        dir: SpinDirection,
        rpm: Option<f64>,
    ) -> Result<(), HwError>;

    /// Set the velocity of a spinning motor, signed.
    fn set_velocity(&mut self, motor: MotorId, rpm: f64) -> Result<(), HwError>;

    /// Stop the motor.
    fn stop(&mut self, motor: MotorId) -> Result<(), HwError>;
}

/// Sensor reads.
pub trait Sensors {
    /// True while the bump switch is pressed.
    fn bumper_pressing(&mut self) -> Result<bool, HwError>;

    /// Reflectivity of the surface under a line tracker in percent.
    fn reflectivity_pct(&mut self, tracker: LineTracker) -> Result<f64, HwError>;

    /// Rangefinder distance in centimeters.
    fn distance_cm(&mut self) -> Result<f64, HwError>;
}

/// Vision sensor.
pub trait Vision {
    /// Take one snapshot, searching for objects matching `signature`.
    fn take_snapshot(&mut self, signature: u8) -> Result<Snapshot, HwError>;
}

/// Delays between control cycles.
pub trait Timer {
    fn sleep(&mut self, duration: Duration);
}

/// Everything a behaviour may need.
pub trait Hardware: Drive + Sensors + Vision + Timer {}

impl<T> Hardware for T where T: Drive + Sensors + Vision + Timer {}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotorId {
    /// The port the motor is plugged into.
    pub fn port(&self) -> u8 {
        match self {
            MotorId::Left => 1,
            MotorId::Right => 10,
        }
    }
}

impl Timer for ThreadTimer {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration)
    }
}
