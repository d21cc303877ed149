//! # Bot library.
//!
//! This library holds everything the bot executable runs, so that it can be
//! tested and benchmarked without the executable itself.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Behaviours - the things the robot can be asked to do
pub mod behaviour;

/// Feedback control - proportional controllers and the cycle runner
pub mod ctrl;

/// Geometry - converts distances and angles into motor rotations
pub mod geometry;

/// Hardware capabilities - motors, sensors and the simulated robot
pub mod hw;

/// Motion primitives - open loop moves, turns, arcs and paths
pub mod motion;

/// Parameters of the executable
pub mod params;

/// Vision - object detection, bearing and range
pub mod vision;
