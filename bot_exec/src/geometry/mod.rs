//! # Geometry module
//!
//! Converts travel distances, turn angles and arcs into drive motor rotations.
//!
//! All motor rotations are in degrees of the motor shaft, which turns
//! `gear_ratio` times for each turn of the wheel.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical geometry of the robot's drive base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// Diameter of the drive wheels.
    ///
    /// Units: centimeters
    pub wheel_diameter_cm: f64,

    /// Distance between the contact points of the two drive wheels.
    ///
    /// Units: centimeters
    pub track_cm: f64,

    /// Motor shaft turns per wheel turn.
    pub gear_ratio: f64,

    /// Speed used by the motion primitives.
    ///
    /// Units: rpm
    pub base_rpm: f64,
}

/// Motor demands for driving an arc, see [`Geometry::plan_arc`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArcPlan {
    /// Rotation of the inner (left) motor.
    ///
    /// Units: degrees
    pub inner_deg: f64,

    /// Rotation of the outer (right) motor.
    ///
    /// Units: degrees
    pub outer_deg: f64,

    /// Speed of the inner motor so that both wheels finish together.
    ///
    /// Units: rpm
    pub inner_rpm: f64,

    /// Speed of the outer motor.
    ///
    /// Units: rpm
    pub outer_rpm: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with the robot geometry.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("Invalid configuration: {0} must be positive and finite, found {1}")]
    InvalidConfiguration(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Geometry {
    fn default() -> Self {
        Self {
            wheel_diameter_cm: 10.16,
            track_cm: 28.4,
            gear_ratio: 5.0,
            base_rpm: 100.0,
        }
    }
}

impl Geometry {
    /// Create a new geometry, checking that it is physically valid.
    pub fn new(
        wheel_diameter_cm: f64,
        track_cm: f64,
        gear_ratio: f64,
        base_rpm: f64,
    ) -> Result<Self, GeometryError> {
        let geom = Self {
            wheel_diameter_cm,
            track_cm,
            gear_ratio,
            base_rpm,
        };

        geom.validate()?;

        Ok(geom)
    }

    /// Check that all dimensions are positive and finite.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let fields = [
            ("wheel_diameter_cm", self.wheel_diameter_cm),
            ("track_cm", self.track_cm),
            ("gear_ratio", self.gear_ratio),
            ("base_rpm", self.base_rpm),
        ];

        for (name, value) in fields.iter() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(GeometryError::InvalidConfiguration(*name, *value));
            }
        }

        Ok(())
    }

    /// Motor rotation needed to drive the wheel `cm` along the ground.
    ///
    /// Negative distances give negative (reverse) rotations.
    pub fn distance_to_degree(&self, cm: f64) -> f64 {
        (cm * 360.0 * self.gear_ratio) / (self.wheel_diameter_cm * PI)
    }

    /// Ground distance travelled by the wheel for a motor rotation, the
    /// inverse of [`Geometry::distance_to_degree`].
    pub fn degree_to_distance(&self, degrees: f64) -> f64 {
        (degrees * self.wheel_diameter_cm * PI) / (360.0 * self.gear_ratio)
    }

    /// Arc length each wheel travels to rotate the robot in place by
    /// `angle_deg`.
    pub fn turn_arc_cm(&self, angle_deg: f64) -> f64 {
        (self.track_cm * PI * angle_deg) / 360.0
    }

    /// Motor rotation for an in-place turn of `angle_deg`.
    pub fn turn_degrees(&self, angle_deg: f64) -> f64 {
        self.distance_to_degree(self.turn_arc_cm(angle_deg))
    }

    /// Plan an arc of radius `r_cm` covering `frac` of a full circle, with the
    /// outer wheel turning at `outer_rpm`.
    ///
    /// The signs of `r_cm` and `frac` are carried into the degree demands
    /// unchanged, only the speeds are made unsigned when commanded (see
    /// [`ArcPlan::inner_cmd_rpm`]).
    pub fn plan_arc(&self, r_cm: f64, outer_rpm: f64, frac: f64) -> ArcPlan {
        let half_track = 0.5 * self.track_cm;

        let inner_c = ((r_cm - half_track) * 2.0 * PI) * frac;
        let outer_c = ((r_cm + half_track) * 2.0 * PI) * frac;

        let inner_deg = self.distance_to_degree(inner_c);
        let outer_deg = self.distance_to_degree(outer_c);

        ArcPlan {
            inner_deg,
            outer_deg,
            inner_rpm: inner_deg / (outer_deg * (1.0 / outer_rpm)),
            outer_rpm,
        }
    }
}

impl ArcPlan {
    /// Speed commanded to the inner motor: the inner rpm truncated to a whole
    /// number and made positive.
    pub fn inner_cmd_rpm(&self) -> f64 {
        cmd_rpm(self.inner_rpm)
    }

    /// Speed commanded to the outer motor, truncated and made positive.
    pub fn outer_cmd_rpm(&self) -> f64 {
        cmd_rpm(self.outer_rpm)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Motors take whole, unsigned rpm values.
fn cmd_rpm(rpm: f64) -> f64 {
    (rpm as i32).saturating_abs() as f64
}

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_distance_to_degree() {
        let geom = Geometry::default();

        assert_eq!(geom.distance_to_degree(0.0), 0.0);

        for cm in [1.0, 12.0, 30.0, 250.5].iter() {
            assert_eq!(
                geom.distance_to_degree(-cm),
                -geom.distance_to_degree(*cm)
            );
        }

        // One wheel circumference is one wheel turn, five motor turns
        assert!((geom.distance_to_degree(10.16 * PI) - 1800.0).abs() < EPS);

        let deg = geom.distance_to_degree(42.0);
        assert!((geom.degree_to_distance(deg) - 42.0).abs() < EPS);
    }

    #[test]
    fn test_turn_degrees() {
        let geom = Geometry::default();

        assert_eq!(geom.turn_degrees(0.0), 0.0);

        // A full turn drives each wheel round the track circle
        assert!((geom.turn_arc_cm(360.0) - 28.4 * PI).abs() < EPS);
        assert!((geom.turn_degrees(360.0) - 28.4 / 10.16 * 1800.0).abs() < 1e-6);

        let mut prev = geom.turn_degrees(-180.0);
        for i in -179..=180 {
            let deg = geom.turn_degrees(i as f64);
            assert!(deg > prev, "not increasing at {} deg", i);
            prev = deg;
        }
    }

    #[test]
    fn test_plan_arc() {
        let geom = Geometry::default();

        for r in [20.0, 45.0, 100.0].iter() {
            let plan = geom.plan_arc(*r, 100.0, 0.25);
            let expected = (r - 0.5 * geom.track_cm) / (r + 0.5 * geom.track_cm);

            assert!((plan.inner_deg / plan.outer_deg - expected).abs() < EPS);

            // Both wheels take the same time
            let inner_time = plan.inner_deg / plan.inner_rpm;
            let outer_time = plan.outer_deg / plan.outer_rpm;
            assert!((inner_time - outer_time).abs() < EPS);
        }

        // r = 45, outer 100 rpm: inner = 100 * 30.8 / 59.2
        let plan = geom.plan_arc(45.0, 100.0, 0.25);
        assert!((plan.inner_rpm - 52.027027027).abs() < 1e-6);
        assert_eq!(plan.inner_cmd_rpm(), 52.0);
        assert_eq!(plan.outer_cmd_rpm(), 100.0);
    }

    #[test]
    fn test_plan_arc_negative() {
        let geom = Geometry::default();

        // Negative radius and fraction: degrees keep their sign, commanded
        // speeds are unsigned.
        let plan = geom.plan_arc(-25.0, 100.0, -0.25);
        assert!(plan.inner_deg > 0.0);
        assert!(plan.outer_deg > 0.0);
        assert!(plan.outer_deg < plan.inner_deg);
        assert!(plan.inner_rpm > 100.0);
        assert_eq!(plan.inner_cmd_rpm(), plan.inner_rpm.trunc());

        let plan = geom.plan_arc(-25.0, -100.0, 0.25);
        assert!(plan.inner_deg < 0.0);
        assert!(plan.inner_rpm < 0.0);
        assert!(plan.inner_cmd_rpm() > 0.0);
        assert_eq!(plan.outer_cmd_rpm(), 100.0);
    }

    #[test]
    fn test_validate() {
        assert!(Geometry::default().validate().is_ok());
        assert!(Geometry::new(10.16, 28.4, 5.0, 100.0).is_ok());

        assert_eq!(
            Geometry::new(0.0, 28.4, 5.0, 100.0),
            Err(GeometryError::InvalidConfiguration("wheel_diameter_cm", 0.0))
        );
        assert_eq!(
            Geometry::new(10.16, -1.0, 5.0, 100.0),
            Err(GeometryError::InvalidConfiguration("track_cm", -1.0))
        );
        assert!(Geometry::new(10.16, 28.4, std::f64::NAN, 100.0).is_err());
    }
}
