//! # Vision module
//!
//! Single snapshot object detection, plus bearing and range estimates for the
//! detected object from a pinhole camera model.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::{Deserialize, Serialize};

// Internal
use crate::hw::{DetectedObject, HwError, Vision};
use util::maths::lin_map;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the vision sensor and the object being searched for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionParams {
    /// Id of the colour signature to search for.
    pub signature: u8,

    /// Units: pixels
    pub frame_width_px: u32,

    /// Horizontal field of view.
    ///
    /// Units: degrees
    pub horizontal_fov_deg: f64,

    /// Real width of the object being searched for.
    ///
    /// Units: centimeters
    pub object_width_cm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for VisionParams {
    fn default() -> Self {
        Self {
            signature: 1,
            frame_width_px: 316,
            horizontal_fov_deg: 61.0,
            object_width_cm: 5.0,
        }
    }
}

impl VisionParams {
    /// Focal length of the camera.
    ///
    /// Units: pixels
    pub fn focal_length_px(&self) -> f64 {
        0.5 * self.frame_width_px as f64 / (0.5 * self.horizontal_fov_deg.to_radians()).tan()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Take one snapshot and return the largest object matching the signature.
///
/// Returns `None` if no matching object is in view.
pub fn detect_object<V>(vision: &mut V, params: &VisionParams)
    -> Result<Option<DetectedObject>, HwError>
where
    V: Vision + ?Sized,
{
    let snapshot = vision.take_snapshot(params.signature)?;

    if snapshot.object_count == 0 {
        debug!("No object matching signature {}", params.signature);
        return Ok(None);
    }

    if let Some(obj) = snapshot.largest_object {
        info!("x: {}, y {}", obj.center_x, obj.center_y);
    }

    Ok(snapshot.largest_object)
}

/// Bearing of the largest object from the centre of the frame.
///
/// Positive bearings are to the right of centre.
///
/// Units: degrees
pub fn object_direction<V>(vision: &mut V, params: &VisionParams) -> Result<Option<f64>, HwError>
where
    V: Vision + ?Sized,
{
    Ok(detect_object(vision, params)?.map(|obj| bearing_deg(&obj, params)))
}

/// Estimated range to the largest object, from its apparent width.
///
/// Returns `None` if there is no object or it has no width.
///
/// Units: centimeters
pub fn object_distance<V>(vision: &mut V, params: &VisionParams) -> Result<Option<f64>, HwError>
where
    V: Vision + ?Sized,
{
    Ok(detect_object(vision, params)?.and_then(|obj| range_cm(&obj, params)))
}

/// Bearing of an object's centre from the centre of the frame.
pub fn bearing_deg(obj: &DetectedObject, params: &VisionParams) -> f64 {
    let half_width = 0.5 * params.frame_width_px as f64;
    let offset_px = lin_map((0.0, 2.0 * half_width), (-half_width, half_width), obj.center_x as f64);
    offset_px.atan2(params.focal_length_px()).to_degrees()
}

/// Pinhole range estimate for an object.
pub fn range_cm(obj: &DetectedObject, params: &VisionParams) -> Option<f64> {
    if obj.width <= 0 {
        return None;
    }

    Some(params.object_width_cm * params.focal_length_px() / obj.width as f64)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Geometry;
    use crate::hw::sim::{SimBot, SimParams};
    use crate::hw::Snapshot;

    fn object(center_x: i32, width: i32) -> DetectedObject {
        DetectedObject { center_x, center_y: 106, width, height: width }
    }

    fn sim_with(snapshots: Vec<Snapshot>) -> SimBot {
        let mut bot = SimBot::new(Geometry::default(), SimParams::default());
        bot.queue_snapshot(snapshots);
        bot
    }

    #[test]
    fn test_detect_object() {
        let params = VisionParams::default();
        let obj = object(100, 20);

        let mut bot = sim_with(vec![
            Snapshot { object_count: 2, largest_object: Some(obj) },
            Snapshot::default(),
        ]);

        assert_eq!(detect_object(&mut bot, &params).unwrap(), Some(obj));
        assert_eq!(detect_object(&mut bot, &params).unwrap(), None);
    }

    #[test]
    fn test_object_direction() {
        let params = VisionParams::default();

        let mut bot = sim_with(vec![
            Snapshot { object_count: 1, largest_object: Some(object(158, 20)) },
            Snapshot { object_count: 1, largest_object: Some(object(316, 20)) },
            Snapshot { object_count: 1, largest_object: Some(object(0, 20)) },
        ]);

        let centre = object_direction(&mut bot, &params).unwrap().unwrap();
        assert!(centre.abs() < 1e-9);

        // The frame edges are at half the field of view
        let right = object_direction(&mut bot, &params).unwrap().unwrap();
        assert!((right - 30.5).abs() < 1e-9);
        let left = object_direction(&mut bot, &params).unwrap().unwrap();
        assert!((left + 30.5).abs() < 1e-9);

        assert_eq!(object_direction(&mut bot, &params).unwrap(), None);
    }

    #[test]
    fn test_object_distance() {
        let params = VisionParams::default();
        let f = params.focal_length_px();

        let mut bot = sim_with(vec![
            Snapshot { object_count: 1, largest_object: Some(object(158, 20)) },
            Snapshot { object_count: 1, largest_object: Some(object(158, 40)) },
            Snapshot { object_count: 1, largest_object: Some(object(158, 0)) },
        ]);

        let far = object_distance(&mut bot, &params).unwrap().unwrap();
        assert!((far - 5.0 * f / 20.0).abs() < 1e-9);

        // Twice as wide is half as far
        let near = object_distance(&mut bot, &params).unwrap().unwrap();
        assert!((far / near - 2.0).abs() < 1e-9);

        assert_eq!(object_distance(&mut bot, &params).unwrap(), None);
    }
}
