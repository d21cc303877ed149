//! # Simulated robot
//!
//! [`SimBot`] implements every hardware capability without any hardware. It
//! records each drive command it receives, integrates simple differential
//! drive kinematics to track the robot's pose, and produces sensor readings
//! either from a small world model or from readings queued by the caller.
//!
//! World model:
//! - The robot starts at the origin facing along +x.
//! - A wall runs parallel to the x axis at `y = -wall_offset_cm`. The
//!   rangefinder beam is perpendicular to the robot body and reports the
//!   distance along the beam to the wall.
//! - The line trackers read the floor reflectivity until the robot has
//!   travelled `line_length_cm`, after which both read the dark line end.
//!
//! Positive motor rotations on both sides drive the robot forwards.
//!
//! Only the most recent `cmd_history_len` drive commands are kept, so a
//! control loop left running does not grow the record without limit.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

// Internal
use super::*;
use crate::geometry::Geometry;
use util::maths::{clamp, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Integration step used while motors are spinning.
const SIM_STEP_S: f64 = 0.01;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Distance from the robot's starting position to the wall.
    ///
    /// Units: centimeters
    pub wall_offset_cm: f64,

    /// Maximum rangefinder reading.
    ///
    /// Units: centimeters
    pub rangefinder_max_cm: f64,

    /// Floor reflectivity seen by trackers A and B.
    ///
    /// Units: percent
    pub floor_reflectivity_pct: [f64; 2],

    /// Reflectivity of the dark line end.
    ///
    /// Units: percent
    pub line_end_reflectivity_pct: f64,

    /// Distance travelled before the trackers reach the line end.
    ///
    /// Units: centimeters
    pub line_length_cm: f64,

    /// Velocity used by a spin with no velocity given.
    ///
    /// Units: rpm
    pub default_velocity_rpm: f64,

    /// Object reported by every vision snapshot, if any.
    pub object: Option<DetectedObject>,

    /// If true sleeps also block the thread, so that the simulation runs in
    /// real time.
    pub realtime: bool,

    /// Maximum number of drive commands kept by [`SimBot::cmds`].
    pub cmd_history_len: usize,
}

/// Position and heading of the robot in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    /// Units: centimeters
    pub position_cm: Vector2<f64>,

    /// Heading anticlockwise from +x, in `[-pi, pi)`.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A command received by the simulated drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DriveCmd {
    RotateFor {
        motor: MotorId,
        degrees: f64,
        rpm: f64,
        wait: bool,
    },
    Spin {
        motor: MotorId,
        dir: SpinDirection,
        rpm: Option<f64>,
    },
    SetVelocity {
        motor: MotorId,
        rpm: f64,
    },
    Stop {
        motor: MotorId,
    },
}

/// State of one simulated motor.
#[derive(Debug, Clone, Copy, Default)]
struct SimMotor {
    /// Current velocity setting, signed.
    velocity_rpm: f64,

    /// True while spinning continuously.
    spinning: bool,

    /// Rotation still to be completed by a non-blocking `rotate_for`.
    pending_deg: f64,
}

/// The simulated robot.
pub struct SimBot {
    geometry: Geometry,
    params: SimParams,

    pose: Pose,
    odometer_cm: f64,
    sim_time_s: f64,

    left: SimMotor,
    right: SimMotor,

    /// Most recent drive commands, at most `cmd_history_len` of them.
    cmds: Vec<DriveCmd>,

    /// Total drive commands accepted.
    num_cmds: usize,

    /// Drive commands accepted before every further one fails.
    drive_fault_after: Option<usize>,

    /// Sensor reads served before every further one fails.
    sensor_fault_after: Option<usize>,
    num_sensor_reads: usize,

    bumper_queue: VecDeque<bool>,
    reflectivity_queue: [VecDeque<f64>; 2],
    distance_queue: VecDeque<f64>,
    snapshot_queue: VecDeque<Snapshot>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            wall_offset_cm: 30.0,
            rangefinder_max_cm: 300.0,
            floor_reflectivity_pct: [60.0, 55.0],
            line_end_reflectivity_pct: 10.0,
            line_length_cm: 200.0,
            default_velocity_rpm: 50.0,
            object: None,
            realtime: false,
            cmd_history_len: 10_000,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position_cm: Vector2::zeros(),
            heading_rad: 0.0,
        }
    }
}

impl SimBot {
    /// Create a new simulated robot at the origin.
    pub fn new(geometry: Geometry, params: SimParams) -> Self {
        let mut left = SimMotor::default();
        let mut right = SimMotor::default();
        left.velocity_rpm = params.default_velocity_rpm;
        right.velocity_rpm = params.default_velocity_rpm;

        Self {
            geometry,
            params,
            pose: Pose::default(),
            odometer_cm: 0.0,
            sim_time_s: 0.0,
            left,
            right,
            cmds: Vec::new(),
            num_cmds: 0,
            drive_fault_after: None,
            sensor_fault_after: None,
            num_sensor_reads: 0,
            bumper_queue: VecDeque::new(),
            reflectivity_queue: [VecDeque::new(), VecDeque::new()],
            distance_queue: VecDeque::new(),
            snapshot_queue: VecDeque::new(),
        }
    }

    /// The most recent drive commands, oldest first.
    pub fn cmds(&self) -> &[DriveCmd] {
        &self.cmds
    }

    /// Remove and return the recorded drive commands.
    pub fn take_cmds(&mut self) -> Vec<DriveCmd> {
        std::mem::take(&mut self.cmds)
    }

    /// Total number of drive commands accepted, including those no longer
    /// kept in [`SimBot::cmds`].
    pub fn num_cmds(&self) -> usize {
        self.num_cmds
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Simulated time elapsed.
    ///
    /// Units: seconds
    pub fn sim_time_s(&self) -> f64 {
        self.sim_time_s
    }

    /// Make every drive command after the next `n` fail.
    pub fn fail_drive_after(&mut self, n: usize) {
        self.drive_fault_after = Some(self.num_cmds + n);
    }

    /// Make every sensor read after the next `n` fail.
    pub fn fail_sensors_after(&mut self, n: usize) {
        self.sensor_fault_after = Some(self.num_sensor_reads + n);
    }

    /// Queue bump switch readings, returned before the modelled ones.
    pub fn queue_bumper<I: IntoIterator<Item = bool>>(&mut self, readings: I) {
        self.bumper_queue.extend(readings);
    }

    /// Queue reflectivity readings for a tracker.
    pub fn queue_reflectivity<I: IntoIterator<Item = f64>>(
        &mut self,
        tracker: LineTracker,
        readings: I,
    ) {
        self.reflectivity_queue[tracker_index(tracker)].extend(readings);
    }

    /// Queue rangefinder readings.
    pub fn queue_distance<I: IntoIterator<Item = f64>>(&mut self, readings: I) {
        self.distance_queue.extend(readings);
    }

    /// Queue vision snapshots.
    pub fn queue_snapshot<I: IntoIterator<Item = Snapshot>>(&mut self, snapshots: I) {
        self.snapshot_queue.extend(snapshots);
    }

    fn motor_mut(&mut self, motor: MotorId) -> &mut SimMotor {
        match motor {
            MotorId::Left => &mut self.left,
            MotorId::Right => &mut self.right,
        }
    }

    /// Record a drive command, failing if a fault has been injected.
    fn record(&mut self, cmd: DriveCmd, motor: MotorId) -> Result<(), HwError> {
        if let Some(n) = self.drive_fault_after {
            if self.num_cmds >= n {
                return Err(HwError::MotorDisconnected(motor));
            }
        }

        trace!("SimBot drive command: {:?}", cmd);
        self.num_cmds += 1;

        let max_len = self.params.cmd_history_len.max(1);
        if self.cmds.len() >= max_len {
            // Drop the older half at once
            let excess = self.cmds.len() + 1 - max_len;
            let drop = excess.max(max_len / 2).min(self.cmds.len());
            self.cmds.drain(..drop);
        }
        self.cmds.push(cmd);

        Ok(())
    }

    /// Count a sensor read, failing if a fault has been injected.
    fn read_sensor(&mut self, sensor: &'static str) -> Result<(), HwError> {
        if let Some(n) = self.sensor_fault_after {
            if self.num_sensor_reads >= n {
                return Err(HwError::SensorDisconnected(sensor));
            }
        }

        self.num_sensor_reads += 1;

        Ok(())
    }

    /// Move the robot by the given wheel travels.
    fn integrate(&mut self, left_cm: f64, right_cm: f64) {
        let ds = 0.5 * (left_cm + right_cm);
        let dth = (right_cm - left_cm) / self.geometry.track_cm;
        let mid_heading = self.pose.heading_rad + 0.5 * dth;

        self.pose.position_cm += Vector2::new(mid_heading.cos(), mid_heading.sin()) * ds;
        self.pose.heading_rad = wrap_pi(self.pose.heading_rad + dth);
        self.odometer_cm += ds.abs();
    }

    /// Complete all pending rotations, advancing time by the longest one.
    fn complete_rotations(&mut self) {
        let left_deg = std::mem::take(&mut self.left.pending_deg);
        let right_deg = std::mem::take(&mut self.right.pending_deg);

        if left_deg == 0.0 && right_deg == 0.0 {
            return;
        }

        let duration_s = [
            (left_deg, self.left.velocity_rpm),
            (right_deg, self.right.velocity_rpm),
        ]
        .iter()
        .filter(|(deg, rpm)| *deg != 0.0 && *rpm != 0.0)
        .map(|(deg, rpm)| deg.abs() / (rpm.abs() * 6.0))
        .fold(0.0, f64::max);

        self.sim_time_s += duration_s;

        let left_cm = self.geometry.degree_to_distance(left_deg);
        let right_cm = self.geometry.degree_to_distance(right_deg);
        self.integrate(left_cm, right_cm);
    }

    /// Advance the spinning motors by `dt_s`.
    fn advance(&mut self, dt_s: f64) {
        let mut remaining = dt_s;

        while remaining > 0.0 {
            let step = remaining.min(SIM_STEP_S);
            remaining -= step;

            let travel = |m: &SimMotor, geom: &Geometry| {
                if m.spinning {
                    geom.degree_to_distance(m.velocity_rpm * 6.0 * step)
                } else {
                    0.0
                }
            };

            let left_cm = travel(&self.left, &self.geometry);
            let right_cm = travel(&self.right, &self.geometry);
            self.integrate(left_cm, right_cm);
            self.sim_time_s += step;
        }
    }

    /// Modelled rangefinder reading.
    fn model_distance_cm(&self) -> f64 {
        let perp_cm = self.pose.position_cm.y + self.params.wall_offset_cm;
        let cos_heading = self.pose.heading_rad.cos().abs();

        if perp_cm <= 0.0 {
            return 0.0;
        }
        if cos_heading < 1e-6 {
            return self.params.rangefinder_max_cm;
        }

        clamp(perp_cm / cos_heading, 0.0, self.params.rangefinder_max_cm)
    }

    /// Modelled line tracker reading.
    fn model_reflectivity_pct(&self, tracker: LineTracker) -> f64 {
        if self.odometer_cm >= self.params.line_length_cm {
            self.params.line_end_reflectivity_pct
        } else {
            self.params.floor_reflectivity_pct[tracker_index(tracker)]
        }
    }
}

impl Drive for SimBot {
    fn rotate_for(
        &mut self,
        motor: MotorId,
        degrees: f64,
        rpm: f64,
        wait: bool,
    ) -> Result<(), HwError> {
        self.record(DriveCmd::RotateFor { motor, degrees, rpm, wait }, motor)?;

        let m = self.motor_mut(motor);
        m.spinning = false;
        m.velocity_rpm = rpm.abs();
        m.pending_deg += degrees;

        if wait {
            self.complete_rotations();
        }

        Ok(())
    }

    fn spin(
        &mut self,
        motor: MotorId,
        dir: SpinDirection,
        rpm: Option<f64>,
    ) -> Result<(), HwError> {
        self.record(DriveCmd::Spin { motor, dir, rpm }, motor)?;
        self.complete_rotations();

        let m = self.motor_mut(motor);
        let speed = rpm.unwrap_or(m.velocity_rpm).abs();
        m.velocity_rpm = match dir {
            SpinDirection::Fwd => speed,
            SpinDirection::Rev => -speed,
        };
        m.spinning = true;

        Ok(())
    }

    fn set_velocity(&mut self, motor: MotorId, rpm: f64) -> Result<(), HwError> {
        self.record(DriveCmd::SetVelocity { motor, rpm }, motor)?;
        self.motor_mut(motor).velocity_rpm = rpm;

        Ok(())
    }

    fn stop(&mut self, motor: MotorId) -> Result<(), HwError> {
        self.record(DriveCmd::Stop { motor }, motor)?;

        let m = self.motor_mut(motor);
        m.spinning = false;
        m.pending_deg = 0.0;

        Ok(())
    }
}

impl Sensors for SimBot {
    fn bumper_pressing(&mut self) -> Result<bool, HwError> {
        self.read_sensor("bumper")?;
        Ok(self.bumper_queue.pop_front().unwrap_or(false))
    }

    fn reflectivity_pct(&mut self, tracker: LineTracker) -> Result<f64, HwError> {
        self.read_sensor(match tracker {
            LineTracker::A => "line tracker A",
            LineTracker::B => "line tracker B",
        })?;

        match self.reflectivity_queue[tracker_index(tracker)].pop_front() {
            Some(r) => Ok(r),
            None => Ok(self.model_reflectivity_pct(tracker)),
        }
    }

    fn distance_cm(&mut self) -> Result<f64, HwError> {
        self.read_sensor("rangefinder")?;

        match self.distance_queue.pop_front() {
            Some(d) => Ok(d),
            None => Ok(self.model_distance_cm()),
        }
    }
}

impl Vision for SimBot {
    fn take_snapshot(&mut self, _signature: u8) -> Result<Snapshot, HwError> {
        if let Some(s) = self.snapshot_queue.pop_front() {
            return Ok(s);
        }

        Ok(match self.params.object {
            Some(obj) => Snapshot {
                object_count: 1,
                largest_object: Some(obj),
            },
            None => Snapshot::default(),
        })
    }
}

impl Timer for SimBot {
    fn sleep(&mut self, duration: Duration) {
        self.complete_rotations();
        self.advance(duration.as_secs_f64());

        if self.params.realtime {
            ThreadTimer.sleep(duration);
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn tracker_index(tracker: LineTracker) -> usize {
    match tracker {
        LineTracker::A => 0,
        LineTracker::B => 1,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-6;

    fn sim() -> SimBot {
        SimBot::new(Geometry::default(), SimParams::default())
    }

    #[test]
    fn test_straight_rotation() {
        let mut bot = sim();
        let geom = Geometry::default();
        let deg = geom.distance_to_degree(50.0);

        bot.rotate_for(MotorId::Left, deg, 100.0, false).unwrap();
        assert_eq!(bot.pose(), Pose::default());

        bot.rotate_for(MotorId::Right, deg, 100.0, true).unwrap();

        let pose = bot.pose();
        assert!((pose.position_cm.x - 50.0).abs() < EPS);
        assert!(pose.position_cm.y.abs() < EPS);
        assert!(pose.heading_rad.abs() < EPS);

        // 100 rpm is 600 deg/s
        assert!((bot.sim_time_s() - deg / 600.0).abs() < EPS);
        assert_eq!(bot.cmds().len(), 2);
    }

    #[test]
    fn test_point_turn() {
        let mut bot = sim();
        let geom = Geometry::default();
        let deg = geom.turn_degrees(90.0);

        bot.rotate_for(MotorId::Left, deg, 100.0, false).unwrap();
        bot.rotate_for(MotorId::Right, -deg, 100.0, true).unwrap();

        let pose = bot.pose();
        assert!(pose.position_cm.norm() < EPS);
        assert!((pose.heading_rad + 0.5 * PI).abs() < EPS);
    }

    #[test]
    fn test_spin_and_sleep() {
        let mut bot = sim();

        bot.spin(MotorId::Left, SpinDirection::Fwd, None).unwrap();
        bot.spin(MotorId::Right, SpinDirection::Fwd, None).unwrap();
        bot.set_velocity(MotorId::Left, -100.0).unwrap();
        bot.set_velocity(MotorId::Right, -100.0).unwrap();
        bot.sleep(Duration::from_secs(1));

        // 100 rpm for a second, one wheel turn in five motor turns per 3 s
        let expected = -Geometry::default().degree_to_distance(600.0);
        let pose = bot.pose();
        assert!((pose.position_cm.x - expected).abs() < 1e-3);
        assert!((bot.sim_time_s() - 1.0).abs() < 1e-9);

        bot.stop(MotorId::Left).unwrap();
        bot.stop(MotorId::Right).unwrap();
        bot.sleep(Duration::from_secs(1));
        assert!((bot.pose().position_cm.x - expected).abs() < 1e-3);
    }

    #[test]
    fn test_sensors() {
        let mut bot = sim();

        assert!((bot.distance_cm().unwrap() - 30.0).abs() < EPS);
        bot.queue_distance(vec![25.0]);
        assert_eq!(bot.distance_cm().unwrap(), 25.0);
        assert!((bot.distance_cm().unwrap() - 30.0).abs() < EPS);

        assert_eq!(bot.reflectivity_pct(LineTracker::A).unwrap(), 60.0);
        assert_eq!(bot.reflectivity_pct(LineTracker::B).unwrap(), 55.0);
        bot.queue_reflectivity(LineTracker::B, vec![12.0]);
        assert_eq!(bot.reflectivity_pct(LineTracker::B).unwrap(), 12.0);

        assert!(!bot.bumper_pressing().unwrap());
        bot.queue_bumper(vec![true]);
        assert!(bot.bumper_pressing().unwrap());

        assert_eq!(bot.take_snapshot(1).unwrap(), Snapshot::default());
    }

    #[test]
    fn test_line_end() {
        let params = SimParams {
            line_length_cm: 10.0,
            ..Default::default()
        };
        let geom = Geometry::default();
        let mut bot = SimBot::new(geom, params);

        let deg = geom.distance_to_degree(20.0);
        bot.rotate_for(MotorId::Left, deg, 100.0, false).unwrap();
        bot.rotate_for(MotorId::Right, deg, 100.0, true).unwrap();

        assert_eq!(bot.reflectivity_pct(LineTracker::A).unwrap(), 10.0);
        assert_eq!(bot.reflectivity_pct(LineTracker::B).unwrap(), 10.0);
    }

    #[test]
    fn test_drive_fault() {
        let mut bot = sim();
        bot.fail_drive_after(1);

        assert!(bot.stop(MotorId::Left).is_ok());
        assert!(matches!(
            bot.stop(MotorId::Right),
            Err(HwError::MotorDisconnected(MotorId::Right))
        ));
        assert_eq!(bot.cmds().len(), 1);
    }

    #[test]
    fn test_sensor_fault() {
        let mut bot = sim();
        bot.fail_sensors_after(2);

        assert!(bot.distance_cm().is_ok());
        assert!(bot.bumper_pressing().is_ok());
        assert!(matches!(
            bot.reflectivity_pct(LineTracker::B),
            Err(HwError::SensorDisconnected("line tracker B"))
        ));
        assert!(matches!(
            bot.distance_cm(),
            Err(HwError::SensorDisconnected("rangefinder"))
        ));
    }

    #[test]
    fn test_cmd_history_bounded() {
        let params = SimParams {
            cmd_history_len: 8,
            ..Default::default()
        };
        let mut bot = SimBot::new(Geometry::default(), params);

        for i in 0..1000 {
            bot.set_velocity(MotorId::Left, i as f64).unwrap();
            assert!(bot.cmds().len() <= 8);
        }

        assert_eq!(bot.num_cmds(), 1000);
        assert_eq!(
            *bot.cmds().last().unwrap(),
            DriveCmd::SetVelocity { motor: MotorId::Left, rpm: 999.0 }
        );

        // Faults count every accepted command, not just the kept ones
        bot.fail_drive_after(1);
        assert!(bot.stop(MotorId::Left).is_ok());
        assert!(bot.stop(MotorId::Left).is_err());
        assert_eq!(bot.num_cmds(), 1001);
    }
}
