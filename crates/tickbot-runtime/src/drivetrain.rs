//! The drivetrain capability and its simulation.
//!
//! The drive behavior unit only speaks [`Drivetrain`]: it sends one
//! [`ChassisRequest`] per tick and forwards vision measurements into the
//! drivetrain's pose estimator.  Swerve kinematics and wheel control live
//! behind the trait.

use std::cell::Cell;
use std::f64::consts::PI;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tickbot_types::Pose2d;
use tracing::trace;

/// A field-centric velocity request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChassisRequest {
    /// Toward the far end of the field, m/s.
    pub vx_mps: f64,
    /// Toward the left side of the field, m/s.
    pub vy_mps: f64,
    /// Counter-clockwise, rad/s.
    pub omega_rad_per_s: f64,
}

impl ChassisRequest {
    /// Stand still.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.vx_mps == 0.0 && self.vy_mps == 0.0 && self.omega_rad_per_s == 0.0
    }
}

/// A holonomic drivetrain with an on-board pose estimator.
pub trait Drivetrain {
    fn set_control(&mut self, request: ChassisRequest);

    /// The estimator's current field pose.
    fn pose(&self) -> Pose2d;

    /// Fuse an absolute pose measurement taken at `timestamp` seconds with
    /// standard deviations `[x, y, θ]`.
    fn add_vision_measurement(&mut self, pose: Pose2d, timestamp: f64, std_devs: [f64; 3]);

    /// Advance simulated physics by `dt` seconds.  Real drivetrains ignore it.
    fn update_sim(&mut self, _dt: f64) {}
}

// ────────────────────────────────────────────────────────────────────────────
// SimDrivetrain
// ────────────────────────────────────────────────────────────────────────────

/// Kinematic drivetrain with drifting odometry.
///
/// The ground truth follows every request exactly.  The odometry estimate
/// over-reads each motion by the wheel-slip fraction, so it drifts until a
/// vision measurement pulls it back with a per-axis gain
/// `k = q² / (q² + σ²)`.
///
/// ```
/// use tickbot_runtime::drivetrain::{ChassisRequest, Drivetrain, SimDrivetrain};
/// use tickbot_types::Pose2d;
///
/// let mut drive = SimDrivetrain::new(Pose2d::new(1.0, 1.0, 0.0));
/// drive.set_control(ChassisRequest { vx_mps: 1.0, ..Default::default() });
/// for _ in 0..50 {
///     drive.update_sim(0.02);
/// }
/// assert!((drive.ground_truth().get().x - 2.0).abs() < 1e-9);
/// ```
pub struct SimDrivetrain {
    truth: Rc<Cell<Pose2d>>,
    estimate: Pose2d,
    request: ChassisRequest,
    wheel_slip: f64,
    process_std_dev: [f64; 3],
    vision_updates: usize,
}

impl SimDrivetrain {
    const DEFAULT_PROCESS_STD_DEV: [f64; 3] = [0.1, 0.1, 0.1];

    /// Start at `start` with a perfect estimate and no slip.
    pub fn new(start: Pose2d) -> Self {
        Self {
            truth: Rc::new(Cell::new(start)),
            estimate: start,
            request: ChassisRequest::idle(),
            wheel_slip: 0.0,
            process_std_dev: Self::DEFAULT_PROCESS_STD_DEV,
            vision_updates: 0,
        }
    }

    /// Fraction by which odometry over-reads motion, e.g. `0.05`.
    pub fn with_wheel_slip(mut self, slip: f64) -> Self {
        self.wheel_slip = slip;
        self
    }

    /// Odometry trust `[x, y, θ]` used in the vision gain.
    pub fn with_process_std_dev(mut self, std_dev: [f64; 3]) -> Self {
        self.process_std_dev = std_dev;
        self
    }

    /// Shared handle to the true pose, for simulated cameras.
    pub fn ground_truth(&self) -> Rc<Cell<Pose2d>> {
        Rc::clone(&self.truth)
    }

    pub fn last_request(&self) -> ChassisRequest {
        self.request
    }

    pub fn vision_updates(&self) -> usize {
        self.vision_updates
    }

    /// Distance between estimate and truth, in metres.
    pub fn estimate_error(&self) -> f64 {
        self.estimate.distance_to(&self.truth.get())
    }
}

impl Drivetrain for SimDrivetrain {
    fn set_control(&mut self, request: ChassisRequest) {
        self.request = request;
    }

    fn pose(&self) -> Pose2d {
        self.estimate
    }

    fn add_vision_measurement(&mut self, pose: Pose2d, timestamp: f64, std_devs: [f64; 3]) {
        let gain = |q: f64, sigma: f64| {
            let (q2, s2) = (q * q, sigma * sigma);
            if q2 + s2 > 0.0 { q2 / (q2 + s2) } else { 1.0 }
        };
        let [qx, qy, qt] = self.process_std_dev;
        self.estimate.x += gain(qx, std_devs[0]) * (pose.x - self.estimate.x);
        self.estimate.y += gain(qy, std_devs[1]) * (pose.y - self.estimate.y);
        let dtheta = wrap_angle(pose.rotation_rad - self.estimate.rotation_rad);
        self.estimate.rotation_rad =
            wrap_angle(self.estimate.rotation_rad + gain(qt, std_devs[2]) * dtheta);
        self.vision_updates += 1;
        trace!(timestamp, x = self.estimate.x, y = self.estimate.y, "vision measurement fused");
    }

    fn update_sim(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let r = self.request;
        let mut truth = self.truth.get();
        truth.x += r.vx_mps * dt;
        truth.y += r.vy_mps * dt;
        truth.rotation_rad = wrap_angle(truth.rotation_rad + r.omega_rad_per_s * dt);
        self.truth.set(truth);

        let over = 1.0 + self.wheel_slip;
        self.estimate.x += r.vx_mps * dt * over;
        self.estimate.y += r.vy_mps * dt * over;
        self.estimate.rotation_rad =
            wrap_angle(self.estimate.rotation_rad + r.omega_rad_per_s * dt * over);
    }
}

/// Wrap to `(-π, π]`.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn idle_request_holds_position() {
        let mut drive = SimDrivetrain::new(Pose2d::new(3.0, 4.0, 0.5));
        drive.update_sim(0.02);
        assert_eq!(drive.ground_truth().get(), Pose2d::new(3.0, 4.0, 0.5));
        assert!(drive.last_request().is_idle());
    }

    #[test]
    fn slip_makes_odometry_drift() {
        let mut drive = SimDrivetrain::new(Pose2d::default()).with_wheel_slip(0.1);
        drive.set_control(ChassisRequest {
            vx_mps: 2.0,
            ..Default::default()
        });
        for _ in 0..50 {
            drive.update_sim(0.02);
        }
        assert!((drive.ground_truth().get().x - 2.0).abs() < EPS);
        assert!((drive.pose().x - 2.2).abs() < EPS);
        assert!((drive.estimate_error() - 0.2).abs() < EPS);
    }

    #[test]
    fn vision_gain_weights_by_std_dev() {
        let mut drive = SimDrivetrain::new(Pose2d::default());
        // q = σ → halfway
        drive.add_vision_measurement(Pose2d::new(1.0, -1.0, 0.0), 0.0, [0.1, 0.1, 0.1]);
        assert!((drive.pose().x - 0.5).abs() < EPS);
        assert!((drive.pose().y + 0.5).abs() < EPS);
        assert_eq!(drive.vision_updates(), 1);
    }

    #[test]
    fn noisy_measurement_barely_moves_estimate() {
        let mut drive = SimDrivetrain::new(Pose2d::default());
        drive.add_vision_measurement(Pose2d::new(1.0, 0.0, 0.0), 0.0, [10.0, 10.0, 10.0]);
        assert!(drive.pose().x < 0.001);
    }

    #[test]
    fn heading_correction_takes_short_way_round() {
        let mut drive = SimDrivetrain::new(Pose2d::new(0.0, 0.0, 3.1));
        drive.add_vision_measurement(Pose2d::new(0.0, 0.0, -3.1), 0.0, [0.0, 0.0, 0.0]);
        assert!((drive.pose().rotation_rad.abs() - 3.1).abs() < 1e-6);
    }

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < EPS);
        assert!((wrap_angle(-PI) - PI).abs() < EPS);
        assert!((wrap_angle(0.25) - 0.25).abs() < EPS);
    }
}
