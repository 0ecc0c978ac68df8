//! Operator-driven holonomic drive.
//!
//! Stick conventions: pushing the left stick forward reads as negative Y,
//! so both translation axes and the rotation axis are negated before
//! scaling.  With no input the drive is commanded to stand still.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tickbot_types::{Pose2d, RobotError, TeleopInput, apply_deadband};
use tickbot_vision::PoseConsumer;

use crate::drivetrain::{ChassisRequest, Drivetrain};
use crate::fsm::{AutoSystem, FsmSystem, Milestone, StateCell, StateSpace};

/// Driver feel for the teleop drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(default = "default_deadband")]
    pub translation_deadband: f64,
    #[serde(default = "default_deadband")]
    pub rotation_deadband: f64,
    /// Top linear speed at full stick, m/s.
    #[serde(default = "default_max_speed_mps")]
    pub max_speed_mps: f64,
    /// Top turn rate at full stick, rotations per second.
    #[serde(default = "default_max_angular_rate_rps")]
    pub max_angular_rate_rps: f64,
    #[serde(default = "default_damp")]
    pub translational_damp: f64,
    #[serde(default = "default_damp")]
    pub rotational_damp: f64,
}

fn default_deadband() -> f64 {
    0.05
}

fn default_max_speed_mps() -> f64 {
    4.5
}

fn default_max_angular_rate_rps() -> f64 {
    0.75
}

fn default_damp() -> f64 {
    1.0
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            translation_deadband: default_deadband(),
            rotation_deadband: default_deadband(),
            max_speed_mps: default_max_speed_mps(),
            max_angular_rate_rps: default_max_angular_rate_rps(),
            translational_damp: default_damp(),
            rotational_damp: default_damp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveState {
    Teleop,
}

impl StateSpace for DriveState {
    const INITIAL: Self = DriveState::Teleop;

    fn label(&self) -> &'static str {
        "TELEOP"
    }

    fn from_label(label: &str) -> Option<Self> {
        (label == "TELEOP").then_some(DriveState::Teleop)
    }
}

pub struct DriveSystem<D: Drivetrain> {
    state: StateCell<DriveState>,
    drivetrain: D,
    config: DriveConfig,
    holding: Option<Milestone>,
}

impl<D: Drivetrain> DriveSystem<D> {
    pub fn new(drivetrain: D, config: DriveConfig) -> Self {
        let mut system = Self {
            state: StateCell::default(),
            drivetrain,
            config,
            holding: None,
        };
        system.handle_teleop_state(None);
        system
    }

    pub fn drivetrain(&self) -> &D {
        &self.drivetrain
    }

    pub fn drivetrain_mut(&mut self) -> &mut D {
        &mut self.drivetrain
    }

    pub fn pose(&self) -> Pose2d {
        self.drivetrain.pose()
    }

    /// The milestone the drive last held still for, until the next
    /// operator update or reset.
    pub fn holding(&self) -> Option<Milestone> {
        self.holding
    }

    /// The request a given stick position maps to.
    pub fn request_for(&self, input: &TeleopInput) -> ChassisRequest {
        let c = &self.config;
        let linear = c.max_speed_mps * c.translational_damp;
        let angular = c.max_angular_rate_rps * TAU * c.rotational_damp;
        ChassisRequest {
            vx_mps: apply_deadband(-input.drive_left_y(), c.translation_deadband) * linear,
            vy_mps: apply_deadband(-input.drive_left_x(), c.translation_deadband) * linear,
            omega_rad_per_s: apply_deadband(-input.drive_right_x(), c.rotation_deadband) * angular,
        }
    }

    fn handle_teleop_state(&mut self, input: Option<&TeleopInput>) {
        let request = input.map_or_else(ChassisRequest::idle, |i| self.request_for(i));
        self.drivetrain.set_control(request);
    }
}

impl<D: Drivetrain> FsmSystem for DriveSystem<D> {
    type State = DriveState;

    fn name(&self) -> &str {
        "drive"
    }

    fn current_state(&self) -> DriveState {
        self.state.get()
    }

    fn reset(&mut self) -> Result<(), RobotError> {
        self.state.set(DriveState::INITIAL);
        FsmSystem::update(self, None)
    }

    fn update(&mut self, input: Option<&TeleopInput>) -> Result<(), RobotError> {
        self.holding = None;
        match self.state.get() {
            DriveState::Teleop => self.handle_teleop_state(input),
        }
        let next = self.next_state(input);
        self.state.set(next);
        Ok(())
    }

    fn next_state(&self, _input: Option<&TeleopInput>) -> DriveState {
        DriveState::Teleop
    }
}

impl<D: Drivetrain> AutoSystem for DriveSystem<D> {
    /// The drive holds still through every milestone.
    fn update_autonomous(&mut self, milestone: Milestone) -> Result<bool, RobotError> {
        self.drivetrain.set_control(ChassisRequest::idle());
        self.holding = Some(milestone);
        Ok(true)
    }
}

impl<D: Drivetrain> PoseConsumer for DriveSystem<D> {
    fn accept(&mut self, pose: Pose2d, timestamp: f64, std_devs: [f64; 3]) {
        self.drivetrain.add_vision_measurement(pose, timestamp, std_devs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    /// Records every call.
    #[derive(Default)]
    struct RecordingDrivetrain {
        requests: Vec<ChassisRequest>,
        measurements: Vec<(Pose2d, f64, [f64; 3])>,
    }

    impl Drivetrain for RecordingDrivetrain {
        fn set_control(&mut self, request: ChassisRequest) {
            self.requests.push(request);
        }

        fn pose(&self) -> Pose2d {
            Pose2d::default()
        }

        fn add_vision_measurement(&mut self, pose: Pose2d, timestamp: f64, std_devs: [f64; 3]) {
            self.measurements.push((pose, timestamp, std_devs));
        }
    }

    fn drive() -> DriveSystem<RecordingDrivetrain> {
        DriveSystem::new(RecordingDrivetrain::default(), DriveConfig::default())
    }

    #[test]
    fn construction_commands_idle() {
        let d = drive();
        assert_eq!(d.drivetrain().requests, vec![ChassisRequest::idle()]);
    }

    #[test]
    fn full_forward_stick_drives_at_max_speed() {
        let mut d = drive();
        let input = TeleopInput::new(0.0, -1.0, 0.0, 0.0);
        FsmSystem::update(&mut d, Some(&input)).unwrap();
        let r = *d.drivetrain().requests.last().unwrap();
        assert!((r.vx_mps - 4.5).abs() < EPS);
        assert!(r.vy_mps.abs() < EPS);
        assert!(r.omega_rad_per_s.abs() < EPS);
    }

    #[test]
    fn right_stick_turns_clockwise() {
        let d = drive();
        let r = d.request_for(&TeleopInput::new(0.0, 0.0, 1.0, 0.0));
        assert!((r.omega_rad_per_s + 0.75 * TAU).abs() < EPS);
    }

    #[test]
    fn small_stick_noise_is_ignored() {
        let d = drive();
        let r = d.request_for(&TeleopInput::new(0.03, -0.04, 0.05, 0.9));
        assert!(r.is_idle());
    }

    #[test]
    fn damp_scales_output() {
        let config = DriveConfig {
            translational_damp: 0.5,
            ..Default::default()
        };
        let d = DriveSystem::new(RecordingDrivetrain::default(), config);
        let r = d.request_for(&TeleopInput::new(-1.0, 0.0, 0.0, 0.0));
        assert!((r.vy_mps - 2.25).abs() < EPS);
    }

    #[test]
    fn missing_input_stops_instead_of_repeating() {
        let mut d = drive();
        FsmSystem::update(&mut d, Some(&TeleopInput::new(0.0, -1.0, 0.0, 0.0))).unwrap();
        FsmSystem::update(&mut d, None).unwrap();
        assert!(d.drivetrain().requests.last().unwrap().is_idle());
        assert_eq!(d.current_state(), DriveState::Teleop);
    }

    #[test]
    fn autonomous_holds_still_and_completes() {
        let mut d = drive();
        assert!(d.update_autonomous(Milestone::Stage2).unwrap());
        assert!(d.drivetrain().requests.last().unwrap().is_idle());
        assert_eq!(d.holding(), Some(Milestone::Stage2));

        FsmSystem::update(&mut d, None).unwrap();
        assert_eq!(d.holding(), None);
    }

    #[test]
    fn vision_measurements_reach_drivetrain() {
        let mut d = drive();
        d.accept(Pose2d::new(1.0, 2.0, 0.0), 3.5, [0.1, 0.1, 0.3]);
        let (pose, t, s) = d.drivetrain().measurements[0];
        assert!((pose.y - 2.0).abs() < EPS);
        assert!((t - 3.5).abs() < EPS);
        assert!((s[2] - 0.3).abs() < EPS);
    }

    #[test]
    fn config_defaults_from_empty_table() {
        let config: DriveConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DriveConfig::default());
    }
}
