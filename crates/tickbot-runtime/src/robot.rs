//! [`Robot`] – the timed robot host.
//!
//! The host owns every behavior unit, the drive, the vision pipeline, the
//! autonomous handler and the motor registry, and exposes one entry point
//! per operating mode in the usual timed-robot shape:
//!
//! | Mode | Init | Periodic |
//! |---|---|---|
//! | Disabled | [`Robot::disabled_init`] | [`Robot::disabled_periodic`] |
//! | Autonomous | [`Robot::autonomous_init`] | [`Robot::autonomous_periodic`] |
//! | Teleop | [`Robot::teleop_init`] | [`Robot::teleop_periodic`] |
//! | Test | [`Robot::test_init`] | [`Robot::test_periodic`] |
//!
//! [`Robot::robot_periodic`] runs after the mode's periodic every tick:
//! simulated physics, vision into the drive's pose estimator, motor
//! telemetry and unit states.  [`Robot::tick`] does both.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tickbot_hal::{MotorHandle, MotorRegistry};
use tickbot_types::{LogValue, MemoryRecorder, Pose2d, Recorder, RobotError, RobotMode, TeleopInput};
use tickbot_vision::{Vision, VisionConfig, VisionSummary};
use tracing::{error, info};

use crate::auto_handler::{AutoHandler, AutoPath, AutoStatus};
use crate::drivetrain::Drivetrain;
use crate::fsm::{AutoSystem, FsmSystem};
use crate::system_set::SystemSet;
use crate::systems::{DriveConfig, DriveSystem, SubsystemConfig, build_subsystem};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Tick period in milliseconds.
    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,
    /// Routine run by [`Robot::autonomous_init`].
    #[serde(default = "default_auto_path")]
    pub auto_path: String,
    /// Power mechanisms run at in their active state.
    #[serde(default = "default_example_run_power")]
    pub example_run_power: f64,
    /// Ticks a mechanism spends on a timed autonomous action.
    #[serde(default = "default_auto_action_ticks")]
    pub auto_action_ticks: u32,
    #[serde(default = "default_subsystems")]
    pub subsystems: Vec<SubsystemConfig>,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub vision: VisionConfig,
}

fn default_loop_period_ms() -> u64 {
    20
}

fn default_auto_path() -> String {
    AutoPath::Path1.to_string()
}

fn default_subsystems() -> Vec<SubsystemConfig> {
    vec![
        SubsystemConfig::new("shooter", 33, true),
        SubsystemConfig::new("intake", 34, false),
        SubsystemConfig::new("feeder", 35, false),
    ]
}

fn default_example_run_power() -> f64 {
    0.1
}

fn default_auto_action_ticks() -> u32 {
    25
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            loop_period_ms: default_loop_period_ms(),
            auto_path: default_auto_path(),
            example_run_power: default_example_run_power(),
            auto_action_ticks: default_auto_action_ticks(),
            subsystems: default_subsystems(),
            drive: DriveConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

impl RobotConfig {
    /// Tick period in seconds.
    pub fn period_s(&self) -> f64 {
        self.loop_period_ms as f64 / 1000.0
    }

    /// Reject settings the robot cannot run with.
    pub fn validate(&self) -> Result<(), RobotError> {
        if self.loop_period_ms == 0 {
            return Err(RobotError::Config("loop_period_ms must be positive".to_string()));
        }
        if !(self.example_run_power.is_finite() && self.example_run_power.abs() <= 1.0) {
            return Err(RobotError::Config(format!(
                "example_run_power {} outside [-1, 1]",
                self.example_run_power
            )));
        }
        let mut names: Vec<&str> = self.subsystems.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if let Some(w) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(RobotError::Config(format!("duplicate subsystem '{}'", w[0])));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Robot
// ────────────────────────────────────────────────────────────────────────────

pub struct Robot<D: Drivetrain, R: Recorder = MemoryRecorder> {
    config: RobotConfig,
    systems: SystemSet,
    drive: DriveSystem<D>,
    vision: Vision,
    auto: AutoHandler,
    motors: MotorRegistry,
    recorder: R,
    mode: RobotMode,
    sim_clock: Option<Rc<Cell<f64>>>,
    last_vision: VisionSummary,
}

impl<D: Drivetrain> Robot<D, MemoryRecorder> {
    /// Boot with an in-memory diagnostics table.
    pub fn new(
        config: RobotConfig,
        drivetrain: D,
        vision: Vision,
        motor_factory: &mut dyn FnMut(&SubsystemConfig) -> MotorHandle,
    ) -> Result<Self, RobotError> {
        Self::with_recorder(config, drivetrain, vision, MemoryRecorder::new(), motor_factory)
    }
}

impl<D: Drivetrain, R: Recorder> Robot<D, R> {
    /// Boot: validate `config`, build one unit per configured mechanism and
    /// register their motors.  The robot starts disabled.
    ///
    /// # Errors
    ///
    /// [`RobotError::Config`] for invalid settings, or the error of a
    /// mechanism whose motor refuses its initial command.
    pub fn with_recorder(
        config: RobotConfig,
        drivetrain: D,
        vision: Vision,
        recorder: R,
        motor_factory: &mut dyn FnMut(&SubsystemConfig) -> MotorHandle,
    ) -> Result<Self, RobotError> {
        config.validate()?;

        let mut systems = SystemSet::new();
        let mut motors = MotorRegistry::new();
        for sub in &config.subsystems {
            let built = build_subsystem(
                sub,
                config.example_run_power,
                config.auto_action_ticks,
                motor_factory,
            )?;
            if let Some(motor) = &built.motor {
                motors.register(motor);
            }
            systems.push(built.system);
        }

        let drive = DriveSystem::new(drivetrain, config.drive.clone());
        info!(
            systems = systems.len(),
            motors = motors.len(),
            cameras = vision.camera_count(),
            "robot booted"
        );

        Ok(Self {
            config,
            systems,
            drive,
            vision,
            auto: AutoHandler::new(),
            motors,
            recorder,
            mode: RobotMode::Disabled,
            sim_clock: None,
            last_vision: VisionSummary::default(),
        })
    }

    /// Run in simulation: step simulated physics every tick and advance
    /// `clock` by one period before the cameras are polled.
    pub fn with_sim_clock(mut self, clock: Rc<Cell<f64>>) -> Self {
        self.sim_clock = Some(clock);
        self
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    pub fn systems(&self) -> &SystemSet {
        &self.systems
    }

    pub fn drive(&self) -> &DriveSystem<D> {
        &self.drive
    }

    pub fn vision(&self) -> &Vision {
        &self.vision
    }

    pub fn auto_handler(&self) -> &AutoHandler {
        &self.auto
    }

    pub fn motors(&self) -> &MotorRegistry {
        &self.motors
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Counts from the most recent vision tick.
    pub fn last_vision(&self) -> &VisionSummary {
        &self.last_vision
    }

    pub fn pose(&self) -> Pose2d {
        self.drive.pose()
    }

    fn enter(&mut self, mode: RobotMode) {
        info!(from = %self.mode, to = %mode, "mode change");
        self.mode = mode;
        self.recorder
            .record("Robot/Mode", LogValue::Text(mode.to_string()));
    }

    fn update_drive(&mut self, input: Option<&TeleopInput>) {
        if let Err(e) = FsmSystem::update(&mut self.drive, input) {
            error!(error = %e, "drive update failed");
        }
    }

    // ── Disabled ────────────────────────────────────────────────────────────

    /// Cut every output: units go back to their initial state and the
    /// drive is sent an idle request.
    pub fn disabled_init(&mut self) {
        self.enter(RobotMode::Disabled);
        self.systems.reset_all();
        self.reset_drive();
    }

    pub fn disabled_periodic(&mut self) {
        self.update_drive(None);
    }

    // ── Autonomous ──────────────────────────────────────────────────────────

    /// Start the configured routine.
    ///
    /// # Errors
    ///
    /// [`RobotError::UnknownAutoPath`] when the configured name is not in
    /// the catalog; the robot then sits idle for the rest of the period.
    pub fn autonomous_init(&mut self) -> Result<AutoPath, RobotError> {
        self.enter(RobotMode::Autonomous);
        self.reset_drive();
        let name = self.config.auto_path.clone();
        self.auto.reset_named(&name, &mut self.systems)
    }

    /// Start `path` regardless of configuration.
    pub fn autonomous_init_with(&mut self, path: AutoPath) {
        self.enter(RobotMode::Autonomous);
        self.reset_drive();
        self.auto.reset(path, &mut self.systems);
    }

    /// One tick of the routine.  The drive holds still for the current
    /// milestone, and gets no input once the routine is over.
    pub fn autonomous_periodic(&mut self) -> AutoStatus {
        let milestone = self.auto.current_milestone();
        let status = self.auto.update(&mut self.systems, &mut self.recorder);
        match milestone {
            Some(m) => {
                if let Err(e) = AutoSystem::update_autonomous(&mut self.drive, m) {
                    error!(error = %e, "drive autonomous update failed");
                }
            }
            None => self.update_drive(None),
        }
        status
    }

    // ── Teleop ──────────────────────────────────────────────────────────────

    pub fn teleop_init(&mut self) {
        self.enter(RobotMode::Teleop);
        self.systems.reset_all();
        self.reset_drive();
    }

    /// Returns the number of units that faulted this tick.
    pub fn teleop_periodic(&mut self, input: Option<&TeleopInput>) -> usize {
        let failed = self.systems.update_all(input);
        self.update_drive(input);
        failed
    }

    // ── Test ────────────────────────────────────────────────────────────────

    pub fn test_init(&mut self) {
        self.enter(RobotMode::Test);
    }

    pub fn test_periodic(&mut self) {}

    // ── Every tick ──────────────────────────────────────────────────────────

    fn reset_drive(&mut self) {
        if let Err(e) = FsmSystem::reset(&mut self.drive) {
            error!(error = %e, "drive reset failed");
        }
    }

    /// Mode-independent work, run after the mode's periodic.
    pub fn robot_periodic(&mut self) {
        let dt = self.config.period_s();
        let simulate = self.sim_clock.is_some();
        if let Some(clock) = &self.sim_clock {
            self.drive.drivetrain_mut().update_sim(dt);
            clock.set(clock.get() + dt);
        }

        self.last_vision = self.vision.periodic(&mut self.drive, &mut self.recorder);
        self.motors.update(&mut self.recorder, simulate, dt);
        self.systems.record(&mut self.recorder);
        self.recorder
            .record("Drive/Pose", LogValue::Pose2d(self.drive.pose()));
    }

    /// Run the current mode's periodic, then [`robot_periodic`][Self::robot_periodic].
    /// `input` is only used in teleop.
    pub fn tick(&mut self, input: Option<&TeleopInput>) {
        match self.mode {
            RobotMode::Disabled => self.disabled_periodic(),
            RobotMode::Autonomous => {
                self.autonomous_periodic();
            }
            RobotMode::Teleop => {
                self.teleop_periodic(input);
            }
            RobotMode::Test => self.test_periodic(),
        }
        self.robot_periodic();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::SimDrivetrain;
    use crate::fsm::Milestone;
    use tickbot_hal::{SimMotor, shared};
    use tickbot_vision::AprilTagLayout;

    fn sim_factory(c: &SubsystemConfig) -> MotorHandle {
        shared(SimMotor::new(c.can_id.to_string()))
    }

    fn robot(config: RobotConfig) -> Robot<SimDrivetrain> {
        let vision = Vision::new(
            config.vision.clone(),
            Box::new(AprilTagLayout::test_field()),
            Vec::new(),
        );
        Robot::new(config, SimDrivetrain::new(Pose2d::new(2.0, 2.0, 0.0)), vision, &mut sim_factory)
            .unwrap()
    }

    #[test]
    fn boots_disabled_with_configured_units() {
        let r = robot(RobotConfig::default());
        assert_eq!(r.mode(), RobotMode::Disabled);
        assert_eq!(r.systems().names(), vec!["shooter", "intake", "feeder"]);
        assert_eq!(r.motors().len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = RobotConfig::default();
        config.loop_period_ms = 0;
        assert!(matches!(config.validate(), Err(RobotError::Config(_))));

        let mut config = RobotConfig::default();
        config.example_run_power = 1.5;
        assert!(config.validate().is_err());

        let mut config = RobotConfig::default();
        config.subsystems.push(SubsystemConfig::new("shooter", 40, false));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shooter"));
    }

    #[test]
    fn autonomous_runs_configured_path() {
        let mut config = RobotConfig::default();
        config.auto_action_ticks = 0;
        let mut r = robot(config);
        assert_eq!(r.autonomous_init(), Ok(AutoPath::Path1));
        for _ in 0..10 {
            r.tick(None);
        }
        assert!(r.auto_handler().is_finished());
        assert_eq!(
            r.recorder().get("Robot/Mode"),
            Some(&LogValue::Text("autonomous".to_string()))
        );
    }

    #[test]
    fn bad_auto_path_leaves_robot_idle() {
        let mut config = RobotConfig::default();
        config.auto_path = "sideways".to_string();
        let mut r = robot(config);
        assert!(matches!(r.autonomous_init(), Err(RobotError::UnknownAutoPath(_))));
        assert_eq!(r.autonomous_periodic(), AutoStatus::Finished);
    }

    #[test]
    fn teleop_input_drives_mechanism_and_chassis() {
        let mut r = robot(RobotConfig::default());
        r.teleop_init();
        let input = TeleopInput::new(0.0, -1.0, 0.0, 0.0);
        r.tick(Some(&input));
        r.tick(Some(&input));
        assert_eq!(r.systems().states()[0], ("shooter", "OTHER"));
        assert!(r.drive().drivetrain().last_request().vx_mps > 4.0);
        assert_eq!(r.recorder().number("Motor 33 Setpoint"), Some(0.1));
    }

    #[test]
    fn drive_holds_for_each_milestone_then_idles() {
        let mut config = RobotConfig::default();
        config.auto_action_ticks = 1;
        let mut r = robot(config);
        r.autonomous_init_with(AutoPath::Path2);
        r.tick(None);
        assert_eq!(r.drive().holding(), Some(Milestone::Stage3));
        while !r.auto_handler().is_finished() {
            r.tick(None);
        }
        assert_eq!(r.drive().holding(), Some(Milestone::Stage1));

        r.tick(None);
        assert_eq!(r.drive().holding(), None);
        assert!(r.drive().drivetrain().last_request().is_idle());
    }

    #[test]
    fn disabling_stops_mechanisms_and_drive() {
        let mut r = robot(RobotConfig::default());
        r.teleop_init();
        let input = TeleopInput::new(0.0, -1.0, 0.0, 0.0);
        r.tick(Some(&input));
        r.tick(Some(&input));
        assert_eq!(r.recorder().number("Motor 33 Setpoint"), Some(0.1));

        r.disabled_init();
        r.tick(None);
        assert_eq!(r.systems().states()[0], ("shooter", "START"));
        assert_eq!(r.recorder().number("Motor 33 Setpoint"), Some(0.0));
        assert!(r.drive().drivetrain().last_request().is_idle());
        assert_eq!(
            r.recorder().get("Robot/Mode"),
            Some(&LogValue::Text("disabled".to_string()))
        );
    }

    #[test]
    fn sim_clock_advances_and_moves_robot() {
        let clock = Rc::new(Cell::new(0.0));
        let mut r = robot(RobotConfig::default()).with_sim_clock(Rc::clone(&clock));
        r.teleop_init();
        let input = TeleopInput::new(0.0, -1.0, 0.0, 0.0);
        for _ in 0..5 {
            r.tick(Some(&input));
        }
        assert!((clock.get() - 0.1).abs() < 1e-9);
        assert!(r.pose().x > 2.0);
        assert!(r.recorder().get("Drive/Pose").is_some());
    }

    #[test]
    fn config_from_partial_json_keeps_defaults() {
        let config: RobotConfig =
            serde_json::from_str(r#"{ "auto_path": "path3", "drive": { "max_speed_mps": 3.0 } }"#)
                .unwrap();
        assert_eq!(config.auto_path, "path3");
        assert_eq!(config.loop_period_ms, 20);
        assert_eq!(config.subsystems.len(), 3);
        assert!((config.drive.max_speed_mps - 3.0).abs() < 1e-12);
        assert!((config.drive.translation_deadband - 0.05).abs() < 1e-12);
        assert!((config.vision.max_ambiguity - 0.1).abs() < 1e-12);
    }
}
