//! Simulated robot wiring and the timed tick loop behind `tickbot run`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tickbot_hal::{MotorHandle, SimMotor};
use tickbot_runtime::{AutoPath, Robot, SimDrivetrain, SubsystemConfig};
use tickbot_types::{Pose2d, RobotMode, TeleopInput};
use tickbot_vision::{AprilTagLayout, FieldLayout, PoseSource, SimPoseSource, Vision};
use tracing::{info, warn};

use crate::config::Config;

/// Which modes `run` drives the robot through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Plan {
    Auto,
    Teleop,
    /// Autonomous for the first half of the run, teleop for the rest.
    Both,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub plan: Plan,
    /// Overrides the configured routine.
    pub path: Option<AutoPath>,
    pub seconds: f64,
    /// Held on the sticks for every teleop tick.
    pub input: TeleopInput,
    /// Sleep to hold the loop period.  Off runs as fast as possible.
    pub realtime: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub ticks: u64,
    pub overruns: u64,
    pub interrupted: bool,
    /// `None` when no routine could be started.
    pub auto_path: Option<AutoPath>,
    pub auto_finished: bool,
    pub vision_accepted: usize,
    pub vision_rejected: usize,
    pub halted: usize,
    pub estimate: Pose2d,
    pub truth: Pose2d,
}

impl RunReport {
    pub fn estimate_error(&self) -> f64 {
        self.estimate.distance_to(&self.truth)
    }
}

/// Build a simulated robot from `config`: a [`SimMotor`] per present
/// mechanism, a slipping [`SimDrivetrain`] and one [`SimPoseSource`] per
/// configured camera.
pub fn build_sim_robot(config: &Config) -> Result<Robot<SimDrivetrain>, String> {
    let field = match &config.sim.field_layout {
        Some(path) => AprilTagLayout::load(path).map_err(|e| e.to_string())?,
        None => AprilTagLayout::test_field(),
    };
    let drivetrain = SimDrivetrain::new(config.sim.start).with_wheel_slip(config.sim.wheel_slip);
    let clock = Rc::new(Cell::new(0.0));

    let sources: Vec<Box<dyn PoseSource>> = config
        .robot
        .vision
        .cameras
        .iter()
        .map(|camera| {
            Box::new(SimPoseSource::new(
                camera,
                &field as &dyn FieldLayout,
                drivetrain.ground_truth(),
                Rc::clone(&clock),
            )) as Box<dyn PoseSource>
        })
        .collect();
    info!(tags = field.len(), cameras = sources.len(), "simulated field ready");
    let vision = Vision::new(config.robot.vision.clone(), Box::new(field), sources);

    let mut factory = |c: &SubsystemConfig| -> MotorHandle {
        Rc::new(RefCell::new(SimMotor::new(c.can_id.to_string())))
    };
    let robot = Robot::new(config.robot.clone(), drivetrain, vision, &mut factory)
        .map_err(|e| e.to_string())?;
    Ok(robot.with_sim_clock(clock))
}

/// Number of ticks `seconds` takes at `period_ms`; at least one.
pub fn tick_count(seconds: f64, period_ms: u64) -> u64 {
    let ticks = (seconds.max(0.0) * 1000.0 / period_ms.max(1) as f64).ceil() as u64;
    ticks.max(1)
}

/// Drive `robot` through `opts`, stopping early once `shutdown` is set.
/// The robot is left disabled.
pub fn run(robot: &mut Robot<SimDrivetrain>, opts: &RunOptions, shutdown: &AtomicBool) -> RunReport {
    let period = Duration::from_millis(robot.config().loop_period_ms);
    let total = tick_count(opts.seconds, robot.config().loop_period_ms);
    let auto_ticks = match opts.plan {
        Plan::Auto => total,
        Plan::Teleop => 0,
        Plan::Both => total / 2,
    };

    let mut report = RunReport::default();
    if auto_ticks > 0 {
        report.auto_path = match opts.path {
            Some(path) => {
                robot.autonomous_init_with(path);
                Some(path)
            }
            None => match robot.autonomous_init() {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "autonomous disabled for this run");
                    None
                }
            },
        };
    } else {
        robot.teleop_init();
    }

    let mut deadline = Instant::now();
    for i in 0..total {
        if shutdown.load(Ordering::SeqCst) {
            report.interrupted = true;
            break;
        }
        if i == auto_ticks && auto_ticks > 0 {
            report.auto_finished = robot.auto_handler().is_finished();
            robot.teleop_init();
        }

        let started = Instant::now();
        robot.tick(Some(&opts.input));
        report.ticks += 1;
        report.vision_accepted += robot.last_vision().accepted;
        report.vision_rejected += robot.last_vision().rejected;

        if opts.realtime {
            let elapsed = started.elapsed();
            if elapsed > period {
                report.overruns += 1;
                warn!(tick = i, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "loop overrun");
            }
            deadline += period;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                deadline = now;
            }
        }
    }
    if robot.mode() == RobotMode::Autonomous {
        report.auto_finished = robot.auto_handler().is_finished();
    }

    robot.disabled_init();
    robot.tick(None);

    report.halted = robot.systems().halted_count();
    report.estimate = robot.pose();
    report.truth = robot.drive().drivetrain().ground_truth().get();
    info!(ticks = report.ticks, interrupted = report.interrupted, "run complete");
    report
}
