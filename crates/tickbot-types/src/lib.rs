//! `tickbot-types` – shared vocabulary for every tickbot crate.
//!
//! # Modules
//!
//! - [`geometry`] – rigid-body poses and transforms ([`Pose3d`][geometry::Pose3d],
//!   [`Pose2d`][geometry::Pose2d], [`Transform3d`][geometry::Transform3d]).
//! - [`recorder`] – the [`Recorder`][recorder::Recorder] diagnostics sink and
//!   its in-memory and `tracing` implementations.
//! - [`alert`] – edge-triggered operator [`Alert`][alert::Alert]s.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod alert;
pub mod geometry;
pub mod recorder;

pub use alert::{Alert, AlertLevel};
pub use geometry::{Pose2d, Pose3d, Rotation3d, Transform3d, Translation3d};
pub use recorder::{LogValue, MemoryRecorder, Recorder, TracingRecorder};

/// Operating mode of the robot, as selected by the field or driver station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotMode {
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl std::fmt::Display for RobotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RobotMode::Disabled => write!(f, "disabled"),
            RobotMode::Autonomous => write!(f, "autonomous"),
            RobotMode::Teleop => write!(f, "teleop"),
            RobotMode::Test => write!(f, "test"),
        }
    }
}

/// A snapshot of the operator's control surface for one tick.
///
/// Every axis is normalised to `[-1, 1]`.  Behavior units receive
/// `Option<&TeleopInput>`; `None` means no live operator input and must be
/// treated as "hold the safe state".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TeleopInput {
    left_x: f64,
    left_y: f64,
    right_x: f64,
    right_y: f64,
}

impl TeleopInput {
    /// Build an input snapshot.  Values are clamped to `[-1, 1]`; a
    /// non-finite axis reads as centred (`0.0`).
    pub fn new(left_x: f64, left_y: f64, right_x: f64, right_y: f64) -> Self {
        Self {
            left_x: normalize_axis(left_x),
            left_y: normalize_axis(left_y),
            right_x: normalize_axis(right_x),
            right_y: normalize_axis(right_y),
        }
    }

    /// X axis of the drive controller's left joystick.
    pub fn drive_left_x(&self) -> f64 {
        self.left_x
    }

    /// Y axis of the drive controller's left joystick.
    pub fn drive_left_y(&self) -> f64 {
        self.left_y
    }

    /// X axis of the drive controller's right joystick.
    pub fn drive_right_x(&self) -> f64 {
        self.right_x
    }

    /// Y axis of the drive controller's right joystick.
    pub fn drive_right_y(&self) -> f64 {
        self.right_y
    }
}

fn normalize_axis(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Zero out `value` inside `[-deadband, deadband]` and rescale the remainder
/// so the output still spans `[-1, 1]`.
pub fn apply_deadband(value: f64, deadband: f64) -> f64 {
    if value.abs() <= deadband {
        return 0.0;
    }
    if deadband >= 1.0 {
        return 0.0;
    }
    if value > 0.0 {
        (value - deadband) / (1.0 - deadband)
    } else {
        (value + deadband) / (1.0 - deadband)
    }
}

/// Global error type spanning actuation faults, state decoding, routine
/// selection, and configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RobotError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Invalid state '{state}' for system {system}")]
    InvalidState { system: String, state: String },

    #[error("System {system} is halted after a fault; reset it before updating")]
    Halted { system: String },

    #[error("Unknown autonomous path: {0}")]
    UnknownAutoPath(String),

    #[error("Field layout error: {0}")]
    FieldLayout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
