//! Concrete behavior units and the boot-time factory that picks between a
//! real mechanism and its placeholder.

pub mod drive;
pub mod example;
pub mod placeholder;

pub use drive::{DriveConfig, DriveState, DriveSystem};
pub use example::{ExampleState, ExampleSystem};
pub use placeholder::{PlaceholderState, PlaceholderSystem};

use serde::{Deserialize, Serialize};
use tickbot_hal::MotorHandle;
use tickbot_types::RobotError;
use tracing::info;

use crate::fsm::Subsystem;

/// One mechanism slot on the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemConfig {
    pub name: String,
    /// CAN id of the mechanism's motor controller.
    pub can_id: u32,
    /// Whether the mechanism is physically installed.
    #[serde(default)]
    pub present: bool,
}

impl SubsystemConfig {
    pub fn new(name: impl Into<String>, can_id: u32, present: bool) -> Self {
        Self {
            name: name.into(),
            can_id,
            present,
        }
    }
}

/// Output of [`build_subsystem`].
pub struct BuiltSubsystem {
    pub system: Box<dyn Subsystem>,
    /// The motor the unit owns, if any, for telemetry registration.
    pub motor: Option<MotorHandle>,
}

/// Build the unit for `config`: an [`ExampleSystem`] on a motor from
/// `motor_factory` when the hardware is present, otherwise a
/// [`PlaceholderSystem`].
pub fn build_subsystem(
    config: &SubsystemConfig,
    run_power: f64,
    auto_action_ticks: u32,
    motor_factory: &mut dyn FnMut(&SubsystemConfig) -> MotorHandle,
) -> Result<BuiltSubsystem, RobotError> {
    if !config.present {
        info!(system = %config.name, "hardware absent, using placeholder");
        return Ok(BuiltSubsystem {
            system: Box::new(PlaceholderSystem::new(config.name.clone())),
            motor: None,
        });
    }
    let motor = motor_factory(config);
    let system = ExampleSystem::new(
        config.name.clone(),
        MotorHandle::clone(&motor),
        run_power,
        auto_action_ticks,
    )?;
    info!(system = %config.name, can_id = config.can_id, "mechanism online");
    Ok(BuiltSubsystem {
        system: Box::new(system),
        motor: Some(motor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickbot_hal::{Motor, SimMotor, shared};

    fn sim_factory(config: &SubsystemConfig) -> MotorHandle {
        shared(SimMotor::new(config.can_id.to_string()))
    }

    #[test]
    fn present_hardware_gets_real_unit() {
        let built = build_subsystem(&SubsystemConfig::new("shooter", 33, true), 0.1, 5, &mut sim_factory).unwrap();
        assert_eq!(built.system.name(), "shooter");
        assert_eq!(built.system.state_label(), "START");
        assert_eq!(built.motor.unwrap().borrow().id(), "33");
    }

    #[test]
    fn absent_hardware_gets_placeholder() {
        let mut calls = 0;
        let mut factory = |c: &SubsystemConfig| {
            calls += 1;
            sim_factory(c)
        };
        let built = build_subsystem(&SubsystemConfig::new("intake", 34, false), 0.1, 5, &mut factory).unwrap();
        assert_eq!(built.system.state_label(), "IDLE");
        assert!(built.motor.is_none());
        assert_eq!(calls, 0);
    }

    #[test]
    fn faulted_motor_fails_construction() {
        let mut factory = |c: &SubsystemConfig| {
            let mut m = SimMotor::new(c.can_id.to_string());
            m.inject_fault("no response");
            shared(m)
        };
        let result = build_subsystem(&SubsystemConfig::new("feeder", 35, true), 0.1, 5, &mut factory);
        assert!(matches!(result, Err(RobotError::HardwareFault { .. })));
    }

    #[test]
    fn present_defaults_to_false() {
        let c: SubsystemConfig = serde_json::from_str(r#"{ "name": "arm", "can_id": 40 }"#).unwrap();
        assert!(!c.present);
    }
}
