//! Generic `Motor` trait for open-loop motor controllers.
//!
//! A behavior unit owns the [`MotorHandle`] it drives; the
//! [`MotorRegistry`][crate::registry::MotorRegistry] only keeps a weak
//! reference for telemetry, so drivers can be swapped without touching the
//! state machines that use them.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tickbot_types::RobotError;

/// A motor controller accepting a normalised duty-cycle command.
pub trait Motor {
    /// Stable identifier, normally the CAN id, e.g. `"33"`.
    fn id(&self) -> &str;

    /// Command the motor with `value` in `[-1, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] if the command cannot be applied
    /// (e.g. the controller is faulted or the value is out of range).
    fn set(&mut self, value: f64) -> Result<(), RobotError>;

    /// The most recently applied command in `[-1, 1]`.
    fn applied(&self) -> f64;

    /// Shaft position in rotations.
    fn position(&self) -> f64;

    /// Shaft velocity in rotations per minute.
    fn velocity(&self) -> f64;

    /// Output voltage in volts.
    fn voltage(&self) -> f64;

    /// Supply current in amperes.
    fn current(&self) -> f64;

    /// Advance any simulated physics by `dt` seconds.  Real drivers ignore it.
    fn update_sim(&mut self, _dt: f64) {}
}

/// Shared, single-threaded handle to a motor driver.
pub type MotorHandle = Rc<RefCell<dyn Motor>>;

/// Wrap a concrete driver in a [`MotorHandle`].
pub fn shared<M: Motor + 'static>(motor: M) -> MotorHandle {
    Rc::new(RefCell::new(motor))
}

/// One tick's telemetry for a single motor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotorTelemetry {
    pub id: String,
    pub position: f64,
    pub velocity: f64,
    pub setpoint: f64,
    pub voltage: f64,
    pub current: f64,
}

impl MotorTelemetry {
    pub fn read(motor: &dyn Motor) -> Self {
        Self {
            id: motor.id().to_string(),
            position: motor.position(),
            velocity: motor.velocity(),
            setpoint: motor.applied(),
            voltage: motor.voltage(),
            current: motor.current(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockMotor {
        id: String,
        applied: f64,
    }

    impl Motor for MockMotor {
        fn id(&self) -> &str {
            &self.id
        }

        fn set(&mut self, value: f64) -> Result<(), RobotError> {
            self.applied = value;
            Ok(())
        }

        fn applied(&self) -> f64 {
            self.applied
        }

        fn position(&self) -> f64 {
            1.5
        }

        fn velocity(&self) -> f64 {
            60.0
        }

        fn voltage(&self) -> f64 {
            self.applied * 12.0
        }

        fn current(&self) -> f64 {
            2.0
        }
    }

    #[test]
    fn shared_handle_forwards_commands() {
        let handle = shared(MockMotor {
            id: "7".to_string(),
            applied: 0.0,
        });
        handle.borrow_mut().set(0.5).unwrap();
        assert!((handle.borrow().applied() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn telemetry_reads_every_getter() {
        let motor = MockMotor {
            id: "7".to_string(),
            applied: -0.25,
        };
        let t = MotorTelemetry::read(&motor);
        assert_eq!(t.id, "7");
        assert!((t.setpoint + 0.25).abs() < 1e-12);
        assert!((t.voltage + 3.0).abs() < 1e-12);
        assert!((t.position - 1.5).abs() < 1e-12);
        assert!((t.current - 2.0).abs() < 1e-12);
    }
}
