//! In-process simulated motor for CI runs and headless simulation.
//!
//! [`SimMotor`] records every command and integrates a first-order velocity
//! response when [`Motor::update_sim`] is called, so telemetry looks
//! plausible without any hardware attached.
//!
//! # Example
//!
//! ```rust
//! use tickbot_hal::{Motor, SimMotor};
//!
//! let mut motor = SimMotor::new("33");
//! motor.set(1.0).unwrap();
//! for _ in 0..50 {
//!     motor.update_sim(0.02);
//! }
//! assert!(motor.velocity() > 0.9 * SimMotor::DEFAULT_FREE_SPEED_RPM);
//! ```

use tickbot_types::RobotError;

use crate::motor::Motor;

/// A simulated brushless motor with a first-order velocity response.
#[derive(Debug, Clone)]
pub struct SimMotor {
    id: String,
    applied: f64,
    position_rot: f64,
    velocity_rpm: f64,
    free_speed_rpm: f64,
    stall_current_a: f64,
    free_current_a: f64,
    battery_voltage: f64,
    time_constant_s: f64,
    fault: Option<String>,
}

impl SimMotor {
    pub const DEFAULT_FREE_SPEED_RPM: f64 = 11_000.0;
    const DEFAULT_STALL_CURRENT_A: f64 = 100.0;
    const DEFAULT_FREE_CURRENT_A: f64 = 1.4;
    const NOMINAL_VOLTAGE: f64 = 12.0;
    const DEFAULT_TIME_CONSTANT_S: f64 = 0.05;

    /// Create a simulated motor with small-brushless defaults.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            applied: 0.0,
            position_rot: 0.0,
            velocity_rpm: 0.0,
            free_speed_rpm: Self::DEFAULT_FREE_SPEED_RPM,
            stall_current_a: Self::DEFAULT_STALL_CURRENT_A,
            free_current_a: Self::DEFAULT_FREE_CURRENT_A,
            battery_voltage: Self::NOMINAL_VOLTAGE,
            time_constant_s: Self::DEFAULT_TIME_CONSTANT_S,
            fault: None,
        }
    }

    /// Override the unloaded top speed.
    pub fn with_free_speed(mut self, rpm: f64) -> Self {
        self.free_speed_rpm = rpm;
        self
    }

    pub fn set_battery_voltage(&mut self, volts: f64) {
        self.battery_voltage = volts;
    }

    /// Make every subsequent [`Motor::set`] fail with `details`.
    pub fn inject_fault(&mut self, details: impl Into<String>) {
        self.fault = Some(details.into());
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
    }
}

impl Motor for SimMotor {
    fn id(&self) -> &str {
        &self.id
    }

    fn set(&mut self, value: f64) -> Result<(), RobotError> {
        if let Some(details) = &self.fault {
            return Err(RobotError::HardwareFault {
                component: format!("Motor {}", self.id),
                details: details.clone(),
            });
        }
        if !value.is_finite() || value.abs() > 1.0 {
            return Err(RobotError::HardwareFault {
                component: format!("Motor {}", self.id),
                details: format!("command {value} outside [-1, 1]"),
            });
        }
        self.applied = value;
        Ok(())
    }

    fn applied(&self) -> f64 {
        self.applied
    }

    fn position(&self) -> f64 {
        self.position_rot
    }

    fn velocity(&self) -> f64 {
        self.velocity_rpm
    }

    fn voltage(&self) -> f64 {
        self.applied * self.battery_voltage
    }

    fn current(&self) -> f64 {
        let slip = if self.free_speed_rpm > 0.0 {
            (self.applied - self.velocity_rpm / self.free_speed_rpm).abs()
        } else {
            0.0
        };
        if self.applied == 0.0 && self.velocity_rpm == 0.0 {
            0.0
        } else {
            self.free_current_a + (self.stall_current_a - self.free_current_a) * slip.min(1.0)
        }
    }

    fn update_sim(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let target =
            self.applied * self.free_speed_rpm * (self.battery_voltage / Self::NOMINAL_VOLTAGE);
        let alpha = (dt / self.time_constant_s).min(1.0);
        self.velocity_rpm += (target - self.velocity_rpm) * alpha;
        self.position_rot += self.velocity_rpm / 60.0 * dt;
    }
}
