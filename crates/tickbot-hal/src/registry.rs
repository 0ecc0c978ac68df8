//! [`MotorRegistry`] – per-tick motor telemetry aggregator.
//!
//! The registry holds a weak reference to every registered [`MotorHandle`].
//! Behavior units own their motors; the registry only observes them, and
//! silently forgets a motor once its owner drops it.
//!
//! Register motors at boot, call [`MotorRegistry::update`] once at the end
//! of every tick, and [`MotorRegistry::clear`] when tearing the robot down
//! (or between tests).
//!
//! # Log keys
//!
//! For a motor with id `33` the registry records `"Motor 33 Rotations"`,
//! `"Motor 33 Velocity"`, `"Motor 33 Setpoint"`, `"Motor 33 Voltage"` and
//! `"Motor 33 Current"`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tickbot_types::{LogValue, Recorder};
use tracing::debug;

use crate::motor::{Motor, MotorHandle, MotorTelemetry};

const LOGGING_PREFIX: &str = "Motor ";

/// Observer of every motor on the robot.
#[derive(Default)]
pub struct MotorRegistry {
    motors: Vec<Weak<RefCell<dyn Motor>>>,
}

impl MotorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing `motor`.  Registering the same handle twice is a
    /// no-op.
    pub fn register(&mut self, motor: &MotorHandle) {
        let weak = Rc::downgrade(motor);
        if self.motors.iter().any(|m| Weak::ptr_eq(m, &weak)) {
            return;
        }
        self.motors.push(weak);
    }

    /// Forget every registered motor.
    pub fn clear(&mut self) {
        self.motors.clear();
    }

    /// Number of registered motors still alive.
    pub fn len(&self) -> usize {
        self.motors.iter().filter(|m| m.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll every live motor: step its simulation by `dt` when `simulate` is
    /// set, then record its telemetry.  Returns the number of motors polled.
    pub fn update(&mut self, recorder: &mut dyn Recorder, simulate: bool, dt: f64) -> usize {
        self.motors.retain(|m| m.strong_count() > 0);

        let mut polled = 0;
        for weak in &self.motors {
            let Some(motor) = weak.upgrade() else {
                continue;
            };
            if simulate {
                motor.borrow_mut().update_sim(dt);
            }
            let t = MotorTelemetry::read(&*motor.borrow());
            let prefix = format!("{LOGGING_PREFIX}{}", t.id);
            recorder.record(&format!("{prefix} Rotations"), LogValue::Number(t.position));
            recorder.record(&format!("{prefix} Velocity"), LogValue::Number(t.velocity));
            recorder.record(&format!("{prefix} Setpoint"), LogValue::Number(t.setpoint));
            recorder.record(&format!("{prefix} Voltage"), LogValue::Number(t.voltage));
            recorder.record(&format!("{prefix} Current"), LogValue::Number(t.current));
            polled += 1;
        }
        debug!(motors = polled, "motor telemetry polled");
        polled
    }

    /// Read the current telemetry of every live motor without logging it.
    pub fn snapshot(&self) -> Vec<MotorTelemetry> {
        self.motors
            .iter()
            .filter_map(Weak::upgrade)
            .map(|m| MotorTelemetry::read(&*m.borrow()))
            .collect()
    }
}
