//! [`SystemSet`] – the robot's behavior units, updated together.
//!
//! A unit whose `reset`, `update` or `update_autonomous` returns an error is
//! **halted**: the fault is logged once, the unit is skipped by every later
//! bulk call, and the rest of the robot keeps running.  A successful
//! `reset` brings it back.

use tickbot_types::{LogValue, Recorder, RobotError, TeleopInput};
use tracing::{error, info};

use crate::fsm::{Milestone, Subsystem};

struct Slot {
    system: Box<dyn Subsystem>,
    fault: Option<RobotError>,
}

impl Slot {
    fn halt(&mut self, err: RobotError) {
        error!(system = %self.system.name(), error = %err, "unit halted");
        self.fault = Some(err);
    }
}

#[derive(Default)]
pub struct SystemSet {
    slots: Vec<Slot>,
}

impl SystemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit.  Units are polled in insertion order.
    pub fn push(&mut self, system: Box<dyn Subsystem>) {
        self.slots.push(Slot {
            system,
            fault: None,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.system.name()).collect()
    }

    /// `(name, state label)` for every unit.
    pub fn states(&self) -> Vec<(&str, &'static str)> {
        self.slots
            .iter()
            .map(|s| (s.system.name(), s.system.state_label()))
            .collect()
    }

    pub fn is_halted(&self, name: &str) -> bool {
        self.find(name).is_some_and(|s| s.fault.is_some())
    }

    /// The fault that halted `name`, if any.
    pub fn fault(&self, name: &str) -> Option<&RobotError> {
        self.find(name).and_then(|s| s.fault.as_ref())
    }

    pub fn halted_count(&self) -> usize {
        self.slots.iter().filter(|s| s.fault.is_some()).count()
    }

    fn find(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.system.name() == name)
    }

    /// Reset every unit, halted or not.  Returns the number that failed.
    pub fn reset_all(&mut self) -> usize {
        let mut failed = 0;
        for slot in &mut self.slots {
            match slot.system.reset() {
                Ok(()) => {
                    if slot.fault.take().is_some() {
                        info!(system = %slot.system.name(), "unit recovered after reset");
                    }
                }
                Err(e) => {
                    slot.halt(e);
                    failed += 1;
                }
            }
        }
        failed
    }

    /// One teleop tick for every running unit.  Returns the number that
    /// faulted this tick.
    pub fn update_all(&mut self, input: Option<&TeleopInput>) -> usize {
        let mut failed = 0;
        for slot in self.slots.iter_mut().filter(|s| s.fault.is_none()) {
            if let Err(e) = slot.system.update(input) {
                slot.halt(e);
                failed += 1;
            }
        }
        failed
    }

    /// Tick a single unit by name.
    ///
    /// # Errors
    ///
    /// [`RobotError::Halted`] when the unit is halted, or the unit's own
    /// error (which halts it).  [`RobotError::Config`] for an unknown name.
    pub fn update_one(&mut self, name: &str, input: Option<&TeleopInput>) -> Result<(), RobotError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.system.name() == name)
            .ok_or_else(|| RobotError::Config(format!("no system named '{name}'")))?;
        if slot.fault.is_some() {
            return Err(RobotError::Halted {
                system: name.to_string(),
            });
        }
        slot.system.update(input).inspect_err(|e| slot.halt(e.clone()))
    }

    /// Poll every running unit on `milestone`, without short-circuiting.
    /// `true` only when every unit reports completion; a halted unit never
    /// does.
    pub fn update_autonomous_all(&mut self, milestone: Milestone) -> bool {
        let mut all_done = true;
        for slot in &mut self.slots {
            if slot.fault.is_some() {
                all_done = false;
                continue;
            }
            match slot.system.update_autonomous(milestone) {
                Ok(done) => all_done &= done,
                Err(e) => {
                    slot.halt(e);
                    all_done = false;
                }
            }
        }
        all_done
    }

    /// Tell every running unit a new routine step on `milestone` starts.
    pub fn begin_milestone_all(&mut self, milestone: Milestone) {
        for slot in self.slots.iter_mut().filter(|s| s.fault.is_none()) {
            slot.system.begin_milestone(milestone);
        }
    }

    /// Record `Systems/{name}/State` and `Systems/{name}/Halted`.
    pub fn record(&self, recorder: &mut dyn Recorder) {
        for slot in &self.slots {
            let name = slot.system.name();
            recorder.record(
                &format!("Systems/{name}/State"),
                LogValue::Text(slot.system.state_label().to_string()),
            );
            recorder.record(
                &format!("Systems/{name}/Halted"),
                LogValue::Bool(slot.fault.is_some()),
            );
        }
    }
}
