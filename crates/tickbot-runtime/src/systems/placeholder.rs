//! Stand-in for a mechanism that is not installed on this robot.

use tickbot_types::{RobotError, TeleopInput};

use crate::fsm::{AutoSystem, FsmSystem, Milestone, StateCell, StateSpace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderState {
    Idle,
}

impl StateSpace for PlaceholderState {
    const INITIAL: Self = PlaceholderState::Idle;

    fn label(&self) -> &'static str {
        "IDLE"
    }

    fn from_label(label: &str) -> Option<Self> {
        (label == "IDLE").then_some(PlaceholderState::Idle)
    }
}

/// Drives nothing and completes every autonomous milestone at once, so a
/// missing mechanism never holds up a routine.
pub struct PlaceholderSystem {
    name: String,
    state: StateCell<PlaceholderState>,
}

impl PlaceholderSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: StateCell::default(),
        }
    }
}

impl FsmSystem for PlaceholderSystem {
    type State = PlaceholderState;

    fn name(&self) -> &str {
        &self.name
    }

    fn current_state(&self) -> PlaceholderState {
        self.state.get()
    }

    fn reset(&mut self) -> Result<(), RobotError> {
        self.state.set(PlaceholderState::INITIAL);
        FsmSystem::update(self, None)
    }

    fn update(&mut self, input: Option<&TeleopInput>) -> Result<(), RobotError> {
        match self.state.get() {
            PlaceholderState::Idle => {}
        }
        let next = self.next_state(input);
        self.state.set(next);
        Ok(())
    }

    fn next_state(&self, _input: Option<&TeleopInput>) -> PlaceholderState {
        PlaceholderState::Idle
    }
}

impl AutoSystem for PlaceholderSystem {
    fn update_autonomous(&mut self, _milestone: Milestone) -> Result<bool, RobotError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_idle() {
        let mut p = PlaceholderSystem::new("intake");
        FsmSystem::update(&mut p, Some(&TeleopInput::default())).unwrap();
        assert_eq!(p.current_state(), PlaceholderState::Idle);
        FsmSystem::reset(&mut p).unwrap();
        assert_eq!(p.current_state(), PlaceholderState::Idle);
    }

    #[test]
    fn milestones_complete_immediately() {
        let mut p = PlaceholderSystem::new("intake");
        for m in [Milestone::Stage1, Milestone::Stage2, Milestone::Stage3] {
            assert!(p.update_autonomous(m).unwrap());
        }
    }

    #[test]
    fn label_round_trip() {
        assert_eq!(PlaceholderState::from_label("IDLE"), Some(PlaceholderState::Idle));
        assert_eq!(PlaceholderState::from_label("RUNNING"), None);
    }
}
