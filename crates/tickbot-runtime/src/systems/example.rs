//! A single-motor mechanism: idle until the operator touches the
//! controller, then run at a fixed power.

use tickbot_hal::MotorHandle;
use tickbot_types::{RobotError, TeleopInput};

use crate::fsm::{AutoSystem, FsmSystem, Milestone, StateCell, StateSpace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExampleState {
    /// Motor stopped, waiting for operator input.
    Start,
    /// Motor running at the configured power while input is present.
    Other,
}

impl StateSpace for ExampleState {
    const INITIAL: Self = ExampleState::Start;

    fn label(&self) -> &'static str {
        match self {
            ExampleState::Start => "START",
            ExampleState::Other => "OTHER",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "START" => Some(ExampleState::Start),
            "OTHER" => Some(ExampleState::Other),
            _ => None,
        }
    }
}

/// Progress on the current autonomous milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AutoAction {
    milestone: Milestone,
    ticks: u32,
    done: bool,
}

impl AutoAction {
    fn start(milestone: Milestone) -> Self {
        Self {
            milestone,
            ticks: 0,
            done: false,
        }
    }
}

pub struct ExampleSystem {
    name: String,
    state: StateCell<ExampleState>,
    motor: MotorHandle,
    run_power: f64,
    action_ticks: u32,
    action: Option<AutoAction>,
}

impl ExampleSystem {
    /// Take ownership of `motor` and reset.
    ///
    /// Under autonomy, `Stage1` runs the motor forward for `action_ticks`
    /// ticks, `Stage2` runs it in reverse for as long, and `Stage3` stops it.
    pub fn new(
        name: impl Into<String>,
        motor: MotorHandle,
        run_power: f64,
        action_ticks: u32,
    ) -> Result<Self, RobotError> {
        let mut system = Self {
            name: name.into(),
            state: StateCell::default(),
            motor,
            run_power,
            action_ticks,
            action: None,
        };
        FsmSystem::reset(&mut system)?;
        Ok(system)
    }

    pub fn motor(&self) -> &MotorHandle {
        &self.motor
    }

    fn drive(&self, power: f64) -> Result<(), RobotError> {
        self.motor.borrow_mut().set(power)
    }

    fn handle_start_state(&mut self, _input: Option<&TeleopInput>) -> Result<(), RobotError> {
        self.drive(0.0)
    }

    fn handle_other_state(&mut self, input: Option<&TeleopInput>) -> Result<(), RobotError> {
        match input {
            Some(_) => self.drive(self.run_power),
            // no operator this tick: stop rather than repeat the last command
            None => self.drive(0.0),
        }
    }
}

impl FsmSystem for ExampleSystem {
    type State = ExampleState;

    fn name(&self) -> &str {
        &self.name
    }

    fn current_state(&self) -> ExampleState {
        self.state.get()
    }

    fn reset(&mut self) -> Result<(), RobotError> {
        self.state.set(ExampleState::INITIAL);
        self.action = None;
        FsmSystem::update(self, None)
    }

    fn update(&mut self, input: Option<&TeleopInput>) -> Result<(), RobotError> {
        match self.state.get() {
            ExampleState::Start => self.handle_start_state(input)?,
            ExampleState::Other => self.handle_other_state(input)?,
        }
        let next = self.next_state(input);
        self.state.set(next);
        Ok(())
    }

    fn next_state(&self, input: Option<&TeleopInput>) -> ExampleState {
        match self.state.get() {
            ExampleState::Start if input.is_some() => ExampleState::Other,
            ExampleState::Start => ExampleState::Start,
            ExampleState::Other => ExampleState::Other,
        }
    }
}

impl AutoSystem for ExampleSystem {
    fn update_autonomous(&mut self, milestone: Milestone) -> Result<bool, RobotError> {
        let mut action = match self.action {
            Some(a) if a.milestone == milestone => a,
            _ => AutoAction::start(milestone),
        };
        if action.done {
            return Ok(true);
        }

        let (power, limit) = match milestone {
            Milestone::Stage1 => (self.run_power, self.action_ticks),
            Milestone::Stage2 => (-self.run_power, self.action_ticks),
            Milestone::Stage3 => (0.0, 0),
        };

        if action.ticks < limit {
            self.drive(power)?;
            action.ticks += 1;
        } else {
            self.drive(0.0)?;
            action.done = true;
        }
        self.action = Some(action);
        Ok(action.done)
    }

    fn begin_milestone(&mut self, _milestone: Milestone) {
        self.action = None;
    }
}
