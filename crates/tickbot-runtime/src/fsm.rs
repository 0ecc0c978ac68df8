//! Finite-state-machine core shared by every behavior unit.
//!
//! A unit owns one [`StateCell`] holding a value of its own state enum and
//! implements [`FsmSystem`]: per-tick `update` dispatches to exactly one
//! state handler, computes [`FsmSystem::next_state`] from the current state
//! and input alone, and only then commits.  Units that take part in
//! autonomous routines also implement [`AutoSystem`].
//!
//! [`Subsystem`] is the object-safe view of `FsmSystem + AutoSystem`, so a
//! [`SystemSet`][crate::system_set::SystemSet] can hold units with different
//! state types side by side.
//!
//! # State labels
//!
//! Inside a unit the state is an enum and every `match` is exhaustive, so an
//! unknown state cannot occur.  States do arrive as text when replaying a
//! diagnostics log; [`parse_state`] decodes them and reports
//! [`RobotError::InvalidState`] for anything outside the enumeration.
//!
//! ```
//! use tickbot_runtime::fsm::parse_state;
//! use tickbot_runtime::systems::ExampleState;
//!
//! let s: ExampleState = parse_state("shooter", "OTHER").unwrap();
//! assert_eq!(s, ExampleState::Other);
//! assert!(parse_state::<ExampleState>("shooter", "FLYING").is_err());
//! ```

use std::fmt::{self, Debug};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tickbot_types::{RobotError, TeleopInput};

// ────────────────────────────────────────────────────────────────────────────
// State space
// ────────────────────────────────────────────────────────────────────────────

/// A finite enumeration of unit states.
pub trait StateSpace: Copy + Eq + Debug + 'static {
    /// The state a unit enters on `reset`.
    const INITIAL: Self;

    /// Stable upper-case label used in logs.
    fn label(&self) -> &'static str;

    fn from_label(label: &str) -> Option<Self>;
}

/// Decode a state label for `system`.
pub fn parse_state<S: StateSpace>(system: &str, label: &str) -> Result<S, RobotError> {
    S::from_label(label).ok_or_else(|| RobotError::InvalidState {
        system: system.to_string(),
        state: label.to_string(),
    })
}

/// Holder of a unit's current state.  Readable by anyone; only code in this
/// crate can change it.
#[derive(Debug, Clone)]
pub struct StateCell<S> {
    current: S,
}

impl<S: StateSpace> StateCell<S> {
    pub fn new(initial: S) -> Self {
        Self { current: initial }
    }

    pub fn get(&self) -> S {
        self.current
    }

    pub(crate) fn set(&mut self, state: S) {
        self.current = state;
    }
}

impl<S: StateSpace> Default for StateCell<S> {
    fn default() -> Self {
        Self::new(S::INITIAL)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Milestones
// ────────────────────────────────────────────────────────────────────────────

/// Shared checkpoints of an autonomous routine.  Each unit maps a milestone
/// onto its own action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Milestone {
    Stage1,
    Stage2,
    Stage3,
}

impl Milestone {
    pub fn label(self) -> &'static str {
        match self {
            Milestone::Stage1 => "STAGE1",
            Milestone::Stage2 => "STAGE2",
            Milestone::Stage3 => "STAGE3",
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Milestone {
    type Err = RobotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stage1" => Ok(Milestone::Stage1),
            "stage2" => Ok(Milestone::Stage2),
            "stage3" => Ok(Milestone::Stage3),
            _ => Err(RobotError::Config(format!("unknown milestone '{s}'"))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Unit traits
// ────────────────────────────────────────────────────────────────────────────

/// A behavior unit driven once per tick.
pub trait FsmSystem {
    type State: StateSpace;

    fn name(&self) -> &str;

    fn current_state(&self) -> Self::State;

    /// Enter [`StateSpace::INITIAL`] and run one `update(None)` so outputs
    /// reflect it.  Safe to call any number of times.
    fn reset(&mut self) -> Result<(), RobotError>;

    /// Run the current state's handler, then commit
    /// [`next_state`][FsmSystem::next_state].  `None` means no operator
    /// input: hold the safe default.  On error the state is left unchanged.
    fn update(&mut self, input: Option<&TeleopInput>) -> Result<(), RobotError>;

    /// The state after this tick.  Must depend only on the current state and
    /// `input`.
    fn next_state(&self, input: Option<&TeleopInput>) -> Self::State;
}

/// A unit that can take part in an autonomous routine.
pub trait AutoSystem: FsmSystem {
    /// Make at most one tick of progress on `milestone` and report whether
    /// it is complete.  Keeps returning `true` once complete.  Does not call
    /// [`FsmSystem::update`].
    fn update_autonomous(&mut self, milestone: Milestone) -> Result<bool, RobotError>;

    /// Called once before the first [`update_autonomous`][Self::update_autonomous]
    /// of each step in a routine, so a milestone listed twice in a row is
    /// worked twice.  Drop any progress latched for the previous step here.
    fn begin_milestone(&mut self, _milestone: Milestone) {}
}

/// Object-safe view of a behavior unit.
pub trait Subsystem {
    fn name(&self) -> &str;

    /// Label of the current state.
    fn state_label(&self) -> &'static str;

    fn reset(&mut self) -> Result<(), RobotError>;

    fn update(&mut self, input: Option<&TeleopInput>) -> Result<(), RobotError>;

    fn update_autonomous(&mut self, milestone: Milestone) -> Result<bool, RobotError>;

    fn begin_milestone(&mut self, _milestone: Milestone) {}
}

impl<T: AutoSystem> Subsystem for T {
    fn name(&self) -> &str {
        FsmSystem::name(self)
    }

    fn state_label(&self) -> &'static str {
        self.current_state().label()
    }

    fn reset(&mut self) -> Result<(), RobotError> {
        FsmSystem::reset(self)
    }

    fn update(&mut self, input: Option<&TeleopInput>) -> Result<(), RobotError> {
        FsmSystem::update(self, input)
    }

    fn update_autonomous(&mut self, milestone: Milestone) -> Result<bool, RobotError> {
        AutoSystem::update_autonomous(self, milestone)
    }

    fn begin_milestone(&mut self, milestone: Milestone) {
        AutoSystem::begin_milestone(self, milestone)
    }
}
