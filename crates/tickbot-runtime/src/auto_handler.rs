//! [`AutoHandler`] – runs an autonomous routine as a list of milestones
//! that every behavior unit works through in lockstep.
//!
//! Each tick the current milestone is handed to **every** unit.  The handler
//! moves to the next milestone only when all of them report completion in
//! the same tick; otherwise it stays put and tries again next tick.  Once
//! past the last milestone, further updates do nothing.
//!
//! # Routines
//!
//! | Path | Milestones |
//! |---|---|
//! | `path1` | Stage1 → Stage2 → Stage3 |
//! | `path2` | Stage3 → Stage2 → Stage1 |
//! | `path3` | Stage1 → Stage3 → Stage2 |
//!
//! # Example
//!
//! ```
//! use tickbot_runtime::auto_handler::{AutoHandler, AutoPath, AutoStatus};
//! use tickbot_runtime::system_set::SystemSet;
//! use tickbot_runtime::systems::PlaceholderSystem;
//! use tickbot_types::MemoryRecorder;
//!
//! let mut systems = SystemSet::new();
//! systems.push(Box::new(PlaceholderSystem::new("intake")));
//!
//! let mut auto = AutoHandler::new();
//! auto.reset(AutoPath::Path2, &mut systems);
//! let mut rec = MemoryRecorder::new();
//! while auto.update(&mut systems, &mut rec) != AutoStatus::Finished {}
//! assert_eq!(auto.index(), 3);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tickbot_types::{LogValue, Recorder, RobotError};
use tracing::{debug, info, warn};

use crate::fsm::Milestone;
use crate::system_set::SystemSet;

/// The fixed catalog of autonomous routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoPath {
    Path1,
    Path2,
    Path3,
}

impl AutoPath {
    pub const ALL: [AutoPath; 3] = [AutoPath::Path1, AutoPath::Path2, AutoPath::Path3];

    pub fn milestones(self) -> &'static [Milestone] {
        use Milestone::*;
        match self {
            AutoPath::Path1 => &[Stage1, Stage2, Stage3],
            AutoPath::Path2 => &[Stage3, Stage2, Stage1],
            AutoPath::Path3 => &[Stage1, Stage3, Stage2],
        }
    }
}

impl fmt::Display for AutoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoPath::Path1 => write!(f, "path1"),
            AutoPath::Path2 => write!(f, "path2"),
            AutoPath::Path3 => write!(f, "path3"),
        }
    }
}

impl FromStr for AutoPath {
    type Err = RobotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path1" => Ok(AutoPath::Path1),
            "path2" => Ok(AutoPath::Path2),
            "path3" => Ok(AutoPath::Path3),
            _ => Err(RobotError::UnknownAutoPath(s.to_string())),
        }
    }
}

/// Outcome of one [`AutoHandler::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoStatus {
    /// Some unit has not finished the milestone yet.
    Holding(Milestone),
    /// Every unit finished the milestone this tick.
    Advanced(Milestone),
    /// No milestone left (or no routine selected).
    Finished,
}

#[derive(Debug, Clone, Default)]
pub struct AutoHandler {
    sequence: Vec<Milestone>,
    index: usize,
    /// Index of the step units were last told about.
    begun: Option<usize>,
}

impl AutoHandler {
    /// An idle handler with no routine; [`update`][Self::update] reports
    /// [`AutoStatus::Finished`] until one is selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler running a custom milestone list.
    ///
    /// # Errors
    ///
    /// [`RobotError::Config`] when `sequence` is empty.
    pub fn with_sequence(sequence: Vec<Milestone>) -> Result<Self, RobotError> {
        if sequence.is_empty() {
            return Err(RobotError::Config(
                "autonomous sequence must not be empty".to_string(),
            ));
        }
        Ok(Self {
            sequence,
            index: 0,
            begun: None,
        })
    }

    /// Reset every unit and select `path` from the start.
    pub fn reset(&mut self, path: AutoPath, systems: &mut SystemSet) {
        self.sequence = path.milestones().to_vec();
        self.restart(systems);
        info!(%path, "autonomous routine selected");
    }

    /// Like [`reset`][Self::reset] but with the routine named as text.
    ///
    /// # Errors
    ///
    /// [`RobotError::UnknownAutoPath`] for a name outside the catalog.  The
    /// handler is then left idle and no unit is reset; the previous routine
    /// is not kept.
    pub fn reset_named(&mut self, name: &str, systems: &mut SystemSet) -> Result<AutoPath, RobotError> {
        match name.parse::<AutoPath>() {
            Ok(path) => {
                self.reset(path, systems);
                Ok(path)
            }
            Err(e) => {
                self.sequence.clear();
                self.index = 0;
                self.begun = None;
                warn!(path = name, "unknown autonomous routine, staying idle");
                Err(e)
            }
        }
    }

    /// Reset every unit and rewind the current sequence.
    pub fn restart(&mut self, systems: &mut SystemSet) {
        systems.reset_all();
        self.index = 0;
        self.begun = None;
    }

    /// One tick of the routine.
    pub fn update(&mut self, systems: &mut SystemSet, recorder: &mut dyn Recorder) -> AutoStatus {
        let Some(&milestone) = self.sequence.get(self.index) else {
            recorder.record("Auto/Index", LogValue::Number(self.index as f64));
            return AutoStatus::Finished;
        };

        recorder.record("Auto/Milestone", LogValue::Text(milestone.to_string()));
        if self.begun != Some(self.index) {
            systems.begin_milestone_all(milestone);
            self.begun = Some(self.index);
        }
        let status = if systems.update_autonomous_all(milestone) {
            self.index += 1;
            info!(%milestone, index = self.index, of = self.sequence.len(), "milestone complete");
            AutoStatus::Advanced(milestone)
        } else {
            debug!(%milestone, "milestone in progress");
            AutoStatus::Holding(milestone)
        };
        recorder.record("Auto/Index", LogValue::Number(self.index as f64));
        status
    }

    /// The milestone the next [`update`][Self::update] will work on.
    pub fn current_milestone(&self) -> Option<Milestone> {
        self.sequence.get(self.index).copied()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sequence(&self) -> &[Milestone] {
        &self.sequence
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.sequence.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::Subsystem;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tickbot_types::{MemoryRecorder, TeleopInput};

    type CallLog = Rc<RefCell<Vec<(String, Milestone)>>>;

    /// Needs `polls` calls per milestone; logs every call.
    struct Worker {
        name: String,
        polls: u32,
        seen: u32,
        current: Option<Milestone>,
        resets: Rc<RefCell<u32>>,
        log: CallLog,
    }

    impl Subsystem for Worker {
        fn name(&self) -> &str {
            &self.name
        }

        fn state_label(&self) -> &'static str {
            "WORK"
        }

        fn reset(&mut self) -> Result<(), RobotError> {
            *self.resets.borrow_mut() += 1;
            self.seen = 0;
            self.current = None;
            Ok(())
        }

        fn update(&mut self, _input: Option<&TeleopInput>) -> Result<(), RobotError> {
            Ok(())
        }

        fn update_autonomous(&mut self, m: Milestone) -> Result<bool, RobotError> {
            self.log.borrow_mut().push((self.name.clone(), m));
            if self.current != Some(m) {
                self.current = Some(m);
                self.seen = 0;
            }
            self.seen += 1;
            Ok(self.seen >= self.polls)
        }
    }

    fn rig(polls: &[u32]) -> (SystemSet, CallLog, Rc<RefCell<u32>>) {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let resets = Rc::new(RefCell::new(0));
        let mut set = SystemSet::new();
        for (i, &p) in polls.iter().enumerate() {
            set.push(Box::new(Worker {
                name: format!("u{i}"),
                polls: p,
                seen: 0,
                current: None,
                resets: Rc::clone(&resets),
                log: Rc::clone(&log),
            }));
        }
        (set, log, resets)
    }

    #[test]
    fn three_immediate_units_finish_in_three_ticks() {
        let (mut set, log, _) = rig(&[1, 1, 1]);
        let mut auto = AutoHandler::new();
        auto.reset(AutoPath::Path1, &mut set);
        let mut rec = MemoryRecorder::new();

        for expected in 1..=3 {
            assert!(matches!(auto.update(&mut set, &mut rec), AutoStatus::Advanced(_)));
            assert_eq!(auto.index(), expected);
        }
        assert!(auto.is_finished());
        assert_eq!(log.borrow().len(), 9);

        assert_eq!(auto.update(&mut set, &mut rec), AutoStatus::Finished);
        assert_eq!(log.borrow().len(), 9);
        assert_eq!(rec.number("Auto/Index"), Some(3.0));
    }

    #[test]
    fn slow_unit_holds_everyone_but_all_are_polled() {
        let (mut set, log, _) = rig(&[1, 3]);
        let mut auto = AutoHandler::new();
        auto.reset(AutoPath::Path1, &mut set);
        let mut rec = MemoryRecorder::new();

        assert_eq!(auto.update(&mut set, &mut rec), AutoStatus::Holding(Milestone::Stage1));
        assert_eq!(auto.update(&mut set, &mut rec), AutoStatus::Holding(Milestone::Stage1));
        assert_eq!(auto.index(), 0);
        assert_eq!(auto.update(&mut set, &mut rec), AutoStatus::Advanced(Milestone::Stage1));
        assert_eq!(auto.index(), 1);
        // the quick unit was asked every tick
        let u0_calls = log.borrow().iter().filter(|(n, _)| n == "u0").count();
        assert_eq!(u0_calls, 3);
        assert_eq!(auto.current_milestone(), Some(Milestone::Stage2));
    }

    #[test]
    fn paths_follow_catalog_order() {
        for path in AutoPath::ALL {
            let (mut set, log, _) = rig(&[1]);
            let mut auto = AutoHandler::new();
            auto.reset(path, &mut set);
            let mut rec = MemoryRecorder::new();
            while auto.update(&mut set, &mut rec) != AutoStatus::Finished {}
            let order: Vec<Milestone> = log.borrow().iter().map(|(_, m)| *m).collect();
            assert_eq!(order, path.milestones());
        }
    }

    #[test]
    fn reset_resets_every_unit_and_rewinds() {
        let (mut set, _, resets) = rig(&[1, 1]);
        let mut auto = AutoHandler::new();
        auto.reset(AutoPath::Path3, &mut set);
        assert_eq!(*resets.borrow(), 2);
        let mut rec = MemoryRecorder::new();
        auto.update(&mut set, &mut rec);
        assert_eq!(auto.index(), 1);

        auto.reset(AutoPath::Path3, &mut set);
        assert_eq!(auto.index(), 0);
        assert_eq!(*resets.borrow(), 4);
        assert_eq!(auto.current_milestone(), Some(Milestone::Stage1));
    }

    #[test]
    fn unknown_path_leaves_handler_idle() {
        let (mut set, log, resets) = rig(&[1]);
        let mut auto = AutoHandler::new();
        auto.reset(AutoPath::Path1, &mut set);
        assert_eq!(*resets.borrow(), 1);

        let err = auto.reset_named("path9", &mut set).unwrap_err();
        assert_eq!(err, RobotError::UnknownAutoPath("path9".to_string()));
        assert_eq!(*resets.borrow(), 1);
        assert!(auto.is_finished());
        assert_eq!(auto.current_milestone(), None);

        let mut rec = MemoryRecorder::new();
        assert_eq!(auto.update(&mut set, &mut rec), AutoStatus::Finished);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn reset_named_accepts_any_case() {
        let (mut set, _, _) = rig(&[1]);
        let mut auto = AutoHandler::new();
        assert_eq!(auto.reset_named("PATH2", &mut set), Ok(AutoPath::Path2));
        assert_eq!(auto.current_milestone(), Some(Milestone::Stage3));
    }

    #[test]
    fn custom_sequence_must_be_non_empty() {
        assert!(matches!(AutoHandler::with_sequence(vec![]), Err(RobotError::Config(_))));

        let (mut set, _, _) = rig(&[1]);
        let mut auto = AutoHandler::with_sequence(vec![Milestone::Stage2, Milestone::Stage2]).unwrap();
        auto.restart(&mut set);
        let mut rec = MemoryRecorder::new();
        auto.update(&mut set, &mut rec);
        auto.update(&mut set, &mut rec);
        assert!(auto.is_finished());
        assert_eq!(auto.sequence().len(), 2);
    }

    #[test]
    fn idle_handler_is_finished() {
        let (mut set, _, _) = rig(&[1]);
        let mut auto = AutoHandler::new();
        assert!(auto.is_finished());
        assert_eq!(auto.update(&mut set, &mut MemoryRecorder::new()), AutoStatus::Finished);
    }

    #[test]
    fn records_current_milestone() {
        let (mut set, _, _) = rig(&[2]);
        let mut auto = AutoHandler::new();
        auto.reset(AutoPath::Path2, &mut set);
        let mut rec = MemoryRecorder::new();
        auto.update(&mut set, &mut rec);
        assert_eq!(rec.get("Auto/Milestone"), Some(&LogValue::Text("STAGE3".to_string())));
        assert_eq!(rec.number("Auto/Index"), Some(0.0));
    }

    #[test]
    fn path_names_parse_and_display() {
        assert_eq!("path3".parse::<AutoPath>(), Ok(AutoPath::Path3));
        assert_eq!(AutoPath::Path1.to_string(), "path1");
        assert!(matches!("".parse::<AutoPath>(), Err(RobotError::UnknownAutoPath(_))));
    }

    #[test]
    fn repeated_milestone_runs_its_action_twice() {
        use crate::systems::ExampleSystem;
        use tickbot_hal::{SimMotor, shared};

        let mut set = SystemSet::new();
        set.push(Box::new(
            ExampleSystem::new("shooter", shared(SimMotor::new("33")), 0.1, 3).unwrap(),
        ));
        let mut auto = AutoHandler::with_sequence(vec![Milestone::Stage2, Milestone::Stage2]).unwrap();
        auto.restart(&mut set);
        let mut rec = MemoryRecorder::new();

        let mut ticks = 0;
        while !auto.is_finished() {
            auto.update(&mut set, &mut rec);
            ticks += 1;
            assert!(ticks <= 20, "routine never finished");
        }
        // three driving ticks and one completing tick per step
        assert_eq!(ticks, 8);
    }
}
