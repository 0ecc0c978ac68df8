//! `tickbot-runtime` – behavior units, autonomous sequencing and the robot host
//!
//! Everything that runs inside the periodic control loop.
//!
//! # Modules
//!
//! - [`fsm`] – [`FsmSystem`][fsm::FsmSystem] and
//!   [`AutoSystem`][fsm::AutoSystem]: the finite-state-machine contract every
//!   behavior unit implements, plus the object-safe
//!   [`Subsystem`][fsm::Subsystem] view used to hold units of different
//!   state types side by side.  States are closed enums, so a unit can never
//!   be in a state it does not declare; [`parse_state`][fsm::parse_state]
//!   is the one place an unknown label is reported.
//! - [`systems`] – concrete units: [`ExampleSystem`][systems::ExampleSystem]
//!   (a single-motor mechanism), [`PlaceholderSystem`][systems::PlaceholderSystem]
//!   (stand-in for absent hardware) and [`DriveSystem`][systems::DriveSystem]
//!   (operator-driven holonomic drive that also consumes vision poses).
//! - [`system_set`] – [`SystemSet`][system_set::SystemSet]: updates every
//!   unit together and **halts** a faulting unit without stopping the rest.
//! - [`auto_handler`] – [`AutoHandler`][auto_handler::AutoHandler]: walks a
//!   path's milestones, advancing only once every unit reports the current
//!   milestone complete.
//! - [`drivetrain`] – the [`Drivetrain`][drivetrain::Drivetrain] seam and a
//!   kinematic [`SimDrivetrain`][drivetrain::SimDrivetrain] with a simple
//!   vision-corrected pose estimate.
//! - [`robot`] – [`Robot`][robot::Robot]: the timed host wiring all of the
//!   above to the operating modes.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable trace export.

pub mod auto_handler;
pub mod drivetrain;
pub mod fsm;
pub mod robot;
pub mod system_set;
pub mod systems;
pub mod telemetry;

pub use auto_handler::{AutoHandler, AutoPath, AutoStatus};
pub use drivetrain::{ChassisRequest, Drivetrain, SimDrivetrain};
pub use fsm::{AutoSystem, FsmSystem, Milestone, StateCell, StateSpace, Subsystem, parse_state};
pub use robot::{Robot, RobotConfig};
pub use system_set::SystemSet;
pub use systems::{
    BuiltSubsystem, DriveConfig, DriveSystem, ExampleSystem, PlaceholderSystem, SubsystemConfig,
    build_subsystem,
};
pub use telemetry::{TracerProviderGuard, init_tracing};
