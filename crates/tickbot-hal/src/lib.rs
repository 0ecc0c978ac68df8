//! `tickbot-hal` – actuation handles and their telemetry.
//!
//! # Modules
//!
//! - [`motor`] – the [`Motor`][motor::Motor] trait every motor-controller
//!   driver implements, and the shared [`MotorHandle`][motor::MotorHandle]
//!   a behavior unit holds.
//! - [`registry`] – [`MotorRegistry`][registry::MotorRegistry]: polls every
//!   registered handle once per tick and records position, velocity,
//!   setpoint, voltage and current.
//! - [`sim`] – [`SimMotor`][sim::SimMotor]: an in-process motor for running
//!   the whole stack without hardware.

pub mod motor;
pub mod registry;
pub mod sim;

pub use motor::{Motor, MotorHandle, MotorTelemetry, shared};
pub use registry::MotorRegistry;
pub use sim::SimMotor;
