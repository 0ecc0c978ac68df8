//! `tickbot-vision` – camera pose observations and their fusion.
//!
//! # Modules
//!
//! - [`io`] – what a camera reports each tick ([`PoseObservation`],
//!   [`VisionInputs`]) and the [`PoseSource`] trait every camera driver
//!   implements.
//! - [`field`] – tag poses and field boundary ([`FieldLayout`],
//!   [`AprilTagLayout`]).
//! - [`filter`] – the ordered plausibility rules an observation must pass.
//! - [`vision`] – the [`Vision`] pipeline: rejection, noise estimation,
//!   diagnostics and forwarding to a [`PoseConsumer`].
//! - [`sim`] – [`SimPoseSource`], a camera driven by a simulated robot pose.

pub mod field;
pub mod filter;
pub mod io;
pub mod sim;
pub mod vision;

pub use field::{AprilTagLayout, FieldLayout};
pub use filter::{ObservationFilter, ObservationRule, Rejection};
pub use io::{PoseObservation, PoseSource, TagSighting, TargetObservation, VisionInputs};
pub use sim::SimPoseSource;
pub use vision::{
    CameraConfig, PoseConsumer, Vision, VisionConfig, VisionMeasurement, VisionSummary,
};
