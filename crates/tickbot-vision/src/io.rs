//! Camera-side data model.
//!
//! A [`PoseSource`] is polled once per tick and overwrites a [`VisionInputs`]
//! wholesale: connectivity, the observations produced since the last poll,
//! the set of visible tag ids and the angles to the best target.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tickbot_types::Pose3d;

/// One candidate robot pose produced by a camera.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseObservation {
    /// Capture time in seconds on the robot clock.
    pub timestamp: f64,
    /// Estimated field-relative robot pose.
    pub pose: Pose3d,
    /// Ambiguity of the best tag; only meaningful when `tag_count == 1`.
    pub ambiguity: f64,
    pub tag_count: usize,
    /// Mean camera-to-tag distance in metres.
    pub average_tag_distance: f64,
}

/// A single fiducial seen while solving for a pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagSighting {
    pub id: u32,
    /// Camera-to-tag distance in metres.
    pub distance: f64,
    pub ambiguity: f64,
}

impl PoseObservation {
    /// Summarise a pose solve from the tags it used.
    ///
    /// The ambiguity is taken from the first sighting, which solvers report
    /// as the best one.  With no sightings the observation carries
    /// `tag_count == 0` and zero distance.
    pub fn from_sightings(timestamp: f64, pose: Pose3d, sightings: &[TagSighting]) -> Self {
        let tag_count = sightings.len();
        let average_tag_distance = if tag_count == 0 {
            0.0
        } else {
            sightings.iter().map(|s| s.distance).sum::<f64>() / tag_count as f64
        };
        Self {
            timestamp,
            pose,
            ambiguity: sightings.first().map_or(0.0, |s| s.ambiguity),
            tag_count,
            average_tag_distance,
        }
    }
}

/// Angles from the camera's optical axis to the best target, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetObservation {
    /// Horizontal angle, counter-clockwise positive.
    pub tx: f64,
    /// Vertical angle, upward positive.
    pub ty: f64,
}

/// Everything one camera reported this tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisionInputs {
    pub connected: bool,
    pub latest_target: TargetObservation,
    pub observations: Vec<PoseObservation>,
    pub tag_ids: BTreeSet<u32>,
}

impl VisionInputs {
    /// Reset to the "nothing seen" state, keeping allocations.
    pub fn clear(&mut self) {
        self.connected = false;
        self.latest_target = TargetObservation::default();
        self.observations.clear();
        self.tag_ids.clear();
    }
}

/// A per-camera producer of pose observations.
pub trait PoseSource {
    /// Camera name, used in logs.
    fn name(&self) -> &str;

    /// Overwrite `inputs` with this tick's readings.
    fn update_inputs(&mut self, inputs: &mut VisionInputs);
}
