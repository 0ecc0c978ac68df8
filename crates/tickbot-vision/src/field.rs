//! Field geometry: fiducial poses and the playing-area boundary.
//!
//! [`AprilTagLayout`] reads the standard layout JSON:
//!
//! ```json
//! {
//!   "tags": [
//!     { "ID": 1,
//!       "pose": {
//!         "translation": { "x": 0.0, "y": 2.0, "z": 0.5 },
//!         "rotation": { "quaternion": { "W": 1.0, "X": 0.0, "Y": 0.0, "Z": 0.0 } }
//!       } }
//!   ],
//!   "field": { "length": 17.548, "width": 8.052 }
//! }
//! ```

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::Path;

use serde::Deserialize;
use tickbot_types::{Pose3d, RobotError, Rotation3d, Translation3d};

/// Read-only field geometry queried by the fusion pipeline.
pub trait FieldLayout {
    fn tag_pose(&self, id: u32) -> Option<Pose3d>;

    /// Every tag id in the layout, ascending.
    fn tag_ids(&self) -> Vec<u32>;

    /// Extent along field X, in metres.
    fn field_length(&self) -> f64;

    /// Extent along field Y, in metres.
    fn field_width(&self) -> f64;
}

// ────────────────────────────────────────────────────────────────────────────
// JSON schema
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LayoutFile {
    tags: Vec<TagEntry>,
    field: FieldSize,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(rename = "ID")]
    id: u32,
    pose: TagPose,
}

#[derive(Deserialize)]
struct TagPose {
    translation: Translation3d,
    rotation: TagRotation,
}

#[derive(Deserialize)]
struct TagRotation {
    quaternion: Quaternion,
}

#[derive(Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct Quaternion {
    w: f64,
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct FieldSize {
    length: f64,
    width: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// AprilTagLayout
// ────────────────────────────────────────────────────────────────────────────

/// An in-memory tag layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AprilTagLayout {
    tags: BTreeMap<u32, Pose3d>,
    length: f64,
    width: f64,
}

impl AprilTagLayout {
    /// Build a layout from explicit tag poses.
    ///
    /// # Errors
    ///
    /// [`RobotError::FieldLayout`] when either dimension is not a positive
    /// finite number.
    pub fn new(
        tags: impl IntoIterator<Item = (u32, Pose3d)>,
        length: f64,
        width: f64,
    ) -> Result<Self, RobotError> {
        if !(length.is_finite() && length > 0.0 && width.is_finite() && width > 0.0) {
            return Err(RobotError::FieldLayout(format!(
                "field dimensions must be positive, got {length} x {width}"
            )));
        }
        Ok(Self {
            tags: tags.into_iter().collect(),
            length,
            width,
        })
    }

    /// Parse the standard layout JSON.
    pub fn from_json(json: &str) -> Result<Self, RobotError> {
        let file: LayoutFile = serde_json::from_str(json)
            .map_err(|e| RobotError::FieldLayout(format!("invalid layout JSON: {e}")))?;
        let tags = file.tags.into_iter().map(|t| {
            let q = t.pose.rotation.quaternion;
            (
                t.id,
                Pose3d::new(t.pose.translation, Rotation3d::new(q.w, q.x, q.y, q.z)),
            )
        });
        Self::new(tags, file.field.length, file.field.width)
    }

    /// Read and parse a layout file.
    pub fn load(path: &Path) -> Result<Self, RobotError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            RobotError::FieldLayout(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// A 17.548 m × 8.052 m field with two tags on each driver-station wall,
    /// facing into the field at 0.5 m height.  Used by the simulator and
    /// tests.
    pub fn test_field() -> Self {
        const LENGTH: f64 = 17.548;
        const WIDTH: f64 = 8.052;
        let tag = |x: f64, y: f64, yaw: f64| {
            Pose3d::new(Translation3d::new(x, y, 0.5), Rotation3d::from_yaw(yaw))
        };
        Self {
            tags: BTreeMap::from([
                (1, tag(0.0, 2.0, 0.0)),
                (2, tag(0.0, 6.0, 0.0)),
                (3, tag(LENGTH, 2.0, PI)),
                (4, tag(LENGTH, 6.0, PI)),
            ]),
            length: LENGTH,
            width: WIDTH,
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FieldLayout for AprilTagLayout {
    fn tag_pose(&self, id: u32) -> Option<Pose3d> {
        self.tags.get(&id).copied()
    }

    fn tag_ids(&self) -> Vec<u32> {
        self.tags.keys().copied().collect()
    }

    fn field_length(&self) -> f64 {
        self.length
    }

    fn field_width(&self) -> f64 {
        self.width
    }
}
