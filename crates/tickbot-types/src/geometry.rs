//! Rigid-body geometry for field-relative poses.
//!
//! All lengths are metres and all angles radians.  Rotations are unit
//! quaternions (w, x, y, z convention); poses compose as "rotate, then
//! translate".
//!
//! # Example
//!
//! ```rust
//! use tickbot_types::geometry::{Pose3d, Rotation3d, Transform3d, Translation3d};
//!
//! // Robot at (2, 1) facing +Y, camera mounted 0.5 m ahead of centre.
//! let robot = Pose3d::new(
//!     Translation3d::new(2.0, 1.0, 0.0),
//!     Rotation3d::from_yaw(std::f64::consts::FRAC_PI_2),
//! );
//! let mount = Transform3d::new(Translation3d::new(0.5, 0.0, 0.0), Rotation3d::identity());
//!
//! let camera = robot.transform_by(&mount);
//! assert!((camera.x() - 2.0).abs() < 1e-9);
//! assert!((camera.y() - 1.5).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Translation3d
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D translation vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Translation3d {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        self.sub(other).norm()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rotation3d
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation3d {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Rotation3d {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation3d {
    /// Create a rotation from quaternion components.  The caller is
    /// responsible for providing a unit quaternion.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Build from extrinsic roll (X), pitch (Y), yaw (Z) angles.
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();
        Self::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }

    /// A pure rotation about +Z.
    pub fn from_yaw(yaw: f64) -> Self {
        Self::from_rpy(0.0, 0.0, yaw)
    }

    /// Hamilton product: apply `rhs` first, then `self`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Translation3d) -> Translation3d {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let r = self.mul(p).mul(self.conjugate());
        Translation3d::new(r.x, r.y, r.z)
    }

    /// Heading about +Z, in `(-π, π]`.
    pub fn yaw(self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3d / Pose3d
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body offset between two frames, e.g. robot centre to camera lens.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform3d {
    pub translation: Translation3d,
    pub rotation: Rotation3d,
}

impl Transform3d {
    pub fn new(translation: Translation3d, rotation: Rotation3d) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Translation3d::zero(), Rotation3d::identity())
    }
}

/// A position and orientation in 3-D field coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose3d {
    pub translation: Translation3d,
    pub rotation: Rotation3d,
}

impl Pose3d {
    pub fn new(translation: Translation3d, rotation: Rotation3d) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn x(&self) -> f64 {
        self.translation.x
    }

    pub fn y(&self) -> f64 {
        self.translation.y
    }

    pub fn z(&self) -> f64 {
        self.translation.z
    }

    /// Apply `transform` expressed in this pose's frame.
    pub fn transform_by(&self, transform: &Transform3d) -> Pose3d {
        Pose3d::new(
            self.translation
                .add(self.rotation.rotate(transform.translation)),
            self.rotation.mul(transform.rotation),
        )
    }

    /// Project onto the floor plane, keeping x, y and yaw.
    pub fn to_pose2d(&self) -> Pose2d {
        Pose2d::new(self.translation.x, self.translation.y, self.rotation.yaw())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose2d
// ────────────────────────────────────────────────────────────────────────────

/// A position and heading on the field floor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    pub x: f64,
    pub y: f64,
    /// Heading, counter-clockwise from +X.
    pub rotation_rad: f64,
}

impl Pose2d {
    pub fn new(x: f64, y: f64, rotation_rad: f64) -> Self {
        Self { x, y, rotation_rad }
    }

    /// Lift onto the floor plane (z = 0, roll = pitch = 0).
    pub fn to_pose3d(&self) -> Pose3d {
        Pose3d::new(
            Translation3d::new(self.x, self.y, 0.0),
            Rotation3d::from_yaw(self.rotation_rad),
        )
    }

    pub fn distance_to(&self, other: &Pose2d) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
