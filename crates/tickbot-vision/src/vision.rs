//! [`Vision`] – multi-camera pose fusion.
//!
//! Once per tick [`Vision::periodic`]:
//!
//! 1. polls every [`PoseSource`] into its [`VisionInputs`];
//! 2. raises or clears the camera's disconnect [`Alert`];
//! 3. runs each observation through the [`ObservationFilter`];
//! 4. scales the measurement noise of accepted observations by
//!    `distance² / tag_count` and the camera's trust factor;
//! 5. records tag poses, all poses, accepted and rejected poses per camera
//!    and aggregated under `Vision/Summary`;
//! 6. forwards the accepted measurements to the [`PoseConsumer`], in camera
//!    order, after every camera has been processed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tickbot_types::{
    Alert, AlertLevel, LogValue, Pose2d, Pose3d, Recorder, Rotation3d, Transform3d,
    Translation3d,
};
use tracing::debug;

use crate::field::FieldLayout;
use crate::filter::{ObservationFilter, Rejection};
use crate::io::{PoseObservation, PoseSource, VisionInputs};

const INCH: f64 = 0.0254;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Mounting and simulation parameters for one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub name: String,
    /// Farthest tag the simulated camera can resolve, in metres.
    #[serde(default = "default_max_range_m")]
    pub max_range_m: f64,
    /// Ambiguity the simulated camera reports for its best tag.
    #[serde(default = "default_sim_ambiguity")]
    pub ambiguity: f64,
    pub robot_to_camera: Transform3d,
}

fn default_max_range_m() -> f64 {
    6.0
}

fn default_sim_ambiguity() -> f64 {
    0.05
}

impl CameraConfig {
    /// Front camera looking at the reef, level with the floor.
    pub fn reef() -> Self {
        Self {
            name: "reef_camera".to_string(),
            robot_to_camera: Transform3d::new(
                Translation3d::new(7.129 * INCH, -4.306 * INCH, 14.56 * INCH),
                Rotation3d::identity(),
            ),
            max_range_m: default_max_range_m(),
            ambiguity: default_sim_ambiguity(),
        }
    }

    /// Rear camera looking at the coral station, pitched up 19°.
    pub fn station() -> Self {
        Self {
            name: "station_camera".to_string(),
            robot_to_camera: Transform3d::new(
                Translation3d::new(-8.875 * INCH, -9.5 * INCH, 37.596 * INCH),
                Rotation3d::from_rpy(0.0, (-19f64).to_radians(), std::f64::consts::PI),
            ),
            max_range_m: default_max_range_m(),
            ambiguity: default_sim_ambiguity(),
        }
    }
}

/// Rejection caps and noise model for the fusion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_max_ambiguity")]
    pub max_ambiguity: f64,
    #[serde(default = "default_max_z_error")]
    pub max_z_error: f64,
    /// Linear standard deviation at 1 m with one tag, in metres.
    #[serde(default = "default_linear_std_dev_baseline")]
    pub linear_std_dev_baseline: f64,
    /// Angular standard deviation at 1 m with one tag, in radians.
    #[serde(default = "default_angular_std_dev_baseline")]
    pub angular_std_dev_baseline: f64,
    /// Per-camera trust multipliers, indexed like the cameras.  Cameras past
    /// the end of the list use 1.0.
    #[serde(default = "default_camera_std_dev_factors")]
    pub camera_std_dev_factors: Vec<f64>,
    #[serde(default = "default_cameras")]
    pub cameras: Vec<CameraConfig>,
}

fn default_max_ambiguity() -> f64 {
    0.1
}

fn default_max_z_error() -> f64 {
    0.3
}

fn default_linear_std_dev_baseline() -> f64 {
    0.02
}

fn default_angular_std_dev_baseline() -> f64 {
    0.06
}

fn default_camera_std_dev_factors() -> Vec<f64> {
    vec![1.0, 0.4]
}

fn default_cameras() -> Vec<CameraConfig> {
    vec![CameraConfig::reef(), CameraConfig::station()]
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            max_ambiguity: default_max_ambiguity(),
            max_z_error: default_max_z_error(),
            linear_std_dev_baseline: default_linear_std_dev_baseline(),
            angular_std_dev_baseline: default_angular_std_dev_baseline(),
            camera_std_dev_factors: default_camera_std_dev_factors(),
            cameras: default_cameras(),
        }
    }
}

impl VisionConfig {
    /// Measurement noise `[x, y, θ]` for an accepted observation from camera
    /// `camera_index`.
    pub fn std_devs(&self, camera_index: usize, obs: &PoseObservation) -> [f64; 3] {
        let scale = obs.average_tag_distance.powi(2) / obs.tag_count as f64;
        let factor = self
            .camera_std_dev_factors
            .get(camera_index)
            .copied()
            .unwrap_or(1.0);
        let linear = self.linear_std_dev_baseline * scale * factor;
        let angular = self.angular_std_dev_baseline * scale * factor;
        [linear, linear, angular]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Consumer
// ────────────────────────────────────────────────────────────────────────────

/// Receiver of accepted vision measurements, normally the pose estimator.
pub trait PoseConsumer {
    fn accept(&mut self, pose: Pose2d, timestamp: f64, std_devs: [f64; 3]);
}

/// A forwarded measurement, as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionMeasurement {
    pub pose: Pose2d,
    pub timestamp: f64,
    pub std_devs: [f64; 3],
}

/// Collects measurements, for tests and offline analysis.
impl PoseConsumer for Vec<VisionMeasurement> {
    fn accept(&mut self, pose: Pose2d, timestamp: f64, std_devs: [f64; 3]) {
        self.push(VisionMeasurement {
            pose,
            timestamp,
            std_devs,
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vision
// ────────────────────────────────────────────────────────────────────────────

/// Counts for one [`Vision::periodic`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisionSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub by_reason: BTreeMap<Rejection, usize>,
}

struct CameraChannel {
    source: Box<dyn PoseSource>,
    inputs: VisionInputs,
    disconnected: Alert,
}

#[derive(Default)]
struct PoseLog {
    tags: Vec<Pose3d>,
    robot: Vec<Pose3d>,
    accepted: Vec<Pose3d>,
    rejected: Vec<Pose3d>,
}

impl PoseLog {
    fn record(&self, recorder: &mut dyn Recorder, prefix: &str) {
        recorder.record(&format!("{prefix}/TagPoses"), LogValue::Poses(self.tags.clone()));
        recorder.record(&format!("{prefix}/RobotPoses"), LogValue::Poses(self.robot.clone()));
        recorder.record(
            &format!("{prefix}/RobotPosesAccepted"),
            LogValue::Poses(self.accepted.clone()),
        );
        recorder.record(
            &format!("{prefix}/RobotPosesRejected"),
            LogValue::Poses(self.rejected.clone()),
        );
    }

    fn extend(&mut self, other: PoseLog) {
        self.tags.extend(other.tags);
        self.robot.extend(other.robot);
        self.accepted.extend(other.accepted);
        self.rejected.extend(other.rejected);
    }
}

/// The fusion pipeline.
pub struct Vision {
    config: VisionConfig,
    field: Box<dyn FieldLayout>,
    filter: ObservationFilter,
    cameras: Vec<CameraChannel>,
}

impl Vision {
    /// Build a pipeline over `sources`, indexed in the given order.  The
    /// filter is the stock rule chain with the caps from `config`.
    pub fn new(
        config: VisionConfig,
        field: Box<dyn FieldLayout>,
        sources: Vec<Box<dyn PoseSource>>,
    ) -> Self {
        let filter = ObservationFilter::standard(config.max_ambiguity, config.max_z_error);
        let cameras = sources
            .into_iter()
            .enumerate()
            .map(|(i, source)| CameraChannel {
                source,
                inputs: VisionInputs::default(),
                disconnected: Alert::new(
                    format!("Vision camera {i} is disconnected."),
                    AlertLevel::Warning,
                ),
            })
            .collect();
        Self {
            config,
            field,
            filter,
            cameras,
        }
    }

    /// Replace the rejection rules.
    pub fn with_filter(mut self, filter: ObservationFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn field(&self) -> &dyn FieldLayout {
        self.field.as_ref()
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// The last inputs read from camera `index`.
    pub fn inputs(&self, index: usize) -> Option<&VisionInputs> {
        self.cameras.get(index).map(|c| &c.inputs)
    }

    /// Horizontal angle to camera `index`'s best target, for simple
    /// servoing.
    pub fn target_x(&self, index: usize) -> Option<f64> {
        self.inputs(index).map(|i| i.latest_target.tx)
    }

    pub fn disconnect_alert(&self, index: usize) -> Option<&Alert> {
        self.cameras.get(index).map(|c| &c.disconnected)
    }

    /// Run one tick of the pipeline.
    pub fn periodic(
        &mut self,
        consumer: &mut dyn PoseConsumer,
        recorder: &mut dyn Recorder,
    ) -> VisionSummary {
        for (i, camera) in self.cameras.iter_mut().enumerate() {
            camera.source.update_inputs(&mut camera.inputs);
            let prefix = format!("Vision/Camera{i}");
            recorder.record(
                &format!("{prefix}/Connected"),
                LogValue::Bool(camera.inputs.connected),
            );
            recorder.record(
                &format!("{prefix}/TagIds"),
                LogValue::Numbers(camera.inputs.tag_ids.iter().map(|&id| f64::from(id)).collect()),
            );
        }

        let mut summary = VisionSummary::default();
        let mut pending = Vec::new();
        let mut all = PoseLog::default();

        for (i, camera) in self.cameras.iter_mut().enumerate() {
            camera.disconnected.set(!camera.inputs.connected);

            let mut log = PoseLog {
                tags: camera
                    .inputs
                    .tag_ids
                    .iter()
                    .filter_map(|&id| self.field.tag_pose(id))
                    .collect(),
                ..Default::default()
            };

            for obs in &camera.inputs.observations {
                log.robot.push(obs.pose);
                match self.filter.evaluate(obs, self.field.as_ref()) {
                    Ok(()) => {
                        log.accepted.push(obs.pose);
                        summary.accepted += 1;
                        pending.push(VisionMeasurement {
                            pose: obs.pose.to_pose2d(),
                            timestamp: obs.timestamp,
                            std_devs: self.config.std_devs(i, obs),
                        });
                    }
                    Err(reason) => {
                        log.rejected.push(obs.pose);
                        summary.rejected += 1;
                        *summary.by_reason.entry(reason).or_default() += 1;
                        debug!(camera = i, %reason, timestamp = obs.timestamp, "observation rejected");
                    }
                }
            }

            log.record(recorder, &format!("Vision/Camera{i}"));
            all.extend(log);
        }

        all.record(recorder, "Vision/Summary");

        for m in pending {
            consumer.accept(m.pose, m.timestamp, m.std_devs);
        }

        debug!(
            cameras = self.cameras.len(),
            accepted = summary.accepted,
            rejected = summary.rejected,
            "vision tick"
        );
        summary
    }
}
