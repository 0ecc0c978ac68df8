//! Simulated camera.
//!
//! [`SimPoseSource`] reads the ground-truth robot pose from a shared cell,
//! places itself through its robot-to-camera mount, and "sees" every tag of
//! the field within range.  Each new value of the shared clock produces one
//! frame; polling twice at the same clock value yields nothing the second
//! time, like a real camera with no unread results.

use std::cell::Cell;
use std::rc::Rc;

use tickbot_types::{Pose2d, Pose3d, Transform3d};

use crate::field::FieldLayout;
use crate::io::{PoseObservation, PoseSource, TagSighting, TargetObservation, VisionInputs};
use crate::vision::CameraConfig;

pub struct SimPoseSource {
    name: String,
    robot_to_camera: Transform3d,
    max_range_m: f64,
    ambiguity: f64,
    tags: Vec<(u32, Pose3d)>,
    truth: Rc<Cell<Pose2d>>,
    clock: Rc<Cell<f64>>,
    connected: Rc<Cell<bool>>,
    last_capture: Option<f64>,
}

impl SimPoseSource {
    /// Create a connected camera over `field`.  `truth` is the simulated
    /// robot pose and `clock` the simulation time in seconds.
    pub fn new(
        camera: &CameraConfig,
        field: &dyn FieldLayout,
        truth: Rc<Cell<Pose2d>>,
        clock: Rc<Cell<f64>>,
    ) -> Self {
        let tags = field
            .tag_ids()
            .into_iter()
            .filter_map(|id| field.tag_pose(id).map(|pose| (id, pose)))
            .collect();
        Self {
            name: camera.name.clone(),
            robot_to_camera: camera.robot_to_camera,
            max_range_m: camera.max_range_m,
            ambiguity: camera.ambiguity,
            tags,
            truth,
            clock,
            connected: Rc::new(Cell::new(true)),
            last_capture: None,
        }
    }

    /// Plug or unplug the camera.
    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    /// Shared connection flag, for toggling the camera after it has been
    /// handed to [`Vision`][crate::Vision].
    pub fn connection(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.connected)
    }

    fn target_angles(camera: &Pose3d, tag: &Pose3d) -> TargetObservation {
        let rel = camera
            .rotation
            .conjugate()
            .rotate(tag.translation.sub(camera.translation));
        TargetObservation {
            tx: rel.y.atan2(rel.x),
            ty: rel.z.atan2(rel.x.hypot(rel.y)),
        }
    }
}

impl PoseSource for SimPoseSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_inputs(&mut self, inputs: &mut VisionInputs) {
        inputs.clear();
        inputs.connected = self.connected.get();
        if !inputs.connected {
            return;
        }

        let now = self.clock.get();
        if self.last_capture == Some(now) {
            return;
        }
        self.last_capture = Some(now);

        let robot = self.truth.get().to_pose3d();
        let camera = robot.transform_by(&self.robot_to_camera);

        let mut visible: Vec<(TagSighting, Pose3d)> = self
            .tags
            .iter()
            .filter_map(|&(id, tag)| {
                let distance = camera.translation.distance(tag.translation);
                (distance <= self.max_range_m).then_some((
                    TagSighting {
                        id,
                        distance,
                        ambiguity: self.ambiguity,
                    },
                    tag,
                ))
            })
            .collect();
        if visible.is_empty() {
            return;
        }
        visible.sort_by(|a, b| a.0.distance.total_cmp(&b.0.distance));

        inputs.latest_target = Self::target_angles(&camera, &visible[0].1);
        inputs.tag_ids = visible.iter().map(|(s, _)| s.id).collect();
        let sightings: Vec<TagSighting> = visible.into_iter().map(|(s, _)| s).collect();
        inputs
            .observations
            .push(PoseObservation::from_sightings(now, robot, &sightings));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::AprilTagLayout;
    use std::f64::consts::PI;

    fn rig(pose: Pose2d) -> (SimPoseSource, Rc<Cell<Pose2d>>, Rc<Cell<f64>>) {
        let truth = Rc::new(Cell::new(pose));
        let clock = Rc::new(Cell::new(0.02));
        let cam = SimPoseSource::new(
            &CameraConfig::reef(),
            &AprilTagLayout::test_field(),
            Rc::clone(&truth),
            Rc::clone(&clock),
        );
        (cam, truth, clock)
    }

    #[test]
    fn sees_nearby_tags() {
        // facing the blue wall from 2 m away
        let (mut cam, _, _) = rig(Pose2d::new(2.0, 2.0, PI));
        let mut inputs = VisionInputs::default();
        cam.update_inputs(&mut inputs);

        assert!(inputs.connected);
        assert_eq!(inputs.tag_ids.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(inputs.observations.len(), 1);
        let obs = inputs.observations[0];
        assert_eq!(obs.tag_count, 2);
        assert!((obs.timestamp - 0.02).abs() < 1e-12);
        assert!((obs.pose.x() - 2.0).abs() < 1e-9);
        assert!(obs.average_tag_distance > 1.5 && obs.average_tag_distance < 4.0);
    }

    #[test]
    fn target_angles_point_at_nearest_tag() {
        let (mut cam, _, _) = rig(Pose2d::new(2.0, 2.0, PI));
        let mut inputs = VisionInputs::default();
        cam.update_inputs(&mut inputs);
        // nearly dead ahead, slightly above the lens
        assert!(inputs.latest_target.tx.abs() < 0.1);
        assert!(inputs.latest_target.ty > 0.0);
    }

    #[test]
    fn nothing_in_range_yields_no_observation() {
        let (mut cam, _, _) = rig(Pose2d::new(8.7, 4.0, 0.0));
        let mut inputs = VisionInputs::default();
        cam.update_inputs(&mut inputs);
        assert!(inputs.connected);
        assert!(inputs.observations.is_empty());
        assert!(inputs.tag_ids.is_empty());
    }

    #[test]
    fn one_frame_per_clock_value() {
        let (mut cam, truth, clock) = rig(Pose2d::new(2.0, 2.0, PI));
        let mut inputs = VisionInputs::default();
        cam.update_inputs(&mut inputs);
        cam.update_inputs(&mut inputs);
        assert!(inputs.observations.is_empty());

        truth.set(Pose2d::new(2.5, 2.0, PI));
        clock.set(0.04);
        cam.update_inputs(&mut inputs);
        assert_eq!(inputs.observations.len(), 1);
        assert!((inputs.observations[0].pose.x() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn unplugged_camera_reports_disconnected() {
        let (mut cam, _, _) = rig(Pose2d::new(2.0, 2.0, PI));
        let link = cam.connection();
        link.set(false);
        let mut inputs = VisionInputs::default();
        cam.update_inputs(&mut inputs);
        assert!(!inputs.connected);
        assert!(inputs.observations.is_empty());

        cam.set_connected(true);
        cam.update_inputs(&mut inputs);
        assert!(inputs.connected);
        assert_eq!(inputs.observations.len(), 1);
        assert_eq!(cam.name(), "reef_camera");
    }
}
