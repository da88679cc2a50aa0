use crate::{CameraToWorld, Pose, Skew3};
use log::trace;
use nalgebra::{Rotation3, Vector3};
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrajectoryError {
    #[error("a trajectory needs at least two control poses, got {0}")]
    NotEnoughPoses(usize),
    #[error("no pose available at {requested} (trajectory spans {first} to {last})")]
    PoseUnavailable { requested: i64, first: i64, last: i64 },
}

/// A continuous camera trajectory built from timestamped control poses.
///
/// Control poses are keyed by their timestamp in microseconds and map camera points into
/// the world frame. Between two control poses the translation is interpolated linearly and
/// the rotation follows the geodesic on SO(3).
#[derive(Debug, Clone, PartialEq)]
pub struct PoseTrajectory {
    poses: BTreeMap<i64, CameraToWorld>,
    first: (i64, CameraToWorld),
    last: (i64, CameraToWorld),
}

impl PoseTrajectory {
    pub fn new(poses: BTreeMap<i64, CameraToWorld>) -> Result<Self, TrajectoryError> {
        let bounds = poses
            .iter()
            .next()
            .zip(poses.iter().next_back())
            .filter(|_| poses.len() >= 2)
            .map(|((&t0, &p0), (&t1, &p1))| ((t0, p0), (t1, p1)));
        match bounds {
            Some((first, last)) => Ok(Self { poses, first, last }),
            None => Err(TrajectoryError::NotEnoughPoses(poses.len())),
        }
    }

    /// Builds a trajectory from `(timestamp, pose)` pairs. Later duplicates of a timestamp win.
    pub fn from_poses(
        poses: impl IntoIterator<Item = (i64, CameraToWorld)>,
    ) -> Result<Self, TrajectoryError> {
        Self::new(poses.into_iter().collect())
    }

    /// Retrieves the pose of the camera at time `t`.
    ///
    /// Fails when `t` lies outside of the time span covered by the control poses.
    pub fn pose_at(&self, t: i64) -> Result<CameraToWorld, TrajectoryError> {
        let (first, _) = self.first_control_pose();
        let (last, _) = self.last_control_pose();
        let unavailable = TrajectoryError::PoseUnavailable {
            requested: t,
            first,
            last,
        };
        if t < first || t > last {
            return Err(unavailable);
        }

        let (&t0, &pose0) = self
            .poses
            .range((Unbounded, Included(t)))
            .next_back()
            .ok_or(unavailable)?;
        if t0 == t {
            return Ok(pose0);
        }
        let (&t1, &pose1) = self
            .poses
            .range((Excluded(t), Unbounded))
            .next()
            .ok_or(unavailable)?;

        let alpha = (t - t0) as f64 / (t1 - t0) as f64;
        trace!("interpolating pose at {} between {} and {} (alpha {})", t, t0, t1, alpha);
        Ok(interpolate(pose0, pose1, alpha))
    }

    /// The earliest control pose and its timestamp.
    pub fn first_control_pose(&self) -> (i64, CameraToWorld) {
        self.first
    }

    /// The latest control pose and its timestamp.
    pub fn last_control_pose(&self) -> (i64, CameraToWorld) {
        self.last
    }

    /// The pose halfway through the trajectory, commonly used as the reference view.
    pub fn midpoint_pose(&self) -> CameraToWorld {
        let (first, first_pose) = self.first_control_pose();
        let (last, _) = self.last_control_pose();
        let middle = first + (last - first) / 2;
        self.pose_at(middle).unwrap_or(first_pose)
    }

    /// Number of control poses.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Iterates over the control poses in time order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, CameraToWorld)> + '_ {
        self.poses.iter().map(|(&t, &pose)| (t, pose))
    }
}

/// Interpolates between two poses with `alpha` in `[0, 1]`.
pub fn interpolate(pose0: CameraToWorld, pose1: CameraToWorld, alpha: f64) -> CameraToWorld {
    let iso0 = pose0.isometry();
    let iso1 = pose1.isometry();
    let translation: Vector3<f64> =
        iso0.translation.vector * (1.0 - alpha) + iso1.translation.vector * alpha;
    let delta: Skew3 = (iso0.rotation.inverse() * iso1.rotation).into();
    let rotation: Rotation3<f64> = iso0.rotation * delta.scale(alpha).rotation();
    CameraToWorld::from_parts(translation, rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight_line() -> PoseTrajectory {
        PoseTrajectory::from_poses(vec![
            (0, CameraToWorld::identity()),
            (
                1_000_000,
                CameraToWorld::from_parts(
                    Vector3::new(1.0, 0.0, 0.0),
                    Rotation3::from_axis_angle(&Vector3::y_axis(), 0.4),
                ),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn needs_two_poses() {
        let single = PoseTrajectory::from_poses(vec![(0, CameraToWorld::identity())]);
        assert_eq!(single, Err(TrajectoryError::NotEnoughPoses(1)));
    }

    #[test]
    fn out_of_range_is_unavailable() {
        let trajectory = straight_line();
        assert!(trajectory.pose_at(-1).is_err());
        assert_eq!(
            trajectory.pose_at(1_000_001),
            Err(TrajectoryError::PoseUnavailable {
                requested: 1_000_001,
                first: 0,
                last: 1_000_000
            })
        );
    }

    #[test]
    fn control_timestamps_are_exact() {
        let trajectory = straight_line();
        let (_, last) = trajectory.last_control_pose();
        assert_eq!(trajectory.pose_at(1_000_000).unwrap(), last);
        assert_eq!(trajectory.pose_at(0).unwrap(), CameraToWorld::identity());
    }

    #[test]
    fn halfway_is_half_translation_and_half_angle() {
        let trajectory = straight_line();
        let pose = trajectory.pose_at(500_000).unwrap();
        assert_relative_eq!(
            pose.translation_vector(),
            Vector3::new(0.5, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(pose.isometry().rotation.angle(), 0.2, epsilon = 1e-12);
        assert_eq!(trajectory.midpoint_pose(), pose);
    }

    #[test]
    fn brackets_the_right_segment() {
        let trajectory = PoseTrajectory::from_poses(vec![
            (0, CameraToWorld::identity()),
            (
                10,
                CameraToWorld::from_parts(Vector3::new(1.0, 0.0, 0.0), Rotation3::identity()),
            ),
            (
                20,
                CameraToWorld::from_parts(Vector3::new(1.0, 2.0, 0.0), Rotation3::identity()),
            ),
        ])
        .unwrap();
        let pose = trajectory.pose_at(15).unwrap();
        assert_relative_eq!(
            pose.translation_vector(),
            Vector3::new(1.0, 1.0, 0.0),
            epsilon = 1e-12
        );
        assert_eq!(trajectory.len(), 3);
    }
}
