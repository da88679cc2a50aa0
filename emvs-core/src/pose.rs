use crate::{CameraPoint, Projective, WorldPoint};
use core::ops::Mul;
use derive_more::{AsMut, AsRef, From, Into};
use nalgebra::{IsometryMatrix3, Matrix3, Matrix4, Point3, Rotation3, Vector3, Vector4};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This trait is implemented by all the different poses in this library:
///
/// * [`CameraToWorld`] - Transforms [`CameraPoint`] into [`WorldPoint`]
/// * [`WorldToCamera`] - Transforms [`WorldPoint`] into [`CameraPoint`]
/// * [`CameraToCamera`] - Transforms [`CameraPoint`] from one camera into [`CameraPoint`] for another camera
pub trait Pose: From<IsometryMatrix3<f64>> + Clone + Copy {
    type InputPoint: Projective;
    type OutputPoint: Projective;
    type Inverse: Pose;

    /// Retrieve the isometry.
    fn isometry(self) -> IsometryMatrix3<f64>;

    /// Creates a pose with no change in position or orientation.
    fn identity() -> Self {
        IsometryMatrix3::identity().into()
    }

    /// Takes the inverse of the pose.
    fn inverse(self) -> Self::Inverse {
        self.isometry().inverse().into()
    }

    /// Create the pose from rotation and translation.
    fn from_parts(translation: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        IsometryMatrix3::from_parts(translation.into(), rotation).into()
    }

    /// Retrieve the homogeneous matrix.
    fn homogeneous(self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    /// Retrieve the rotation matrix.
    fn rotation_matrix(self) -> Matrix3<f64> {
        *self.isometry().rotation.matrix()
    }

    /// Retrieve the translation vector.
    fn translation_vector(self) -> Vector3<f64> {
        self.isometry().translation.vector
    }

    /// Transform the given point to an output point.
    fn transform(self, input: Self::InputPoint) -> Self::OutputPoint {
        Projective::from_homogeneous(pose_output(self, input))
    }
}

/// Retrieves the output coordinate from the pose and input.
fn pose_output<P: Pose>(pose: P, input: P::InputPoint) -> Vector4<f64> {
    pose.isometry().to_homogeneous() * input.homogeneous()
}

/// This contains a world pose, which is a pose of the world relative to the camera.
/// This maps [`WorldPoint`] into [`CameraPoint`], changing an absolute position into
/// a vector relative to the camera.
///
/// The reference view of a disparity space image is given in this form (`T_rv_w`).
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct WorldToCamera(pub IsometryMatrix3<f64>);

impl Pose for WorldToCamera {
    type InputPoint = WorldPoint;
    type OutputPoint = CameraPoint;
    type Inverse = CameraToWorld;

    #[inline(always)]
    fn isometry(self) -> IsometryMatrix3<f64> {
        self.into()
    }
}

/// This contains a camera pose, which is a pose of the camera relative to the world.
/// This transforms camera points (with depth as `z`) into world coordinates.
/// This also tells you where the camera is located and oriented in the world.
///
/// Trajectories store their control poses in this form (`T_w_c`).
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraToWorld(pub IsometryMatrix3<f64>);

impl Pose for CameraToWorld {
    type InputPoint = CameraPoint;
    type OutputPoint = WorldPoint;
    type Inverse = WorldToCamera;

    #[inline(always)]
    fn isometry(self) -> IsometryMatrix3<f64> {
        self.into()
    }
}

impl CameraToWorld {
    /// The position of the optical center in world coordinates.
    pub fn optical_center(self) -> Point3<f64> {
        self.0.translation.vector.into()
    }
}

/// This contains a relative pose that transforms the [`CameraPoint`] of one image
/// into the corresponding [`CameraPoint`] of another image. This transforms
/// the point from the camera space of camera `A` to camera `B`.
///
/// Camera space for a given camera is defined as thus:
///
/// * Origin is the optical center
/// * Positive z axis is forwards
/// * Positive y axis is down
/// * Positive x axis is right
///
/// Note that this is a right-handed coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraToCamera(pub IsometryMatrix3<f64>);

impl Pose for CameraToCamera {
    type InputPoint = CameraPoint;
    type OutputPoint = CameraPoint;
    type Inverse = CameraToCamera;

    #[inline(always)]
    fn isometry(self) -> IsometryMatrix3<f64> {
        self.into()
    }
}

impl CameraToCamera {
    /// The optical center of the source camera expressed in the destination camera frame,
    /// given the pose that maps destination points into the source camera (`-Rᵀt`).
    pub fn source_center(self) -> Vector3<f64> {
        let rotation = self.rotation_matrix();
        -(rotation.transpose() * self.translation_vector())
    }
}

/// Chains a world-to-camera pose after a camera-to-world pose. The result maps points from
/// the camera of the right-hand side into the camera of the left-hand side.
///
/// ```
/// use emvs_core::{CameraToWorld, Pose, WorldToCamera};
/// use emvs_core::nalgebra::{Rotation3, Vector3};
/// let event_camera = CameraToWorld::from_parts(Vector3::new(0.5, 0.0, 0.0), Rotation3::identity());
/// let reference = CameraToWorld::from_parts(Vector3::new(0.2, 0.0, 0.0), Rotation3::identity());
/// let relative = reference.inverse() * event_camera;
/// assert!((relative.translation_vector() - Vector3::new(0.3, 0.0, 0.0)).norm() < 1e-12);
/// ```
impl Mul<CameraToWorld> for WorldToCamera {
    type Output = CameraToCamera;

    fn mul(self, rhs: CameraToWorld) -> CameraToCamera {
        (self.0 * rhs.0).into()
    }
}

/// Chains two relative poses.
impl Mul for CameraToCamera {
    type Output = CameraToCamera;

    fn mul(self, rhs: CameraToCamera) -> CameraToCamera {
        (self.0 * rhs.0).into()
    }
}
