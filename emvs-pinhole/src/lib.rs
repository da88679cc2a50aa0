//! This crate plugs into `emvs-core` and provides the two pinhole cameras of the mapping pipeline:
//! the physical [`EventCamera`], whose lens distortion must be removed before events can be warped,
//! and the distortion free [`PinholeCamera`] that describes the virtual reference view owning the
//! disparity space image.
//!
//! Both implement [`emvs_core::CameraModel`], which converts between pixels and bearings.

mod distortion;
mod event_camera;
mod virtual_camera;

pub use distortion::*;
pub use event_camera::*;
pub use virtual_camera::*;

use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use emvs_core::nalgebra::{Matrix3, Point2, Vector2, Vector3};
use emvs_core::ImagePoint;
use thiserror::Error;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CameraError {
    #[error("expected {expected} camera parameters, got {got}")]
    WrongParameterCount { expected: usize, got: usize },
    #[error("invalid camera resolution {width}x{height}")]
    InvalidResolution { width: f64, height: f64 },
    #[error("invalid focal length ({fx}, {fy})")]
    InvalidFocal { fx: f64, fy: f64 },
}

/// A point in normalized image coordinates. This keypoint has been corrected
/// for distortion and normalized based on the camera intrinsic matrix, so it
/// lies on the virtual image plane at depth `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NormalizedKeyPoint(pub Point2<f64>);

impl NormalizedKeyPoint {
    /// The unnormalized bearing `(x, y, 1)`.
    pub fn bearing_unnormalized(self) -> Vector3<f64> {
        self.0.coords.push(1.0)
    }

    /// Projects a bearing back onto the virtual image plane.
    pub fn from_bearing_vector(bearing: Vector3<f64>) -> Option<Self> {
        if bearing.z <= 0.0 {
            return None;
        }
        Some(Self((bearing.xy() / bearing.z).into()))
    }
}

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
///
/// For a high quality camera, this may be sufficient to normalize image coordinates.
/// Undistortion may also be necessary to normalize image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    pub focals: Vector2<f64>,
    pub principal_point: Point2<f64>,
    pub skew: f64,
}

impl CameraIntrinsics {
    /// Creates camera intrinsics that would create an identity intrinsic matrix.
    pub fn identity() -> Self {
        Self {
            focals: Vector2::new(1.0, 1.0),
            skew: 0.0,
            principal_point: Point2::new(0.0, 0.0),
        }
    }

    pub fn focals(self, focals: Vector2<f64>) -> Self {
        Self { focals, ..self }
    }

    pub fn focal(self, focal: f64) -> Self {
        Self {
            focals: Vector2::new(focal, focal),
            ..self
        }
    }

    pub fn principal_point(self, principal_point: Point2<f64>) -> Self {
        Self {
            principal_point,
            ..self
        }
    }

    pub fn skew(self, skew: f64) -> Self {
        Self { skew, ..self }
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focals.x,  self.skew,      self.principal_point.x,
            0.0,            self.focals.y,  self.principal_point.y,
            0.0,            0.0,            1.0,
        )
    }

    /// Takes in a point from an image in pixel coordinates and
    /// converts it to a [`NormalizedKeyPoint`].
    ///
    /// ```
    /// use emvs_core::KeyPoint;
    /// use emvs_pinhole::CameraIntrinsics;
    /// use emvs_core::nalgebra::{Vector2, Point2};
    /// let intrinsics = CameraIntrinsics {
    ///     focals: Vector2::new(800.0, 900.0),
    ///     principal_point: Point2::new(500.0, 600.0),
    ///     skew: 1.7,
    /// };
    /// let kp = KeyPoint(Point2::new(471.0, 322.0));
    /// let nkp = intrinsics.calibrate(kp);
    /// let distance = (kp.to_homogeneous() - intrinsics.matrix() * nkp.to_homogeneous()).norm();
    /// assert!(distance < 0.1);
    /// ```
    pub fn calibrate<P>(&self, point: P) -> NormalizedKeyPoint
    where
        P: ImagePoint,
    {
        let centered = point.image_point() - self.principal_point;
        let y = centered.y / self.focals.y;
        let x = (centered.x - self.skew * y) / self.focals.x;
        NormalizedKeyPoint(Point2::new(x, y))
    }

    /// Converts a [`NormalizedKeyPoint`] back into pixel coordinates.
    pub fn uncalibrate(&self, projection: NormalizedKeyPoint) -> Point2<f64> {
        let y = projection.y * self.focals.y;
        let x = projection.x * self.focals.x + self.skew * projection.y;
        Point2::new(x, y) + self.principal_point.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use emvs_core::KeyPoint;

    #[test]
    fn calibrate_uncalibrate_round_trip() {
        let intrinsics = CameraIntrinsics::identity()
            .focals(Vector2::new(335.4, 335.3))
            .principal_point(Point2::new(129.9, 99.2))
            .skew(0.5);
        let kp = KeyPoint(Point2::new(17.0, 150.0));
        let back = intrinsics.uncalibrate(intrinsics.calibrate(kp));
        assert_relative_eq!(back, kp.0, epsilon = 1e-9);
    }

    #[test]
    fn bearing_behind_camera_has_no_projection() {
        assert!(NormalizedKeyPoint::from_bearing_vector(Vector3::new(0.0, 0.0, -1.0)).is_none());
    }
}
