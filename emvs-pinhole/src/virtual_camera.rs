use crate::CameraError;
use emvs_core::nalgebra::{Matrix3, Point2, Point3, UnitVector3, Vector3};
use emvs_core::{CameraModel, ImagePoint, KeyPoint};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// An ideal pinhole camera with a fixed resolution and no distortion.
///
/// The reference view of a disparity space image is such a camera. Its pixel grid
/// matches the `x`/`y` extent of the voxel grid.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PinholeCamera {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

impl PinholeCamera {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// A camera with square pixels, the principal point at the image center and
    /// the given focal length.
    pub fn centered(focal: f64, width: u32, height: u32) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidResolution {
                width: width as f64,
                height: height as f64,
            });
        }
        if !(focal.is_finite() && focal > 0.0) {
            return Err(CameraError::InvalidFocal {
                fx: focal,
                fy: focal,
            });
        }
        Ok(Self::new(
            focal,
            focal,
            0.5 * width as f64,
            0.5 * height as f64,
            width,
            height,
        ))
    }

    /// A centered camera whose horizontal field of view is `fov_degrees`.
    ///
    /// ```
    /// use emvs_pinhole::PinholeCamera;
    /// let camera = PinholeCamera::from_field_of_view(90.0, 200, 100).unwrap();
    /// assert!((camera.fx - 100.0).abs() < 1e-9);
    /// ```
    pub fn from_field_of_view(
        fov_degrees: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, CameraError> {
        let focal = 0.5 * width as f64 / (0.5 * fov_degrees.to_radians()).tan();
        Self::centered(focal, width, height)
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0,     self.cx,
            0.0,     self.fy, self.cy,
            0.0,     0.0,     1.0,
        )
    }

    /// Closed form inverse of [`PinholeCamera::matrix`].
    #[rustfmt::skip]
    pub fn inverse_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            1.0 / self.fx, 0.0,           -self.cx / self.fx,
            0.0,           1.0 / self.fy, -self.cy / self.fy,
            0.0,           0.0,           1.0,
        )
    }

    /// Projects a point in camera coordinates onto the image plane.
    ///
    /// Points on or behind the optical center have no projection.
    pub fn project(&self, point: Point3<f64>) -> Option<Point2<f64>> {
        if point.z <= 0.0 {
            return None;
        }
        Some(Point2::new(
            self.fx * point.x / point.z + self.cx,
            self.fy * point.y / point.z + self.cy,
        ))
    }

    /// The ray through pixel `(x, y)`, scaled so that its `z` component is `1`.
    pub fn pixel_to_ray(&self, x: f64, y: f64) -> Vector3<f64> {
        Vector3::new((x - self.cx) / self.fx, (y - self.cy) / self.fy, 1.0)
    }
}

impl CameraModel for PinholeCamera {
    fn calibrate<P>(&self, point: P) -> UnitVector3<f64>
    where
        P: ImagePoint,
    {
        let p = point.image_point();
        UnitVector3::new_normalize(self.pixel_to_ray(p.x, p.y))
    }

    fn uncalibrate(&self, bearing: UnitVector3<f64>) -> Option<KeyPoint> {
        self.project(Point3::from(bearing.into_inner())).map(KeyPoint)
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
