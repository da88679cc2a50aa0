use crate::{CameraError, CameraIntrinsics, NormalizedKeyPoint, RadialTangential};
use emvs_core::nalgebra::{Matrix3, Point2, UnitVector3, Vector2};
use emvs_core::{CameraModel, ImagePoint, KeyPoint};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Number of values expected by [`EventCamera::from_parameters`].
pub const CAMERA_PARAMETER_COUNT: usize = 6;

/// The physical event camera: intrinsics, lens distortion and sensor resolution.
///
/// ```
/// use emvs_pinhole::EventCamera;
/// let camera = EventCamera::from_parameters(&[
///     335.41946, 335.35294, 129.92466, 99.18643, 240.0, 180.0,
/// ]).unwrap();
/// assert_eq!((camera.width, camera.height), (240, 180));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct EventCamera {
    pub intrinsics: CameraIntrinsics,
    pub distortion: RadialTangential,
    pub width: u32,
    pub height: u32,
}

impl EventCamera {
    /// Parses `[fx, fy, cx, cy, width, height]`. The camera starts without distortion.
    pub fn from_parameters(parameters: &[f32]) -> Result<Self, CameraError> {
        let [fx, fy, cx, cy, width, height]: [f32; CAMERA_PARAMETER_COUNT] =
            parameters
                .try_into()
                .map_err(|_| CameraError::WrongParameterCount {
                    expected: CAMERA_PARAMETER_COUNT,
                    got: parameters.len(),
                })?;
        let (fx, fy) = (fx as f64, fy as f64);
        let (width, height) = (width as f64, height as f64);
        if !(fx.is_finite() && fy.is_finite() && fx > 0.0 && fy > 0.0) {
            return Err(CameraError::InvalidFocal { fx, fy });
        }
        if !(width >= 1.0 && height >= 1.0 && width <= u32::MAX as f64 && height <= u32::MAX as f64)
            || width.fract() != 0.0
            || height.fract() != 0.0
        {
            return Err(CameraError::InvalidResolution { width, height });
        }
        let intrinsics = CameraIntrinsics::identity()
            .focals(Vector2::new(fx, fy))
            .principal_point(Point2::new(cx as f64, cy as f64));
        Ok(Self {
            intrinsics,
            distortion: RadialTangential::default(),
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn with_distortion(self, distortion: RadialTangential) -> Self {
        Self { distortion, ..self }
    }

    /// The intrinsic matrix `K`.
    pub fn matrix(&self) -> Matrix3<f64> {
        self.intrinsics.matrix()
    }

    /// Maps a raw sensor pixel to the pixel it would occupy without lens distortion.
    pub fn rectify(&self, x: f64, y: f64) -> Point2<f64> {
        let bearing = self.calibrate(KeyPoint(Point2::new(x, y)));
        // Undistorted bearings always point forwards.
        NormalizedKeyPoint::from_bearing_vector(bearing.into_inner())
            .map(|ideal| self.intrinsics.uncalibrate(ideal))
            .unwrap_or_else(|| Point2::new(x, y))
    }

    /// Rectified coordinates of every sensor pixel, indexed by `y * width + x`.
    pub fn rectified_point_table(&self) -> Vec<Point2<f64>> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| self.rectify(x as f64, y as f64))
            .collect()
    }
}

impl CameraModel for EventCamera {
    fn calibrate<P>(&self, point: P) -> UnitVector3<f64>
    where
        P: ImagePoint,
    {
        let distorted = self.intrinsics.calibrate(point);
        let undistorted = NormalizedKeyPoint(self.distortion.undistort(distorted.0));
        UnitVector3::new_normalize(undistorted.bearing_unnormalized())
    }

    fn uncalibrate(&self, bearing: UnitVector3<f64>) -> Option<KeyPoint> {
        let ideal = NormalizedKeyPoint::from_bearing_vector(bearing.into_inner())?;
        let distorted = NormalizedKeyPoint(self.distortion.distort(ideal.0));
        Some(KeyPoint(self.intrinsics.uncalibrate(distorted)))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
