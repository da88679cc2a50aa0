use crate::{ImagePoint, KeyPoint};
use nalgebra::UnitVector3;

/// Allows conversion between the point on an image and the internal projection
/// which can describe the bearing of the projection out of the camera.
pub trait CameraModel {
    /// Extracts a bearing from a pixel location in an image.
    ///
    /// The bearings X axis points right, Y axis points down, and Z axis points forwards.
    /// The image point uses the same coordinate frame. Its Y is down and its X is right.
    fn calibrate<P>(&self, point: P) -> UnitVector3<f64>
    where
        P: ImagePoint;

    /// Extracts the pixel location in the image from the bearing.
    ///
    /// Since this might not be possible (if the bearing points behind the camera),
    /// this operation is fallible.
    fn uncalibrate(&self, bearing: UnitVector3<f64>) -> Option<KeyPoint>;

    /// The image width in pixels.
    fn width(&self) -> u32;

    /// The image height in pixels.
    fn height(&self) -> u32;

    /// Checks if a pixel coordinate lies within the image.
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width() as f64 && y < self.height() as f64
    }
}
