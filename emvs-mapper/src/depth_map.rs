use crate::filter::{adaptive_threshold, masked_median_filter, normalize_to_u8};
use crate::{DepthMapOptions, DepthVector, GrayFloatImage, VoxelGrid3D};
use image::{GrayImage, Luma, Rgb, RgbImage};
use log::*;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("adaptive threshold kernel size must be odd and at least 3, got {0}")]
    InvalidKernelSize(usize),
    #[error("median filter size must be odd, got {0}")]
    InvalidMedianSize(usize),
}

/// A semi-dense depth map in the pixel grid of the reference view.
///
/// Only pixels whose mask is set carry a meaningful depth.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    depth: GrayFloatImage,
    confidence: GrayFloatImage,
    mask: GrayImage,
}

impl DepthMap {
    /// Assembles a depth map from its three layers.
    ///
    /// Returns `None` if the layers do not share the same dimensions.
    pub fn from_parts(
        depth: GrayFloatImage,
        confidence: GrayFloatImage,
        mask: GrayImage,
    ) -> Option<Self> {
        (depth.dimensions() == confidence.dimensions() && depth.dimensions() == mask.dimensions())
            .then(|| Self {
                depth,
                confidence,
                mask,
            })
    }

    pub fn width(&self) -> u32 {
        self.depth.width()
    }

    pub fn height(&self) -> u32 {
        self.depth.height()
    }

    /// The depth of every pixel, including the ones outside the mask.
    pub fn depth(&self) -> &GrayFloatImage {
        &self.depth
    }

    /// The largest vote count along the ray of every pixel.
    pub fn confidence(&self) -> &GrayFloatImage {
        &self.confidence
    }

    /// `1` for valid pixels, `0` otherwise.
    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    pub fn is_valid(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.mask.get_pixel(x, y)[0] != 0
    }

    /// The depth at a valid pixel.
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.is_valid(x, y).then(|| self.depth.get_pixel(x, y)[0])
    }

    pub fn confidence_at(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.width() && y < self.height()).then(|| self.confidence.get_pixel(x, y)[0])
    }

    pub fn valid_count(&self) -> usize {
        self.mask.as_raw().iter().filter(|&&m| m != 0).count()
    }

    /// The mask as a black and white image.
    pub fn mask_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([if self.mask.get_pixel(x, y)[0] != 0 { 255 } else { 0 }])
        })
    }

    /// The confidence stretched to the full 8-bit range.
    pub fn confidence_image(&self) -> GrayImage {
        normalize_to_u8(&self.confidence)
    }

    /// Valid depths mapped linearly from `[min_depth, max_depth]` to `[1, 255]`.
    /// Invalid pixels are black.
    pub fn depth_image(&self, min_depth: f32, max_depth: f32) -> GrayImage {
        let range = (max_depth - min_depth).max(f32::EPSILON);
        GrayImage::from_fn(self.width(), self.height(), |x, y| match self.depth_at(x, y) {
            Some(depth) => {
                let t = ((depth - min_depth) / range).clamp(0.0, 1.0);
                Luma([1 + (t * 254.0).round() as u8])
            }
            None => Luma([0]),
        })
    }

    /// Valid depths on a jet color scale, from blue at `min_depth` to red at `max_depth`.
    /// Invalid pixels are black.
    pub fn depth_colored_image(&self, min_depth: f32, max_depth: f32) -> RgbImage {
        let range = (max_depth - min_depth).max(f32::EPSILON);
        RgbImage::from_fn(self.width(), self.height(), |x, y| match self.depth_at(x, y) {
            Some(depth) => jet(((depth - min_depth) / range).clamp(0.0, 1.0)),
            None => Rgb([0, 0, 0]),
        })
    }
}

/// Piecewise linear jet colormap over `[0, 1]`.
fn jet(t: f32) -> Rgb<u8> {
    let channel = |offset: f32| {
        let value = (1.5 - (4.0 * t - offset).abs()).clamp(0.0, 1.0);
        (value * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Turns the votes of a [`VoxelGrid3D`] into a [`DepthMap`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthExtractor {
    options: DepthMapOptions,
}

impl DepthExtractor {
    pub fn new(options: DepthMapOptions) -> Result<Self, ExtractionError> {
        let kernel = options.adaptive_threshold_kernel_size;
        if kernel < 3 || kernel % 2 == 0 {
            return Err(ExtractionError::InvalidKernelSize(kernel));
        }
        let median = options.median_filter_size;
        if median % 2 == 0 {
            return Err(ExtractionError::InvalidMedianSize(median));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &DepthMapOptions {
        &self.options
    }

    /// Width of the frame that is cleared from the mask.
    pub fn border_size(&self) -> u32 {
        (self.options.adaptive_threshold_kernel_size / 2).max(1) as u32
    }

    pub fn extract(&self, grid: &VoxelGrid3D, depth_vector: &DepthVector) -> DepthMap {
        let (confidence, indices) = grid.collapse_max_z_slice();

        let confidence_8bit = normalize_to_u8(&confidence);
        let mut mask = adaptive_threshold(
            &confidence_8bit,
            self.options.adaptive_threshold_kernel_size,
            self.options.adaptive_threshold_c,
        );

        let indices = masked_median_filter(&indices, &mask, self.options.median_filter_size);

        let border = self.border_size();
        let (width, height) = mask.dimensions();
        for (x, y, pixel) in mask.enumerate_pixels_mut() {
            if x <= border || x + border >= width || y <= border || y + border >= height {
                pixel[0] = 0;
            }
        }

        let depth = GrayFloatImage::from_fn(width, height, |x, y| {
            Luma([depth_vector.plane_index_to_depth(indices.get_pixel(x, y)[0] as usize) as f32])
        });

        let map = DepthMap {
            depth,
            confidence,
            mask,
        };
        debug!(
            "extracted depth map with {} of {} pixels valid",
            map.valid_count(),
            width as usize * height as usize
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DepthSpacing;

    fn options() -> DepthMapOptions {
        DepthMapOptions::default()
    }

    #[test]
    fn rejects_even_windows() {
        let even_kernel = DepthMapOptions {
            adaptive_threshold_kernel_size: 4,
            ..options()
        };
        assert_eq!(
            DepthExtractor::new(even_kernel),
            Err(ExtractionError::InvalidKernelSize(4))
        );
        let even_median = DepthMapOptions {
            median_filter_size: 2,
            ..options()
        };
        assert_eq!(
            DepthExtractor::new(even_median),
            Err(ExtractionError::InvalidMedianSize(2))
        );
    }

    #[test]
    fn empty_grid_has_no_valid_pixels() {
        let grid = VoxelGrid3D::new(12, 10, 4);
        let depths = DepthVector::new(1.0, 4.0, 4, DepthSpacing::Linear).unwrap();
        let map = DepthExtractor::new(options()).unwrap().extract(&grid, &depths);
        assert_eq!(map.valid_count(), 0);
        assert_eq!((map.width(), map.height()), (12, 10));
        assert!(map.depth_at(5, 5).is_none());
        assert_eq!(map.confidence_at(5, 5), Some(0.0));
    }

    #[test]
    fn isolated_peak_is_kept_with_its_depth() {
        let mut grid = VoxelGrid3D::new(16, 16, 4);
        for mut plane in grid.planes_mut() {
            let votes = if plane.z() == 2 { 10.0 } else { 1.0 };
            plane.accumulate_weighted_at(8.0, 8.0, votes);
        }
        let depths = DepthVector::new(1.0, 4.0, 4, DepthSpacing::Linear).unwrap();
        let map = DepthExtractor::new(options()).unwrap().extract(&grid, &depths);
        assert_eq!(map.depth_at(8, 8), Some(3.0));
        assert_eq!(map.confidence_at(8, 8), Some(10.0));
        assert_eq!(map.valid_count(), 1);
        assert_eq!(map.mask_image().get_pixel(8, 8)[0], 255);
        assert_eq!(map.depth_image(1.0, 4.0).get_pixel(8, 8)[0], 1 + 169);
        let colored = map.depth_colored_image(1.0, 4.0);
        let Rgb([r, g, b]) = *colored.get_pixel(8, 8);
        assert_eq!((r, b), (255, 0));
        assert!(g > 0);
        assert_eq!(*colored.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn jet_runs_from_blue_to_red() {
        assert_eq!(jet(0.0), Rgb([0, 0, 128]));
        assert_eq!(jet(0.5), Rgb([128, 255, 128]));
        assert_eq!(jet(1.0), Rgb([128, 0, 0]));
    }

    #[test]
    fn border_is_cleared() {
        let mut grid = VoxelGrid3D::new(10, 10, 2);
        for mut plane in grid.planes_mut() {
            // A peak right next to the frame.
            plane.accumulate_weighted_at(2.0, 5.0, 10.0);
        }
        let depths = DepthVector::new(1.0, 2.0, 2, DepthSpacing::Linear).unwrap();
        let extractor = DepthExtractor::new(options()).unwrap();
        assert_eq!(extractor.border_size(), 2);
        let map = extractor.extract(&grid, &depths);
        assert!(!map.is_valid(2, 5));
    }
}
