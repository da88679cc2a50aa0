use crate::MapperError;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// How depth planes are distributed between the nearest and the farthest depth.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum DepthSpacing {
    /// Equal steps in depth.
    Linear,
    /// Equal steps in inverse depth, which puts more planes close to the camera.
    #[default]
    Inverse,
}

/// The depths of the planes of a disparity space image, nearest first.
///
/// ```
/// use emvs_mapper::{DepthSpacing, DepthVector};
/// let depths = DepthVector::new(1.0, 2.0, 3, DepthSpacing::Linear).unwrap();
/// assert_eq!(depths.depths(), &[1.0, 1.5, 2.0]);
/// assert_eq!(depths.depth_to_plane_index(1.7), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DepthVector {
    spacing: DepthSpacing,
    min_depth: f64,
    max_depth: f64,
    /// Planes per unit of depth (or inverse depth).
    scale: f64,
    depths: Vec<f64>,
}

impl DepthVector {
    pub fn new(
        min_depth: f64,
        max_depth: f64,
        count: usize,
        spacing: DepthSpacing,
    ) -> Result<Self, MapperError> {
        if !(min_depth.is_finite() && max_depth.is_finite() && min_depth > 0.0 && max_depth > min_depth)
        {
            return Err(MapperError::InvalidDepthRange {
                min_depth,
                max_depth,
            });
        }
        if count < 2 {
            return Err(MapperError::InvalidShape(format!(
                "at least two depth planes are needed, got {}",
                count
            )));
        }
        let steps = (count - 1) as f64;
        let scale = match spacing {
            DepthSpacing::Linear => steps / (max_depth - min_depth),
            DepthSpacing::Inverse => steps / (min_depth.recip() - max_depth.recip()),
        };
        let depths = (0..count)
            .map(|i| match spacing {
                DepthSpacing::Linear => min_depth + i as f64 / scale,
                DepthSpacing::Inverse => (min_depth.recip() - i as f64 / scale).recip(),
            })
            .collect();
        Ok(Self {
            spacing,
            min_depth,
            max_depth,
            scale,
            depths,
        })
    }

    pub fn spacing(&self) -> DepthSpacing {
        self.spacing
    }

    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn min_depth(&self) -> f64 {
        self.min_depth
    }

    pub fn max_depth(&self) -> f64 {
        self.max_depth
    }

    /// The depth of plane `index`. Indices past the last plane are clamped.
    pub fn plane_index_to_depth(&self, index: usize) -> f64 {
        self.depths[index.min(self.depths.len() - 1)]
    }

    /// The plane closest to `depth`, clamped to the valid planes.
    pub fn depth_to_plane_index(&self, depth: f64) -> usize {
        let position = match self.spacing {
            DepthSpacing::Linear => (depth - self.min_depth) * self.scale,
            DepthSpacing::Inverse => (self.min_depth.recip() - depth.recip()) * self.scale,
        };
        let last = (self.depths.len() - 1) as f64;
        // NaN falls through both comparisons and lands on plane 0.
        let index = (position + 0.5).floor();
        if index >= last {
            self.depths.len() - 1
        } else if index > 0.0 {
            index as usize
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_planes_are_evenly_spaced() {
        let depths = DepthVector::new(0.5, 4.5, 5, DepthSpacing::Linear).unwrap();
        assert_eq!(depths.depths(), &[0.5, 1.5, 2.5, 3.5, 4.5]);
        assert_eq!(depths.len(), 5);
    }

    #[test]
    fn inverse_planes_are_ascending_and_hit_the_bounds() {
        let depths = DepthVector::new(0.3, 5.0, 100, DepthSpacing::Inverse).unwrap();
        assert_relative_eq!(depths.plane_index_to_depth(0), 0.3, epsilon = 1e-12);
        assert_relative_eq!(depths.plane_index_to_depth(99), 5.0, epsilon = 1e-9);
        assert!(depths.depths().windows(2).all(|w| w[0] < w[1]));
        let inverse_steps: Vec<f64> = depths
            .depths()
            .windows(2)
            .map(|w| w[0].recip() - w[1].recip())
            .collect();
        for step in &inverse_steps {
            assert_relative_eq!(*step, inverse_steps[0], epsilon = 1e-9);
        }
    }

    #[test]
    fn index_lookup_round_trips() {
        for spacing in [DepthSpacing::Linear, DepthSpacing::Inverse] {
            let depths = DepthVector::new(0.3, 5.0, 50, spacing).unwrap();
            for i in 0..depths.len() {
                assert_eq!(depths.depth_to_plane_index(depths.plane_index_to_depth(i)), i);
            }
        }
    }

    #[test]
    fn any_depth_maps_to_a_neighbouring_plane() {
        for spacing in [DepthSpacing::Linear, DepthSpacing::Inverse] {
            let depths = DepthVector::new(0.3, 5.0, 50, spacing).unwrap();
            let planes = depths.depths();
            for n in 0..1000 {
                let d = 0.3 + (5.0 - 0.3) * n as f64 / 999.0;
                // The planes bracketing `d`.
                let above = planes.partition_point(|&p| p < d).clamp(1, planes.len() - 1);
                let step = planes[above] - planes[above - 1];
                let snapped = depths.plane_index_to_depth(depths.depth_to_plane_index(d));
                assert!(
                    (snapped - d).abs() <= step + 1e-9,
                    "{:?}: {} snapped to {}",
                    spacing,
                    d,
                    snapped
                );
            }
        }
    }

    #[test]
    fn index_lookup_clamps() {
        let depths = DepthVector::new(1.0, 2.0, 11, DepthSpacing::Linear).unwrap();
        assert_eq!(depths.depth_to_plane_index(0.1), 0);
        assert_eq!(depths.depth_to_plane_index(100.0), 10);
        assert_eq!(depths.depth_to_plane_index(1.14), 1);
        assert_eq!(depths.plane_index_to_depth(42), 2.0);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(DepthVector::new(0.0, 1.0, 10, DepthSpacing::Linear).is_err());
        assert!(DepthVector::new(2.0, 1.0, 10, DepthSpacing::Linear).is_err());
        assert!(DepthVector::new(1.0, f64::INFINITY, 10, DepthSpacing::Inverse).is_err());
        assert!(DepthVector::new(1.0, 2.0, 1, DepthSpacing::Inverse).is_err());
    }
}
