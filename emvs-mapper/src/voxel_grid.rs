use crate::{GrayFloatImage, PlaneIndexImage};
use core::fmt;
use image::Luma;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A dense grid of `f32` votes, stored plane after plane.
///
/// Voxel `(x, y, z)` lives at `x + dim_x * (y + dim_y * z)`, so every depth plane is one
/// contiguous slice of the buffer and planes can be handed out as disjoint `&mut [f32]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid3D {
    dim_x: usize,
    dim_y: usize,
    dim_z: usize,
    data: Vec<f32>,
}

impl VoxelGrid3D {
    /// Allocates a zeroed grid.
    pub fn new(dim_x: usize, dim_y: usize, dim_z: usize) -> Self {
        Self {
            dim_x,
            dim_y,
            dim_z,
            data: vec![0.0; dim_x * dim_y * dim_z],
        }
    }

    /// Zeroes every voxel without reallocating.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
    }

    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.dim_x, self.dim_y, self.dim_z)
    }

    /// Number of voxels in one depth plane.
    pub fn plane_size(&self) -> usize {
        self.dim_x * self.dim_y
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        (x < self.dim_x && y < self.dim_y && z < self.dim_z)
            .then(|| x + self.dim_x * (y + self.dim_y * z))
    }

    pub fn value_at(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        self.index(x, y, z).map(|i| self.data[i])
    }

    /// The votes of depth plane `z`.
    pub fn plane(&self, z: usize) -> Option<&[f32]> {
        let size = self.plane_size();
        (z < self.dim_z).then(|| &self.data[z * size..(z + 1) * size])
    }

    /// Splats one vote at the sub-pixel position `(x, y)` of plane `z`.
    pub fn accumulate_at(&mut self, x: f32, y: f32, z: usize) {
        if let Some(mut slice) = self.planes_mut().nth(z) {
            slice.accumulate_at(x, y);
        }
    }

    /// Iterates over the depth planes as independent mutable slices, nearest plane first.
    pub fn planes_mut(&mut self) -> impl Iterator<Item = ZSliceMut<'_>> {
        let (dim_x, dim_y) = (self.dim_x, self.dim_y);
        self.data
            .chunks_exact_mut((dim_x * dim_y).max(1))
            .enumerate()
            .map(move |(z, data)| ZSliceMut {
                data,
                dim_x,
                dim_y,
                z,
            })
    }

    /// Parallel version of [`VoxelGrid3D::planes_mut`].
    #[cfg(feature = "rayon")]
    pub fn par_planes_mut(&mut self) -> impl IndexedParallelIterator<Item = ZSliceMut<'_>> {
        let (dim_x, dim_y) = (self.dim_x, self.dim_y);
        self.data
            .par_chunks_mut((dim_x * dim_y).max(1))
            .enumerate()
            .map(move |(z, data)| ZSliceMut {
                data,
                dim_x,
                dim_y,
                z,
            })
    }

    /// Collapses the grid along `z`, keeping for every pixel the largest vote count and the
    /// plane it was found on. Ties go to the nearest plane.
    pub fn collapse_max_z_slice(&self) -> (GrayFloatImage, PlaneIndexImage) {
        let size = self.plane_size();
        let mut confidence = vec![0.0f32; size];
        let mut indices = vec![0u16; size];
        if let Some(first) = self.plane(0) {
            confidence.copy_from_slice(first);
        }
        for (z, plane) in self.data.chunks_exact(size.max(1)).enumerate().skip(1) {
            let best = confidence.iter_mut().zip(indices.iter_mut());
            for ((best, index), &value) in best.zip(plane) {
                if value > *best {
                    *best = value;
                    *index = z as u16;
                }
            }
        }
        let width = self.dim_x as u32;
        let height = self.dim_y as u32;
        let at = |x: u32, y: u32| y as usize * self.dim_x + x as usize;
        (
            GrayFloatImage::from_fn(width, height, |x, y| Luma([confidence[at(x, y)]])),
            PlaneIndexImage::from_fn(width, height, |x, y| Luma([indices[at(x, y)]])),
        )
    }

    /// Mean of the squared votes over the whole grid.
    pub fn mean_square(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| v as f64 * v as f64).sum();
        sum / self.data.len() as f64
    }

    /// Sum of all votes.
    pub fn total(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }
}

impl fmt::Display for VoxelGrid3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "voxel grid {} x {} x {} ({} voxels, mean square {:.6})",
            self.dim_x,
            self.dim_y,
            self.dim_z,
            self.data.len(),
            self.mean_square()
        )
    }
}

/// One depth plane of a [`VoxelGrid3D`], borrowed mutably.
#[derive(Debug)]
pub struct ZSliceMut<'a> {
    data: &'a mut [f32],
    dim_x: usize,
    dim_y: usize,
    z: usize,
}

impl<'a> ZSliceMut<'a> {
    /// The index of this plane in its grid.
    pub fn z(&self) -> usize {
        self.z
    }

    /// Splats one unit vote at `(x, y)`.
    #[inline]
    pub fn accumulate_at(&mut self, x: f32, y: f32) {
        self.accumulate_weighted_at(x, y, 1.0);
    }

    /// Splats `weight` bilinearly over the four voxels around `(x, y)`.
    ///
    /// The vote is dropped unless all four voxels are inside the plane.
    #[inline]
    pub fn accumulate_weighted_at(&mut self, x: f32, y: f32, weight: f32) {
        // NaN fails both comparisons.
        if !(x >= 0.0 && y >= 0.0) {
            return;
        }
        let xf = x.floor();
        let yf = y.floor();
        // Checked in float so that huge coordinates never reach the integer casts.
        if !(xf + 1.0 < self.dim_x as f32 && yf + 1.0 < self.dim_y as f32) {
            return;
        }
        let (xi, yi) = (xf as usize, yf as usize);
        let dx = x - xf;
        let dy = y - yf;
        let top = yi * self.dim_x + xi;
        let bottom = top + self.dim_x;
        self.data[top] += weight * (1.0 - dx) * (1.0 - dy);
        self.data[top + 1] += weight * dx * (1.0 - dy);
        self.data[bottom] += weight * (1.0 - dx) * dy;
        self.data[bottom + 1] += weight * dx * dy;
    }
}
