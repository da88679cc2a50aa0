use crate::DepthSpacing;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The extent of the disparity space image and the depth range it covers.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DsiShape {
    /// Width of the reference view in pixels. `0` uses the event camera width.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub dim_x: u32,
    /// Height of the reference view in pixels. `0` uses the event camera height.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub dim_y: u32,
    /// Number of depth planes.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_dim_z"))]
    pub dim_z: u32,
    /// Depth of the nearest plane.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_min_depth"))]
    pub min_depth: f64,
    /// Depth of the farthest plane.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_max_depth"))]
    pub max_depth: f64,
    /// Horizontal field of view of the reference view. Values below 10 degrees
    /// reuse the focal length of the event camera instead.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub fov_degrees: f64,
}

impl DsiShape {
    pub fn new(
        dim_x: u32,
        dim_y: u32,
        dim_z: u32,
        min_depth: f64,
        max_depth: f64,
        fov_degrees: f64,
    ) -> Self {
        Self {
            dim_x,
            dim_y,
            dim_z,
            min_depth,
            max_depth,
            fov_degrees,
        }
    }
}

impl Default for DsiShape {
    fn default() -> Self {
        Self {
            dim_x: 0,
            dim_y: 0,
            dim_z: default_dim_z(),
            min_depth: default_min_depth(),
            max_depth: default_max_depth(),
            fov_degrees: 0.0,
        }
    }
}

/// The settings of the event back-projection.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapperSettings {
    /// Number of events that share one pose.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_packet_size"))]
    pub packet_size: usize,
    /// Number of warped events above which planes are voted in parallel.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_parallel_threshold")
    )]
    pub parallel_threshold: usize,
    /// How the depth planes are distributed between the minimum and maximum depth.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub depth_spacing: DepthSpacing,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            packet_size: default_packet_size(),
            parallel_threshold: default_parallel_threshold(),
            depth_spacing: DepthSpacing::default(),
        }
    }
}

/// The settings of semi-dense depth map extraction.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthMapOptions {
    /// Odd window size of the Gaussian adaptive threshold on the confidence map.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_adaptive_threshold_kernel_size")
    )]
    pub adaptive_threshold_kernel_size: usize,
    /// Amount the confidence must exceed its local mean by to be kept.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_adaptive_threshold_c")
    )]
    pub adaptive_threshold_c: f64,
    /// Odd window size of the median filter on the depth plane indices.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_median_filter_size")
    )]
    pub median_filter_size: usize,
}

impl Default for DepthMapOptions {
    fn default() -> Self {
        Self {
            adaptive_threshold_kernel_size: default_adaptive_threshold_kernel_size(),
            adaptive_threshold_c: default_adaptive_threshold_c(),
            median_filter_size: default_median_filter_size(),
        }
    }
}

/// The settings of point cloud conversion.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointCloudOptions {
    /// Radius of the neighbourhood searched during outlier removal.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_radius_search"))]
    pub radius_search: f64,
    /// Points with fewer neighbours than this inside the search radius are removed.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_min_num_neighbors")
    )]
    pub min_num_neighbors: usize,
}

impl Default for PointCloudOptions {
    fn default() -> Self {
        Self {
            radius_search: default_radius_search(),
            min_num_neighbors: default_min_num_neighbors(),
        }
    }
}

fn default_dim_z() -> u32 {
    100
}

fn default_min_depth() -> f64 {
    0.3
}

fn default_max_depth() -> f64 {
    5.0
}

fn default_packet_size() -> usize {
    1024
}

fn default_parallel_threshold() -> usize {
    20_000
}

fn default_adaptive_threshold_kernel_size() -> usize {
    5
}

fn default_adaptive_threshold_c() -> f64 {
    5.0
}

fn default_median_filter_size() -> usize {
    5
}

fn default_radius_search() -> f64 {
    0.05
}

fn default_min_num_neighbors() -> usize {
    3
}

#[cfg(all(test, feature = "serde-serialize"))]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: MapperSettings = serde_json::from_str(r#"{"packet_size": 512}"#).unwrap();
        assert_eq!(settings.packet_size, 512);
        assert_eq!(settings.parallel_threshold, 20_000);
        let shape: DsiShape = serde_json::from_str("{}").unwrap();
        assert_eq!(shape, DsiShape::default());
    }
}
