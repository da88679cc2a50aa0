use crate::{DepthMap, PointCloudOptions};
use emvs_core::nalgebra::{Point2, Point3};
use emvs_core::{CameraModel, CameraPoint, CameraToWorld, KeyPoint, Pose, Projective};
use emvs_pinhole::PinholeCamera;
use log::*;
use rstar::RTree;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A point of the reconstruction, in the frame of the reference view.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudPoint {
    pub position: Point3<f64>,
    /// Inverse depth of the point.
    pub intensity: f64,
}

/// Back-projects every valid pixel of `depth_map` through `camera` and removes points
/// with too few neighbours.
///
/// A depth map whose size differs from the camera produces an empty cloud.
pub fn point_cloud(
    depth_map: &DepthMap,
    camera: &PinholeCamera,
    options: &PointCloudOptions,
) -> Vec<CloudPoint> {
    if depth_map.width() != camera.width || depth_map.height() != camera.height {
        warn!(
            "depth map is {}x{} but the camera is {}x{}, no point cloud produced",
            depth_map.width(),
            depth_map.height(),
            camera.width,
            camera.height
        );
        return vec![];
    }

    let points: Vec<CloudPoint> = (0..depth_map.height())
        .flat_map(|y| (0..depth_map.width()).map(move |x| (x, y)))
        .filter_map(|(x, y)| {
            let depth = depth_map.depth_at(x, y)? as f64;
            let bearing = camera.calibrate(KeyPoint(Point2::new(x as f64, y as f64)));
            let position = Point3::from(bearing.into_inner() * (depth / bearing.z));
            Some(CloudPoint {
                position,
                intensity: position.z.recip(),
            })
        })
        .collect();

    let filtered = radius_outlier_removal(points, options);
    debug!("point cloud has {} points after outlier removal", filtered.len());
    filtered
}

/// Keeps the points that have at least `min_num_neighbors` other points within `radius_search`.
pub fn radius_outlier_removal(
    points: Vec<CloudPoint>,
    options: &PointCloudOptions,
) -> Vec<CloudPoint> {
    if options.min_num_neighbors == 0 {
        return points;
    }
    let index: RTree<[f64; 3]> = RTree::bulk_load(
        points
            .iter()
            .map(|p| [p.position.x, p.position.y, p.position.z])
            .collect(),
    );
    let radius2 = options.radius_search * options.radius_search;
    let before = points.len();
    let kept: Vec<CloudPoint> = points
        .into_iter()
        .filter(|p| {
            let query = [p.position.x, p.position.y, p.position.z];
            // The point itself is always inside its own radius.
            let neighbors = index
                .locate_within_distance(query, radius2)
                .take(options.min_num_neighbors + 1)
                .count()
                .saturating_sub(1);
            neighbors >= options.min_num_neighbors
        })
        .collect();
    trace!("outlier removal dropped {} points", before - kept.len());
    kept
}

/// Moves a cloud from the reference view into the world frame.
///
/// The intensity keeps the inverse depth seen from the reference view.
pub fn transform_cloud(points: &[CloudPoint], t_w_rv: CameraToWorld) -> Vec<CloudPoint> {
    points
        .iter()
        .filter_map(|p| {
            let world = t_w_rv.transform(CameraPoint::from_point(p.position));
            Some(CloudPoint {
                position: world.point()?,
                intensity: p.intensity,
            })
        })
        .collect()
}
