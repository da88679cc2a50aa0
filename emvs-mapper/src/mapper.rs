use crate::{
    point_cloud, CloudPoint, DepthExtractor, DepthMap, DepthMapOptions, DepthVector, DsiShape,
    ExtractionError, MapperSettings, PointCloudOptions, VoxelGrid3D, ZSliceMut,
};
use emvs_core::nalgebra::{Matrix3, Point2, Vector3};
use emvs_core::{CameraModel, CameraToCamera, Event, Pose, PoseTrajectory, WorldToCamera};
use emvs_pinhole::{CameraError, EventCamera, PinholeCamera};
use log::*;
use std::ops::Range;
use std::time::{Duration, Instant};
use thiserror::Error;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Warped events are voted in groups of this size to stay in cache.
const SUB_BATCH: usize = 128;
/// Below this field of view (in degrees) the virtual camera reuses the event camera focal length.
const MIN_FIELD_OF_VIEW: f64 = 10.0;
/// Plane indices are stored as `u16`.
const MAX_PLANES: u32 = 1 << 16;
/// Plane transfers whose denominator is smaller than this are skipped.
const DEGENERATE_DENOMINATOR: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapperError {
    #[error("invalid DSI shape: {0}")]
    InvalidShape(String),
    #[error("invalid depth range [{min_depth}, {max_depth}]")]
    InvalidDepthRange { min_depth: f64, max_depth: f64 },
    #[error("the packet size must be at least one event")]
    InvalidPacketSize,
    #[error("got {events} events but a packet needs {packet_size}")]
    InsufficientEvents { events: usize, packet_size: usize },
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
}

/// What happened during one call to [`DsiMapper::evaluate`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationStats {
    /// Events that were warped into the reference view.
    pub events_processed: usize,
    /// Packets that contributed votes.
    pub batches: usize,
    /// Events skipped because no pose was available or the geometry was degenerate.
    pub skipped_events: usize,
    /// Events outside the sensor or with a warp that could not be normalized.
    pub dropped_events: usize,
    pub elapsed: Duration,
}

/// The events of one packet after warping onto the nearest depth plane.
#[derive(Debug, Clone)]
struct WarpedPacket {
    /// Optical center of the event camera in the reference view.
    center: Vector3<f64>,
    locations: Range<usize>,
}

/// Back-projects events into a disparity space image attached to a virtual reference view.
///
/// The events of a packet share one pose. They are first transferred onto the nearest depth
/// plane with a homography and then onto every other plane with a cheap affine relation, where
/// each transferred event casts one bilinear vote.
#[derive(Debug, Clone)]
pub struct DsiMapper {
    event_camera: EventCamera,
    virtual_camera: PinholeCamera,
    shape: DsiShape,
    settings: MapperSettings,
    rectified_points: Vec<Point2<f64>>,
    depth_vector: DepthVector,
    grid: VoxelGrid3D,
    locations: Vec<Point2<f32>>,
    packets: Vec<WarpedPacket>,
}

impl DsiMapper {
    pub fn new(
        event_camera: EventCamera,
        shape: DsiShape,
        settings: MapperSettings,
    ) -> Result<Self, MapperError> {
        if settings.packet_size == 0 {
            return Err(MapperError::InvalidPacketSize);
        }
        if shape.dim_z < 2 || shape.dim_z > MAX_PLANES {
            return Err(MapperError::InvalidShape(format!(
                "dim_z must be between 2 and {}, got {}",
                MAX_PLANES, shape.dim_z
            )));
        }
        let depth_vector = DepthVector::new(
            shape.min_depth,
            shape.max_depth,
            shape.dim_z as usize,
            settings.depth_spacing,
        )?;

        let mut shape = shape;
        if shape.dim_x == 0 {
            shape.dim_x = event_camera.width;
        }
        if shape.dim_y == 0 {
            shape.dim_y = event_camera.height;
        }

        let focal = if shape.fov_degrees < MIN_FIELD_OF_VIEW {
            warn!(
                "DSI field of view {} is below {} degrees, using the event camera focal length",
                shape.fov_degrees, MIN_FIELD_OF_VIEW
            );
            event_camera.intrinsics.focals.x
        } else if shape.fov_degrees < 180.0 {
            0.5 * shape.dim_x as f64 / (0.5 * shape.fov_degrees.to_radians()).tan()
        } else {
            return Err(MapperError::InvalidShape(format!(
                "field of view must be below 180 degrees, got {}",
                shape.fov_degrees
            )));
        };
        info!("focal length of the virtual camera: {} pixels", focal);
        let virtual_camera = PinholeCamera::centered(focal, shape.dim_x, shape.dim_y)?;

        let rectified_points = event_camera.rectified_point_table();
        let grid = VoxelGrid3D::new(
            shape.dim_x as usize,
            shape.dim_y as usize,
            shape.dim_z as usize,
        );
        debug!("allocated {}", grid);

        Ok(Self {
            event_camera,
            virtual_camera,
            shape,
            settings,
            rectified_points,
            depth_vector,
            grid,
            locations: vec![],
            packets: vec![],
        })
    }

    /// Fills the grid with the votes of `events`, seen from the reference view `t_rv_w`.
    ///
    /// The grid is reset first. Fails when there are fewer events than one packet, in which
    /// case the grid stays empty.
    pub fn evaluate(
        &mut self,
        events: &[Event],
        trajectory: &PoseTrajectory,
        t_rv_w: WorldToCamera,
    ) -> Result<EvaluationStats, MapperError> {
        let start = Instant::now();
        self.grid.reset();
        let packet_size = self.settings.packet_size;
        if events.len() < packet_size {
            return Err(MapperError::InsufficientEvents {
                events: events.len(),
                packet_size,
            });
        }

        let mut stats = self.warp_events(events, trajectory, t_rv_w);
        self.fill_voxel_grid();

        stats.elapsed = start.elapsed();
        info!(
            "evaluated DSI from {} events in {} packets ({} skipped, {} dropped) in {:?}",
            stats.events_processed,
            stats.batches,
            stats.skipped_events,
            stats.dropped_events,
            stats.elapsed
        );
        debug!("{}", self.grid);
        Ok(stats)
    }

    /// Transfers every event onto the nearest depth plane, one packet at a time.
    fn warp_events(
        &mut self,
        events: &[Event],
        trajectory: &PoseTrajectory,
        t_rv_w: WorldToCamera,
    ) -> EvaluationStats {
        self.locations.clear();
        self.packets.clear();
        let mut stats = EvaluationStats::default();
        let z0 = self.depth_vector.depths()[0];
        let k_ev = self.event_camera.matrix();
        let k_virtual_inv = self.virtual_camera.inverse_matrix();
        let width = self.event_camera.width as usize;

        let mut cursor = 0;
        while cursor < events.len() {
            let end = (cursor + self.settings.packet_size).min(events.len());
            let packet = &events[cursor..end];
            let timestamp = packet[packet.len() / 2].timestamp;

            let t_w_ev = match trajectory.pose_at(timestamp) {
                Ok(pose) => pose,
                Err(e) => {
                    trace!("skipping event {}: {}", cursor, e);
                    stats.skipped_events += 1;
                    cursor += 1;
                    continue;
                }
            };

            let t_ev_rv: CameraToCamera = (t_rv_w * t_w_ev).inverse();
            let h_z0_px = match plane_homography(t_ev_rv, z0, &k_ev, &k_virtual_inv) {
                Some(h) => h,
                None => {
                    debug!("degenerate homography at {}, skipping packet", timestamp);
                    stats.skipped_events += packet.len();
                    cursor = end;
                    continue;
                }
            };

            let first = self.locations.len();
            for event in packet {
                if !self.event_camera.contains(event.x as f64, event.y as f64) {
                    stats.dropped_events += 1;
                    continue;
                }
                let p = self.rectified_points[event.y as usize * width + event.x as usize];
                let warped = h_z0_px * Vector3::new(p.x, p.y, 1.0);
                let location = Point2::new(warped.x / warped.z, warped.y / warped.z);
                if location.x.is_finite() && location.y.is_finite() {
                    self.locations
                        .push(Point2::new(location.x as f32, location.y as f32));
                } else {
                    stats.dropped_events += 1;
                }
            }
            stats.events_processed += self.locations.len() - first;
            stats.batches += 1;
            self.packets.push(WarpedPacket {
                center: t_ev_rv.source_center(),
                locations: first..self.locations.len(),
            });
            cursor = end;
        }
        stats
    }

    /// Transfers the warped events from the nearest plane to every plane and votes.
    fn fill_voxel_grid(&mut self) {
        let depths = self.depth_vector.depths();
        let z0 = depths[0];
        let camera = self.virtual_camera;
        let locations = &self.locations;
        let packets = &self.packets;
        let vote = |mut plane: ZSliceMut<'_>| {
            let zi = depths[plane.z()];
            vote_plane(&mut plane, zi, z0, &camera, locations, packets)
        };

        #[cfg(feature = "rayon")]
        if locations.len() >= self.settings.parallel_threshold {
            self.grid.par_planes_mut().for_each(vote);
            return;
        }
        self.grid.planes_mut().for_each(vote);
    }

    pub fn grid(&self) -> &VoxelGrid3D {
        &self.grid
    }

    pub fn virtual_camera(&self) -> &PinholeCamera {
        &self.virtual_camera
    }

    pub fn event_camera(&self) -> &EventCamera {
        &self.event_camera
    }

    pub fn depth_vector(&self) -> &DepthVector {
        &self.depth_vector
    }

    /// The shape with `dim_x` and `dim_y` resolved against the event camera.
    pub fn shape(&self) -> &DsiShape {
        &self.shape
    }

    pub fn packet_size(&self) -> usize {
        self.settings.packet_size
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    /// Extracts a semi-dense depth map from the current votes.
    pub fn extract_depth_map(
        &self,
        options: &DepthMapOptions,
    ) -> Result<DepthMap, ExtractionError> {
        Ok(DepthExtractor::new(*options)?.extract(&self.grid, &self.depth_vector))
    }

    /// Converts a depth map of this mapper into a filtered point cloud in the reference view.
    pub fn point_cloud(
        &self,
        depth_map: &DepthMap,
        options: &PointCloudOptions,
    ) -> Vec<CloudPoint> {
        point_cloud(depth_map, &self.virtual_camera, options)
    }
}

/// The homography that maps reference view pixels on the plane `Z = z0` into event camera
/// pixels, inverted so that it maps event pixels into the reference view.
///
/// `t_ev_rv` maps reference view points into the event camera.
fn plane_homography(
    t_ev_rv: CameraToCamera,
    z0: f64,
    k_ev: &Matrix3<f64>,
    k_virtual_inv: &Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let mut h_z0_inv = t_ev_rv.rotation_matrix() * z0;
    let mut third = h_z0_inv.column_mut(2);
    third += t_ev_rv.translation_vector();
    let h_px_inv = k_ev * h_z0_inv * k_virtual_inv;
    h_px_inv
        .try_inverse()
        .filter(|h| h.iter().all(|v| v.is_finite()))
}

/// Votes every warped event of every packet into one depth plane.
fn vote_plane(
    plane: &mut ZSliceMut<'_>,
    zi: f64,
    z0: f64,
    camera: &PinholeCamera,
    locations: &[Point2<f32>],
    packets: &[WarpedPacket],
) {
    for packet in packets {
        let c = packet.center;
        let d = zi * (z0 - c.z);
        if d.abs() < DEGENERATE_DENOMINATOR {
            continue;
        }
        let a = (z0 * (zi - c.z) / d) as f32;
        let bx = ((z0 - zi) * (c.x * camera.fx + c.z * camera.cx) / d) as f32;
        let by = ((z0 - zi) * (c.y * camera.fy + c.z * camera.cy) / d) as f32;

        let mut xs = [0f32; SUB_BATCH];
        let mut ys = [0f32; SUB_BATCH];
        for chunk in locations[packet.locations.clone()].chunks(SUB_BATCH) {
            for ((x, y), p) in xs.iter_mut().zip(ys.iter_mut()).zip(chunk) {
                *x = p.x * a + bx;
                *y = p.y * a + by;
            }
            for (&x, &y) in xs.iter().zip(&ys).take(chunk.len()) {
                plane.accumulate_at(x, y);
            }
        }
    }
}
