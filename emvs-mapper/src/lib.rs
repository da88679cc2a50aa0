//! # EMVS Mapper
//!
//! Event-based multi-view stereo: semi-dense 3d reconstruction from the events of a moving event camera
//! whose trajectory is known.
//!
//! The [`DsiMapper`] back-projects events into a disparity space image, a [`VoxelGrid3D`] attached to a
//! virtual reference view. Scene edges show up as voxels where many rays cross. The [`DepthExtractor`]
//! picks the strongest plane along every pixel ray, keeps the pixels that stand out from their
//! neighbourhood and cleans them up with a median filter. The resulting [`DepthMap`] can be turned into
//! a filtered point cloud and written as PLY.
//!
//! ```no_run
//! use emvs_core::{Event, PoseTrajectory, Pose};
//! use emvs_mapper::{DepthMapOptions, DsiMapper, DsiShape, MapperSettings, PointCloudOptions};
//! use emvs_pinhole::EventCamera;
//! # fn load() -> (Vec<Event>, PoseTrajectory) { unimplemented!() }
//! let (events, trajectory) = load();
//! let camera = EventCamera::from_parameters(&[335.4, 335.3, 129.9, 99.2, 240.0, 180.0]).unwrap();
//! let mut mapper = DsiMapper::new(camera, DsiShape::default(), MapperSettings::default()).unwrap();
//! let t_rv_w = trajectory.midpoint_pose().inverse();
//! mapper.evaluate(&events, &trajectory, t_rv_w).unwrap();
//! let depth_map = mapper.extract_depth_map(&DepthMapOptions::default()).unwrap();
//! let cloud = mapper.point_cloud(&depth_map, &PointCloudOptions::default());
//! emvs_mapper::write_ply(std::fs::File::create("cloud.ply").unwrap(), &cloud).unwrap();
//! ```

mod depth_map;
mod depth_vector;
mod export;
pub mod filter;
mod mapper;
mod point_cloud;
mod settings;
mod voxel_grid;

pub use depth_map::*;
pub use depth_vector::*;
pub use export::*;
pub use mapper::*;
pub use point_cloud::*;
pub use settings::*;
pub use voxel_grid::*;

use image::{ImageBuffer, Luma};

/// Single channel `f32` image used for confidence and depth.
pub type GrayFloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Single channel image holding the index of a depth plane per pixel.
pub type PlaneIndexImage = ImageBuffer<Luma<u16>, Vec<u16>>;
