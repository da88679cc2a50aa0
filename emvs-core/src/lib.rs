//! # EMVS Core
//!
//! This library provides the common types shared by the event-based multi-view stereo crates.
//! Every crate in the workspace that touches events, poses or trajectories depends on this crate.
//! It contains the [`Event`] type produced by event cameras, the pose types used to move points
//! between the world, the event camera and the reference view, and the [`PoseTrajectory`]
//! that turns a sparse set of timestamped control poses into a pose for any instant in between.
//!
//! ## Space sweep
//!
//! An event camera does not produce frames. Every pixel independently reports a brightness change
//! together with a microsecond timestamp. Because the camera is moving, events that were triggered
//! by the same scene edge are seen from many slightly different viewpoints. If the pose of the camera
//! is known for every event, each event can be back-projected as a ray into a volume attached to
//! a reference view. Rays coming from the same edge intersect at the depth of that edge, so counting
//! ray crossings per voxel reveals the structure of the scene.
//!
//! - `O` the optical center of the event camera at two different instants
//! - `r` the reference view that owns the voxel volume
//! - `#` the voxel volume, one slab per depth plane
//! - `e` the scene edge where the rays meet
//!
//! ```text
//!          #########
//!          ####e####
//!          ###/#\###
//!          ##/###\##
//!           /     \
//!          /   r   \
//!         O         O
//! ```
//!
//! The [`PoseTrajectory`] provides the pose for each ray and the [`Pose`] types make sure that the
//! direction of every transformation (camera to world, world to camera, camera to camera) is visible
//! in the type system.

mod camera;
mod event;
mod keypoint;
mod point;
mod pose;
mod so3;
mod trajectory;

pub use camera::*;
pub use event::*;
pub use keypoint::*;
pub use nalgebra;
pub use point::*;
pub use pose::*;
pub use so3::*;
pub use trajectory::*;
