use emvs_core::nalgebra::{Rotation3, Vector3};
use emvs_core::{CameraToWorld, Event, Pose, PoseTrajectory};
use emvs_mapper::{
    write_ply, DepthMapOptions, DepthSpacing, DsiMapper, DsiShape, MapperError, MapperSettings,
    PointCloudOptions,
};
use emvs_pinhole::EventCamera;

const WIDTH: u16 = 96;
const HEIGHT: u16 = 72;
const SCENE_DEPTH: f64 = 2.0;
/// Time between two views in microseconds.
const VIEW_INTERVAL: i64 = 1_000;

/// Camera translations in units of 2cm, on a disk of radius 5 around the reference view.
///
/// The list is symmetric, so the middle view is the origin.
fn view_offsets() -> Vec<(i32, i32)> {
    (-5..=5)
        .flat_map(|i| (-5..=5).map(move |j| (i, j)))
        .filter(|(i, j)| i * i + j * j <= 25)
        .collect()
}

/// Pixels of the reference view that see a scene point, 8 pixels apart.
fn scene_pixels() -> Vec<(u16, u16)> {
    (0..10)
        .flat_map(|a| (0..7).map(move |b| (12 + 8 * a, 12 + 8 * b)))
        .collect()
}

fn camera() -> EventCamera {
    EventCamera::from_parameters(&[100.0, 100.0, 48.0, 36.0, WIDTH as f32, HEIGHT as f32]).unwrap()
}

fn shape() -> DsiShape {
    // Planes every 5cm with one plane exactly at the scene depth.
    DsiShape::new(0, 0, 41, 1.0, 3.0, 0.0)
}

fn settings() -> MapperSettings {
    MapperSettings {
        packet_size: scene_pixels().len(),
        depth_spacing: DepthSpacing::Linear,
        ..Default::default()
    }
}

/// A camera translating parallel to a plane of points at `SCENE_DEPTH`.
///
/// A translation of 2cm moves the points by exactly one pixel, so every event lands on the
/// pixel grid. Each view fires one event per point, all with the timestamp of its pose.
fn translating_camera() -> (Vec<Event>, PoseTrajectory) {
    let offsets = view_offsets();
    let pixels = scene_pixels();
    let mut events = vec![];
    let mut poses = vec![];
    for (n, &(i, j)) in offsets.iter().enumerate() {
        let timestamp = n as i64 * VIEW_INTERVAL;
        let translation = Vector3::new(0.02 * i as f64, 0.02 * j as f64, 0.0);
        poses.push((
            timestamp,
            CameraToWorld::from_parts(translation, Rotation3::identity()),
        ));
        for &(u, v) in &pixels {
            let x = (u as i32 - i) as u16;
            let y = (v as i32 - j) as u16;
            events.push(Event::new(timestamp, x, y, (u + v) % 2 == 0));
        }
    }
    (events, PoseTrajectory::from_poses(poses).unwrap())
}

#[test]
fn translating_camera_recovers_plane() {
    let _ = pretty_env_logger::try_init_timed();
    let (events, trajectory) = translating_camera();
    let t_rv_w = trajectory.midpoint_pose().inverse();
    assert_eq!(trajectory.midpoint_pose(), CameraToWorld::identity());

    let mut mapper = DsiMapper::new(camera(), shape(), settings()).unwrap();
    let stats = mapper.evaluate(&events, &trajectory, t_rv_w).unwrap();
    assert_eq!(stats.batches, view_offsets().len());
    assert_eq!(stats.events_processed, events.len());
    assert_eq!(stats.skipped_events, 0);
    assert_eq!(stats.dropped_events, 0);

    let depth_map = mapper
        .extract_depth_map(&DepthMapOptions::default())
        .unwrap();
    let step = mapper.depth_vector().depths()[1] - mapper.depth_vector().depths()[0];

    // Every scene point is found at its depth.
    for (u, v) in scene_pixels() {
        let depth = depth_map
            .depth_at(u as u32, v as u32)
            .unwrap_or_else(|| panic!("pixel ({}, {}) is not valid", u, v));
        assert!((depth as f64 - SCENE_DEPTH).abs() <= step + 1e-6);
        let votes = depth_map.confidence_at(u as u32, v as u32).unwrap();
        assert!((votes - view_offsets().len() as f32).abs() < 1e-2);
    }
    assert!(depth_map.valid_count() >= scene_pixels().len());

    let valid_depths: Vec<f32> = (0..depth_map.height())
        .flat_map(|y| (0..depth_map.width()).map(move |x| (x, y)))
        .filter_map(|(x, y)| depth_map.depth_at(x, y))
        .collect();
    let close = valid_depths
        .iter()
        .filter(|&&d| (d as f64 - SCENE_DEPTH).abs() <= step + 1e-6)
        .count();
    assert!(close * 10 >= valid_depths.len() * 9);
}

#[test]
fn point_cloud_lies_on_the_plane() {
    let _ = pretty_env_logger::try_init_timed();
    let (events, trajectory) = translating_camera();
    let mut mapper = DsiMapper::new(camera(), shape(), settings()).unwrap();
    mapper
        .evaluate(&events, &trajectory, trajectory.midpoint_pose().inverse())
        .unwrap();
    let depth_map = mapper
        .extract_depth_map(&DepthMapOptions::default())
        .unwrap();

    // Neighbouring scene points are 16cm apart.
    let options = PointCloudOptions {
        radius_search: 0.2,
        min_num_neighbors: 2,
    };
    let cloud = mapper.point_cloud(&depth_map, &options);
    assert!(cloud.len() >= scene_pixels().len());
    let on_plane = cloud
        .iter()
        .filter(|p| (p.position.z - SCENE_DEPTH).abs() <= 0.05 + 1e-6)
        .count();
    assert!(on_plane * 10 >= cloud.len() * 9);
    for p in &cloud {
        assert!((p.intensity - p.position.z.recip()).abs() < 1e-12);
    }

    let mut ply = Vec::new();
    write_ply(&mut ply, &cloud).unwrap();
    let text = String::from_utf8(ply).unwrap();
    assert!(text.contains(&format!("element vertex {}", cloud.len())));
}

#[test]
fn too_few_events_leave_an_empty_grid() {
    let (events, trajectory) = translating_camera();
    let t_rv_w = trajectory.midpoint_pose().inverse();
    let mut mapper = DsiMapper::new(camera(), shape(), settings()).unwrap();
    mapper.evaluate(&events, &trajectory, t_rv_w).unwrap();
    assert!(mapper.grid().total() > 0.0);

    let packet_size = mapper.packet_size();
    let result = mapper.evaluate(&events[..packet_size - 1], &trajectory, t_rv_w);
    assert_eq!(
        result.unwrap_err(),
        MapperError::InsufficientEvents {
            events: packet_size - 1,
            packet_size,
        }
    );
    assert_eq!(mapper.grid().total(), 0.0);
}

#[test]
fn evaluation_starts_from_an_empty_grid() {
    let (events, trajectory) = translating_camera();
    let t_rv_w = trajectory.midpoint_pose().inverse();
    let half = &events[..events.len() / 2];

    let mut reused = DsiMapper::new(camera(), shape(), settings()).unwrap();
    reused.evaluate(&events, &trajectory, t_rv_w).unwrap();
    reused.evaluate(half, &trajectory, t_rv_w).unwrap();

    let mut fresh = DsiMapper::new(camera(), shape(), settings()).unwrap();
    fresh.evaluate(half, &trajectory, t_rv_w).unwrap();

    assert_eq!(reused.grid(), fresh.grid());
}

#[test]
fn events_before_the_trajectory_are_skipped() {
    let (events, _) = translating_camera();
    let late = PoseTrajectory::from_poses(vec![
        (10_000_000, CameraToWorld::identity()),
        (20_000_000, CameraToWorld::identity()),
    ])
    .unwrap();

    let mut mapper = DsiMapper::new(camera(), shape(), settings()).unwrap();
    let stats = mapper
        .evaluate(&events, &late, late.midpoint_pose().inverse())
        .unwrap();
    assert_eq!(stats.batches, 0);
    assert_eq!(stats.events_processed, 0);
    assert_eq!(stats.skipped_events, events.len());
    assert_eq!(mapper.grid().total(), 0.0);

    let depth_map = mapper
        .extract_depth_map(&DepthMapOptions::default())
        .unwrap();
    assert_eq!(depth_map.valid_count(), 0);
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_voting_matches_serial_voting() {
    let (events, trajectory) = translating_camera();
    let t_rv_w = trajectory.midpoint_pose().inverse();

    let mut serial = DsiMapper::new(
        camera(),
        shape(),
        MapperSettings {
            parallel_threshold: usize::MAX,
            ..settings()
        },
    )
    .unwrap();
    let mut parallel = DsiMapper::new(
        camera(),
        shape(),
        MapperSettings {
            parallel_threshold: 0,
            ..settings()
        },
    )
    .unwrap();
    serial.evaluate(&events, &trajectory, t_rv_w).unwrap();
    parallel.evaluate(&events, &trajectory, t_rv_w).unwrap();
    assert_eq!(serial.grid(), parallel.grid());
}
