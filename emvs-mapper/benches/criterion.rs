use criterion::{criterion_group, criterion_main, Criterion};
use emvs_core::nalgebra::{Rotation3, Vector3};
use emvs_core::{CameraToWorld, Event, Pose, PoseTrajectory};
use emvs_mapper::{DepthMapOptions, DsiMapper, DsiShape, MapperSettings};
use emvs_pinhole::EventCamera;

const WIDTH: u32 = 240;
const HEIGHT: u32 = 180;

/// A camera sliding sideways in front of a textured plane at 2m.
fn sliding_camera(views: usize) -> (Vec<Event>, PoseTrajectory) {
    let mut events = vec![];
    let mut poses = vec![];
    for n in 0..views {
        let timestamp = n as i64 * 1_000;
        let shift = n as i64 - views as i64 / 2;
        poses.push((
            timestamp,
            CameraToWorld::from_parts(
                Vector3::new(0.02 * shift as f64, 0.0, 0.0),
                Rotation3::identity(),
            ),
        ));
        for y in (10..HEIGHT - 10).step_by(6) {
            for x in (20..WIDTH - 20).step_by(5) {
                let x = (x as i64 - shift) as u16;
                events.push(Event::new(timestamp, x, y as u16, true));
            }
        }
    }
    (events, PoseTrajectory::from_poses(poses).unwrap())
}

fn camera() -> EventCamera {
    EventCamera::from_parameters(&[200.0, 200.0, 120.0, 90.0, WIDTH as f32, HEIGHT as f32])
        .unwrap()
}

fn evaluate(c: &mut Criterion) {
    let (events, trajectory) = sliding_camera(20);
    let t_rv_w = trajectory.midpoint_pose().inverse();
    let mut mapper =
        DsiMapper::new(camera(), DsiShape::default(), MapperSettings::default()).unwrap();
    c.bench_function("evaluate", |b| {
        b.iter(|| mapper.evaluate(&events, &trajectory, t_rv_w).unwrap())
    });

    let mut serial = DsiMapper::new(
        camera(),
        DsiShape::default(),
        MapperSettings {
            parallel_threshold: usize::MAX,
            ..Default::default()
        },
    )
    .unwrap();
    c.bench_function("evaluate_serial", |b| {
        b.iter(|| serial.evaluate(&events, &trajectory, t_rv_w).unwrap())
    });
}

fn extract(c: &mut Criterion) {
    let (events, trajectory) = sliding_camera(20);
    let mut mapper =
        DsiMapper::new(camera(), DsiShape::default(), MapperSettings::default()).unwrap();
    mapper
        .evaluate(&events, &trajectory, trajectory.midpoint_pose().inverse())
        .unwrap();
    let options = DepthMapOptions::default();
    c.bench_function("extract_depth_map", |b| {
        b.iter(|| mapper.extract_depth_map(&options).unwrap())
    });
}

criterion_group!(
    name = mapper;
    config = Criterion::default().sample_size(10);
    targets = evaluate, extract
);

fn bench_adaptive_threshold(c: &mut Criterion) {
    let image = image::GrayImage::from_fn(WIDTH, HEIGHT, |x, y| {
        image::Luma([((x * 7 + y * 13) % 251) as u8])
    });
    c.bench_function("adaptive_threshold", |b| {
        b.iter(|| emvs_mapper::filter::adaptive_threshold(&image, 5, 5.0))
    });
}

criterion_group!(
    name = mapper_filter;
    config = Criterion::default().sample_size(10);
    targets = bench_adaptive_threshold
);

criterion_main!(mapper, mapper_filter);
