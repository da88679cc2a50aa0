mod dataset;
mod output;

use emvs_core::{window_by_time, Pose};
use emvs_mapper::{
    transform_cloud, DepthMapOptions, DsiMapper, DsiShape, MapperSettings, PointCloudOptions,
};
use emvs_pinhole::{EventCamera, RadialTangential};
use log::*;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use structopt::StructOpt;

/// Everything that can be tuned from the settings file.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
struct SandboxSettings {
    shape: DsiShape,
    mapper: MapperSettings,
    depth_map: DepthMapOptions,
    point_cloud: PointCloudOptions,
}

#[derive(StructOpt, Clone)]
#[structopt(
    name = "emvs-sandbox",
    about = "Semi-dense mapping from the events of a moving event camera"
)]
struct Opt {
    /// Event file with one `t x y p` event per line, times in seconds.
    #[structopt(parse(from_os_str))]
    events: PathBuf,
    /// Trajectory file with one `t px py pz qx qy qz qw` pose per line, times in seconds.
    #[structopt(parse(from_os_str))]
    poses: PathBuf,
    /// The file where settings are specified.
    ///
    /// This is in the format of a JSON object with `shape`, `mapper`, `depth_map` and
    /// `point_cloud` entries. Missing entries take their default values.
    #[structopt(short, long, default_value = "emvs-settings.json")]
    settings: PathBuf,
    /// Directory where the depth map images and the point cloud are written.
    #[structopt(short, long, default_value = "emvs-output")]
    output: PathBuf,
    /// Write the point cloud in the world frame instead of the reference view.
    #[structopt(long)]
    world_frame: bool,
    /// Only use events after this time (seconds).
    #[structopt(long)]
    start: Option<f64>,
    /// Only use events before this time (seconds).
    #[structopt(long)]
    end: Option<f64>,
    /// The x focal length
    #[structopt(long, default_value = "199.0923")]
    x_focal: f32,
    /// The y focal length
    #[structopt(long, default_value = "198.8288")]
    y_focal: f32,
    /// The x optical center coordinate
    #[structopt(long, default_value = "132.1920")]
    x_center: f32,
    /// The y optical center coordinate
    #[structopt(long, default_value = "110.7126")]
    y_center: f32,
    /// Sensor width in pixels
    ///
    /// Default values are for a DAVIS240C.
    #[structopt(long, default_value = "240")]
    width: u32,
    /// Sensor height in pixels
    #[structopt(long, default_value = "180")]
    height: u32,
    /// The first radial distortion coefficient
    #[structopt(long, default_value = "-0.3684", allow_hyphen_values = true)]
    k1: f64,
    /// The second radial distortion coefficient
    #[structopt(long, default_value = "0.1509", allow_hyphen_values = true)]
    k2: f64,
    /// The third radial distortion coefficient
    #[structopt(long, default_value = "0.0", allow_hyphen_values = true)]
    k3: f64,
    /// The first tangential distortion coefficient
    #[structopt(long, default_value = "-0.0002", allow_hyphen_values = true)]
    p1: f64,
    /// The second tangential distortion coefficient
    #[structopt(long, default_value = "-0.0003", allow_hyphen_values = true)]
    p2: f64,
}

impl Opt {
    fn event_camera(&self) -> Result<EventCamera, Box<dyn Error>> {
        let camera = EventCamera::from_parameters(&[
            self.x_focal,
            self.y_focal,
            self.x_center,
            self.y_center,
            self.width as f32,
            self.height as f32,
        ])?;
        let distortion =
            RadialTangential::from_coefficients([self.k1, self.k2, self.p1, self.p2, self.k3]);
        Ok(camera.with_distortion(distortion))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();

    let settings = std::fs::File::open(&opt.settings)
        .ok()
        .and_then(|file| serde_json::from_reader(std::io::BufReader::new(file)).ok());
    if settings.is_some() {
        info!("loaded existing settings");
    } else {
        info!("used default settings");
    }
    let settings: SandboxSettings = settings.unwrap_or_default();
    debug!("settings: {}", serde_json::to_string(&settings)?);

    let camera = opt.event_camera()?;

    info!("loading events from {}", opt.events.display());
    let events = dataset::load_events(&opt.events)?;
    info!("loading trajectory from {}", opt.poses.display());
    let trajectory = dataset::load_trajectory(&opt.poses)?;
    let (first, _) = trajectory.first_control_pose();
    let (last, _) = trajectory.last_control_pose();
    info!(
        "loaded {} events and {} poses spanning {} to {} us",
        events.len(),
        trajectory.len(),
        first,
        last
    );

    let to_micros = |seconds: f64| (seconds * 1e6).round() as i64;
    let events = window_by_time(
        &events,
        opt.start.map(to_micros).unwrap_or(i64::MIN),
        opt.end.map(to_micros).unwrap_or(i64::MAX),
    );
    info!("using {} events", events.len());

    let mut mapper = DsiMapper::new(camera, settings.shape, settings.mapper)?;
    let t_w_rv = trajectory.midpoint_pose();
    let t_rv_w = t_w_rv.inverse();
    let stats = mapper.evaluate(events, &trajectory, t_rv_w)?;
    info!(
        "{} events voted in {} packets ({} skipped) in {:?}",
        stats.events_processed, stats.batches, stats.skipped_events, stats.elapsed
    );

    let depth_map = mapper.extract_depth_map(&settings.depth_map)?;
    info!("{} pixels have a depth", depth_map.valid_count());
    let depths = mapper.depth_vector();
    output::save_depth_map(
        &opt.output,
        &depth_map,
        depths.min_depth() as f32,
        depths.max_depth() as f32,
    )?;

    let mut cloud = mapper.point_cloud(&depth_map, &settings.point_cloud);
    if opt.world_frame {
        cloud = transform_cloud(&cloud, t_w_rv);
    }
    output::save_point_cloud(&opt.output.join("pointcloud.ply"), &cloud)?;
    Ok(())
}
