//! Plain text datasets.
//!
//! Events are stored one per line as `t x y p`, poses as `t px py pz qx qy qz qw`. Times are in
//! seconds. Blank lines and lines starting with `#` are ignored.

use emvs_core::nalgebra::{Quaternion, UnitQuaternion, Vector3};
use emvs_core::{CameraToWorld, Event, Pose, PoseTrajectory, TrajectoryError};
use log::*;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),
}

fn seconds_to_micros(seconds: f64) -> i64 {
    (seconds * 1e6).round() as i64
}

/// Non-empty, non-comment lines with their 1-based line numbers.
fn data_lines(reader: impl BufRead) -> impl Iterator<Item = Result<(usize, String), DatasetError>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(n, line)| match line {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    None
                } else {
                    Some(Ok((n + 1, trimmed.to_string())))
                }
            }
            Err(e) => Some(Err(e.into())),
        })
}

fn fields<const N: usize>(line: usize, text: &str) -> Result<[f64; N], DatasetError> {
    let values = text
        .split_whitespace()
        .map(|field| field.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DatasetError::Parse {
            line,
            message: e.to_string(),
        })?;
    let count = values.len();
    values.try_into().map_err(|_| DatasetError::Parse {
        line,
        message: format!("expected {} fields, got {}", N, count),
    })
}

fn pixel(line: usize, value: f64) -> Result<u16, DatasetError> {
    if value.fract() != 0.0 || !(0.0..=u16::MAX as f64).contains(&value) {
        return Err(DatasetError::Parse {
            line,
            message: format!("{} is not a pixel coordinate", value),
        });
    }
    Ok(value as u16)
}

/// Reads `t x y p` events. Any non-zero polarity is positive.
pub fn read_events(reader: impl BufRead) -> Result<Vec<Event>, DatasetError> {
    let mut events = vec![];
    for line in data_lines(reader) {
        let (line, text) = line?;
        let [t, x, y, p] = fields::<4>(line, &text)?;
        events.push(Event::new(
            seconds_to_micros(t),
            pixel(line, x)?,
            pixel(line, y)?,
            p != 0.0,
        ));
    }
    if !events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        warn!("events are not sorted by time, sorting them");
        events.sort_by_key(|e| e.timestamp);
    }
    Ok(events)
}

/// Reads `t px py pz qx qy qz qw` camera to world poses.
pub fn read_trajectory(reader: impl BufRead) -> Result<PoseTrajectory, DatasetError> {
    let mut poses = vec![];
    for line in data_lines(reader) {
        let (line, text) = line?;
        let [t, px, py, pz, qx, qy, qz, qw] = fields::<8>(line, &text)?;
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz));
        poses.push((
            seconds_to_micros(t),
            CameraToWorld::from_parts(Vector3::new(px, py, pz), rotation.to_rotation_matrix()),
        ));
    }
    Ok(PoseTrajectory::from_poses(poses)?)
}

pub fn load_events(path: &Path) -> Result<Vec<Event>, DatasetError> {
    let file = std::fs::File::open(path)?;
    read_events(std::io::BufReader::new(file))
}

pub fn load_trajectory(path: &Path) -> Result<PoseTrajectory, DatasetError> {
    let file = std::fs::File::open(path)?;
    read_trajectory(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn events_skip_comments() {
        let text = "# t x y p\n\n0.000001 3 4 1\n0.5 10 2 0\n";
        let events = read_events(text.as_bytes()).unwrap();
        assert_eq!(events, vec![Event::new(1, 3, 4, true), Event::new(500_000, 10, 2, false)]);
    }

    #[test]
    fn malformed_event_reports_line() {
        let text = "0.1 1 2 1\n0.2 1 2\n";
        match read_events(text.as_bytes()) {
            Err(DatasetError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(read_events("0.1 -1 2 1\n".as_bytes()).is_err());
    }

    #[test]
    fn trajectory_interpolates_between_lines() {
        let text = "0.0 0 0 0 0 0 0 1\n1.0 2 0 0 0 0 0 1\n";
        let trajectory = read_trajectory(text.as_bytes()).unwrap();
        assert_eq!(trajectory.len(), 2);
        let pose = trajectory.pose_at(250_000).unwrap();
        assert_relative_eq!(pose.translation_vector().x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn single_pose_is_not_a_trajectory() {
        let text = "0.0 0 0 0 0 0 0 1\n";
        assert!(matches!(
            read_trajectory(text.as_bytes()),
            Err(DatasetError::Trajectory(TrajectoryError::NotEnoughPoses(1)))
        ));
    }
}
