use crate::ImagePoint;
use core::fmt;
use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A single brightness change reported by an event camera.
///
/// `x` is the pixel column and `y` the pixel row. The timestamp is in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Event {
    pub timestamp: i64,
    pub x: u16,
    pub y: u16,
    pub polarity: bool,
}

impl Event {
    pub fn new(timestamp: i64, x: u16, y: u16, polarity: bool) -> Self {
        Self {
            timestamp,
            x,
            y,
            polarity,
        }
    }
}

impl ImagePoint for Event {
    fn image_point(&self) -> Point2<f64> {
        Point2::new(self.x as f64, self.y as f64)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.timestamp, self.x, self.y, self.polarity as u8
        )
    }
}

/// Returns the events with `t_start <= timestamp < t_end`.
///
/// The slice must be sorted by timestamp. Both bounds are found by binary search.
pub fn window_by_time(events: &[Event], t_start: i64, t_end: i64) -> &[Event] {
    if t_end <= t_start {
        return &events[0..0];
    }
    let begin = events.partition_point(|e| e.timestamp < t_start);
    let end = events.partition_point(|e| e.timestamp < t_end);
    &events[begin..end.max(begin)]
}

/// Returns at most `count` events starting at index `start`.
pub fn window_by_count(events: &[Event], start: usize, count: usize) -> &[Event] {
    let begin = start.min(events.len());
    let end = begin.saturating_add(count).min(events.len());
    &events[begin..end]
}
