//! Cursor smoothing for raw gaze points.

use crate::config::SmoothingSettings;
use crate::sample::{Point, Sample};

#[derive(Debug, Clone)]
pub struct GazeFilter {
    damping: f64,
    fixation_radius: f64,
    lock_radius: f64,
    last_point: Option<Point>,
}

impl GazeFilter {
    pub fn new(damping: f64, fixation_radius: f64, lock_radius: f64) -> Self {
        Self {
            damping,
            fixation_radius,
            lock_radius,
            last_point: None,
        }
    }

    pub fn from_settings(s: &SmoothingSettings) -> Self {
        Self::new(s.damping, s.fixation_radius, s.lock_radius)
    }

    /// Blend factor applied to the movement since the last output.
    fn multiplier(&self, distance: f64, on_target: bool) -> f64 {
        let d = self.damping;
        if on_target {
            0.5 * (1.0 + d)
        } else if distance > self.fixation_radius {
            0.2 * (1.0 + 4.0 * d)
        } else if distance > self.lock_radius {
            d * (distance / self.fixation_radius).powf(1.0 + d)
        } else {
            0.0
        }
    }

    pub fn apply(&mut self, sample: &Sample) -> Point {
        let Some(last) = self.last_point else {
            self.last_point = Some(sample.position);
            return sample.position;
        };

        let dx = sample.position.x - last.x;
        let dy = sample.position.y - last.y;
        let distance = (dx * dx + dy * dy).sqrt();
        let m = self.multiplier(distance, sample.target.is_some());

        let out = Point::new(last.x + m * dx, last.y + m * dy);
        self.last_point = Some(out);
        out
    }

    pub fn reset(&mut self) {
        self.last_point = None;
    }
}
