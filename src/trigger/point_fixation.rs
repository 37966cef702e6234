//! Dwell-to-select on free screen coordinates.

use log::debug;
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use super::TriggerEngine;
use crate::config::{PointFixationSettings, ms};
use crate::sample::{Point, Sample, TriggerSignal};

#[derive(Debug, Clone, Copy)]
struct Fixation {
    centre: Point,
    start: Instant,
}

#[derive(Debug)]
pub struct PointFixationEngine {
    lock_on_time: Duration,
    lock_on_radius: f64,
    fixation_radius: f64,
    time_to_complete: Duration,
    window: VecDeque<(Instant, Point)>,
    active: Option<Fixation>,
}

impl PointFixationEngine {
    pub fn new(
        lock_on_time: Duration,
        lock_on_radius: f64,
        fixation_radius: f64,
        time_to_complete: Duration,
    ) -> Self {
        Self {
            lock_on_time,
            lock_on_radius,
            fixation_radius,
            time_to_complete,
            window: VecDeque::new(),
            active: None,
        }
    }

    pub fn from_settings(s: &PointFixationSettings) -> Self {
        Self::new(
            ms(s.lock_on_ms),
            s.lock_on_radius,
            s.fixation_radius,
            ms(s.complete_ms),
        )
    }

    #[cfg(test)]
    pub fn fixation_centre(&self) -> Option<Point> {
        self.active.map(|f| f.centre)
    }

    /// Pushes the sample and drops samples older than the lock-on window.
    /// Returns whether the window was fully covered before trimming.
    fn slide(&mut self, now: Instant, position: Point) -> bool {
        self.window.push_back((now, position));
        let Some(cutoff) = now.checked_sub(self.lock_on_time) else {
            return false;
        };
        let spans = self.window.front().is_some_and(|(t, _)| *t <= cutoff);
        while self.window.front().is_some_and(|(t, _)| *t < cutoff) {
            self.window.pop_front();
        }
        spans
    }

    fn window_is_steady(&self) -> bool {
        let n = self.window.len() as f64;
        if n == 0.0 {
            return false;
        }
        let (sx, sy) = self
            .window
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (_, p)| (sx + p.x, sy + p.y));
        let centroid = Point::new(sx / n, sy / n);
        self.window
            .iter()
            .all(|(_, p)| p.distance(centroid) <= self.lock_on_radius)
    }
}

impl TriggerEngine for PointFixationEngine {
    fn on_sample(&mut self, sample: &Sample) -> Vec<TriggerSignal> {
        let now = sample.timestamp;
        let mut out = Vec::new();
        let spans = self.slide(now, sample.position);

        let Some(fix) = self.active else {
            if spans && self.window_is_steady() {
                debug!(
                    "point fixation at ({:.0}, {:.0})",
                    sample.position.x, sample.position.y
                );
                self.active = Some(Fixation {
                    centre: sample.position,
                    start: now,
                });
            }
            return out;
        };

        if sample.position.distance(fix.centre) > self.fixation_radius {
            debug!("point fixation cancelled");
            self.active = None;
            out.push(TriggerSignal::reset());
            return out;
        }

        self.active = Some(Fixation {
            centre: sample.position,
            start: fix.start,
        });
        let progress =
            now.duration_since(fix.start).as_secs_f64() / self.time_to_complete.as_secs_f64();
        if progress >= 1.0 {
            out.push(TriggerSignal::progress(1.0, sample.context()));
            self.active = None;
            self.window.clear();
            out.push(TriggerSignal::reset());
        } else if progress > 0.0 {
            out.push(TriggerSignal::progress(progress, sample.context()));
        }
        out
    }

    fn clear(&mut self) {
        self.window.clear();
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rig {
        engine: PointFixationEngine,
        t0: Instant,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                engine: PointFixationEngine::new(ms(200), 10.0, 30.0, ms(500)),
                t0: Instant::now(),
            }
        }

        fn at(&mut self, t_ms: u64, x: f64, y: f64) -> Vec<TriggerSignal> {
            let s = Sample::new(Point::new(x, y), None, self.t0 + ms(t_ms));
            self.engine.on_sample(&s)
        }
    }

    #[test]
    fn steady_window_locks_on_after_lock_on_time() {
        let mut rig = Rig::new();
        for t in [0, 50, 100, 150] {
            rig.at(t, 100.0, 100.0);
            assert!(rig.engine.fixation_centre().is_none());
        }
        rig.at(200, 102.0, 100.0);
        assert_eq!(rig.engine.fixation_centre(), Some(Point::new(102.0, 100.0)));
    }

    #[test]
    fn scattered_window_never_locks_on() {
        let mut rig = Rig::new();
        for (i, t) in (0..=600).step_by(50).enumerate() {
            let x = if i % 2 == 0 { 100.0 } else { 130.0 };
            rig.at(t, x, 100.0);
        }
        assert!(rig.engine.fixation_centre().is_none());
    }

    #[test]
    fn old_outliers_fall_out_of_the_window() {
        let mut rig = Rig::new();
        rig.at(0, 400.0, 400.0);
        for t in (50..=250).step_by(50) {
            rig.at(t, 100.0, 100.0);
        }
        assert!(rig.engine.fixation_centre().is_some());
    }

    #[test]
    fn leaving_fixation_radius_cancels_with_reset() {
        let mut rig = Rig::new();
        for t in (0..=200).step_by(50) {
            rig.at(t, 100.0, 100.0);
        }
        let p = rig.at(250, 110.0, 100.0);
        assert_eq!(p.len(), 1);
        assert!((p[0].progress.unwrap() - 0.1).abs() < 1e-9);
        // centre follows the latest sample, so 135 is within 30 of 110
        assert_eq!(rig.at(300, 135.0, 100.0).len(), 1);
        assert_eq!(rig.at(350, 170.0, 100.0), vec![TriggerSignal::reset()]);
        assert!(rig.engine.fixation_centre().is_none());
    }

    #[test]
    fn completion_emits_full_progress_then_reset_and_clears_window() {
        let mut rig = Rig::new();
        let mut out = Vec::new();
        for t in (0..=700).step_by(50) {
            out.extend(rig.at(t, 100.0, 100.0));
        }
        let n = out.len();
        assert_eq!(out[n - 2].progress, Some(1.0));
        assert!(out[n - 1].is_reset());
        let ps: Vec<f64> = out[..n - 1].iter().filter_map(|s| s.progress).collect();
        assert!(ps.windows(2).all(|w| w[0] <= w[1]));

        // window was cleared, so no immediate re-lock
        rig.at(750, 100.0, 100.0);
        assert!(rig.engine.fixation_centre().is_none());
    }
}
