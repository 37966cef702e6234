//! Multi-step eye gestures: definitions, loading, and the matcher.

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Deserializer};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::sample::{Point, PointAndTarget, Sample, TargetId, TriggerSignal};
use crate::trigger::TriggerEngine;

fn de_millis<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(de).map(Duration::from_millis)
}

fn de_opt_millis<'de, D: Deserializer<'de>>(
    de: D,
) -> std::result::Result<Option<Duration>, D::Error> {
    Option::<u64>::deserialize(de).map(|v| v.map(Duration::from_millis))
}

/// What a step waits for. Percentages are of the screen size.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Fixation {
        radius: f64,
        #[serde(rename = "dwell_ms", deserialize_with = "de_millis")]
        dwell_time: Duration,
    },
    LookInDirection {
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    LookAtArea {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        #[serde(default)]
        round: bool,
        #[serde(rename = "dwell_ms", deserialize_with = "de_millis")]
        dwell_time: Duration,
    },
    DefaultRadialDwell {
        radius: f64,
        #[serde(rename = "dwell_ms", deserialize_with = "de_millis")]
        dwell_time: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GestureStep {
    #[serde(flatten)]
    pub kind: StepKind,
    /// Ignored on the first step.
    #[serde(default, rename = "time_limit_ms", deserialize_with = "de_opt_millis")]
    pub time_limit: Option<Duration>,
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureRuntime {
    pub step_index: usize,
    /// When the current step began, or when the gesture completed.
    pub timestamp: Option<Instant>,
    pub fixation_point: Option<Point>,
    pub point_stamp: Option<Point>,
    pub dwell_start: Option<Instant>,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Gesture {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, rename = "cooldown_ms", deserialize_with = "de_millis")]
    pub cooldown: Duration,
    #[serde(rename = "step")]
    pub steps: Vec<GestureStep>,
    #[serde(skip)]
    pub runtime: GestureRuntime,
}

/// Per-tick view of the pointer shared by every gesture.
#[derive(Debug, Clone, Copy)]
struct Motion {
    now: Instant,
    position: Point,
    move_delta: f64,
    width: f64,
    height: f64,
}

fn direction_passes(pct: f64, d: f64, extent: f64) -> Option<bool> {
    if pct == 0.0 {
        return None;
    }
    let threshold = pct / 100.0 * extent;
    Some(if threshold > 0.0 {
        d >= threshold
    } else {
        d <= threshold
    })
}

impl StepKind {
    fn inside_area(&self, m: &Motion) -> bool {
        let StepKind::LookAtArea {
            left,
            top,
            width,
            height,
            round,
            ..
        } = *self
        else {
            return false;
        };
        let l = left / 100.0 * m.width;
        let t = top / 100.0 * m.height;
        let w = width / 100.0 * m.width;
        let h = height / 100.0 * m.height;
        let p = m.position;
        if round {
            let nx = (p.x - (l + w / 2.0)) / (w / 2.0);
            let ny = (p.y - (t + h / 2.0)) / (h / 2.0);
            nx * nx + ny * ny <= 1.0
        } else {
            p.x >= l && p.x <= l + w && p.y >= t && p.y <= t + h
        }
    }
}

impl Gesture {
    pub fn is_complete(&self) -> bool {
        self.runtime.step_index >= self.steps.len()
    }

    /// Starts a fresh trial at step 0 from the current sample.
    fn restart(&mut self, m: &Motion) {
        self.runtime = GestureRuntime {
            step_index: 0,
            timestamp: Some(m.now),
            fixation_point: None,
            point_stamp: Some(m.position),
            dwell_start: None,
        };
    }

    fn since(&self, m: &Motion) -> Duration {
        self.runtime
            .timestamp
            .map(|t| m.now.saturating_duration_since(t))
            .unwrap_or_default()
    }

    fn radial_centre(&self) -> Option<Point> {
        self.runtime.fixation_point.or(self.runtime.point_stamp)
    }

    /// Whether the sample alone satisfies the step's spatial condition.
    fn holds(&self, index: usize, m: &Motion) -> bool {
        let kind = &self.steps[index].kind;
        match kind {
            StepKind::Fixation { radius, .. } => m.move_delta <= *radius,
            StepKind::LookInDirection { .. } => false,
            StepKind::LookAtArea { .. } => kind.inside_area(m),
            StepKind::DefaultRadialDwell { radius, .. } => self
                .radial_centre()
                .is_some_and(|c| c.distance(m.position) <= radius / 100.0 * m.height),
        }
    }

    /// Runs the dwell clock for a step whose condition is `inside`.
    fn dwell(&mut self, inside: bool, dwell_time: Duration, now: Instant) -> bool {
        if !inside {
            self.runtime.dwell_start = None;
            return false;
        }
        let start = *self.runtime.dwell_start.get_or_insert(now);
        now.saturating_duration_since(start) >= dwell_time
    }

    fn step_satisfied(&mut self, m: &Motion) -> bool {
        let index = self.runtime.step_index;
        let kind = self.steps[index].kind.clone();
        match kind {
            StepKind::Fixation { radius, dwell_time } => {
                if m.move_delta > radius || self.runtime.dwell_start.is_none() {
                    self.runtime.dwell_start = Some(m.now);
                }
                self.dwell(true, dwell_time, m.now)
            }
            StepKind::LookInDirection { dx, dy } => {
                let reference = self.runtime.point_stamp.unwrap_or(m.position);
                let checks = [
                    direction_passes(dx, m.position.x - reference.x, m.width),
                    direction_passes(dy, m.position.y - reference.y, m.height),
                ];
                let mut applied = checks.iter().flatten().peekable();
                applied.peek().is_some() && applied.all(|ok| *ok)
            }
            StepKind::LookAtArea { dwell_time, .. } => {
                let inside = kind.inside_area(m);
                self.dwell(inside, dwell_time, m.now)
            }
            StepKind::DefaultRadialDwell { dwell_time, .. } => {
                let inside = self.holds(index, m);
                self.dwell(inside, dwell_time, m.now)
            }
        }
    }

    fn complete_step(&mut self, m: &Motion, out: &mut Vec<TriggerSignal>) {
        let step = &self.steps[self.runtime.step_index];
        let commands = step.commands.clone();
        if !matches!(step.kind, StepKind::LookInDirection { .. }) {
            self.runtime.fixation_point = Some(m.position);
        }
        self.runtime.step_index += 1;
        self.runtime.timestamp = Some(m.now);
        self.runtime.point_stamp = Some(m.position);
        self.runtime.dwell_start = None;

        let done = self.is_complete();
        if done {
            info!("gesture '{}' completed", self.name);
        } else {
            debug!("gesture '{}' step {} done", self.name, self.runtime.step_index);
        }
        if done || !commands.is_empty() {
            let target = (!commands.is_empty()).then(|| TargetId::Commands(commands));
            out.push(TriggerSignal::completed(PointAndTarget {
                point: m.position,
                target,
            }));
            out.push(TriggerSignal::reset());
        }
    }

    fn advance(&mut self, m: &Motion, out: &mut Vec<TriggerSignal>) {
        if self.runtime.timestamp.is_none() {
            self.restart(m);
        }

        if self.is_complete() {
            if self.since(m) >= self.cooldown {
                self.restart(m);
            }
            return;
        }

        if self.runtime.step_index == 1 && self.steps.len() > 1 && self.holds(0, m) {
            self.runtime.timestamp = Some(m.now);
        }

        let index = self.runtime.step_index;
        if index > 0 {
            if let Some(limit) = self.steps[index].time_limit {
                if self.since(m) > limit {
                    debug!("gesture '{}' timed out at step {index}", self.name);
                    self.restart(m);
                }
            }
        }

        if self.step_satisfied(m) {
            self.complete_step(m, out);
        }
    }
}

#[derive(Debug, Deserialize)]
struct GestureFile {
    #[serde(default, rename = "gesture")]
    gestures: Vec<Gesture>,
}

pub fn parse_gestures(txt: &str) -> Result<Vec<Gesture>> {
    let file: GestureFile = toml::from_str(txt)?;
    for g in &file.gestures {
        validate_gesture(g)?;
    }
    Ok(file.gestures)
}

fn validate_gesture(g: &Gesture) -> Result<()> {
    if g.name.trim().is_empty() {
        return Err(anyhow!("gesture with empty name"));
    }
    if g.steps.is_empty() {
        return Err(anyhow!("gesture '{}' has no steps", g.name));
    }
    for (i, step) in g.steps.iter().enumerate() {
        let ok = match step.kind {
            StepKind::Fixation { radius, .. } | StepKind::DefaultRadialDwell { radius, .. } => {
                radius > 0.0
            }
            StepKind::LookInDirection { dx, dy } => dx != 0.0 || dy != 0.0,
            StepKind::LookAtArea { width, height, .. } => width > 0.0 && height > 0.0,
        };
        if !ok {
            return Err(anyhow!("gesture '{}' step {i} is degenerate", g.name));
        }
    }
    Ok(())
}

/// Where the engine gets its gesture list from.
pub trait GestureProvider: fmt::Debug + Send {
    fn load(&self) -> Result<Vec<Gesture>>;
}

#[derive(Debug, Clone)]
pub struct FileGestures {
    path: PathBuf,
}

impl FileGestures {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GestureProvider for FileGestures {
    fn load(&self) -> Result<Vec<Gesture>> {
        let txt = fs::read_to_string(&self.path)
            .map_err(|e| anyhow!("failed to read {}: {e}", self.path.display()))?;
        parse_gestures(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", self.path.display()))
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticGestures(pub Vec<Gesture>);

#[cfg(test)]
impl GestureProvider for StaticGestures {
    fn load(&self) -> Result<Vec<Gesture>> {
        Ok(self.0.clone())
    }
}

/// Raises `updated` whenever the file at `path` changes on disk.
pub fn watch_file(path: &Path, updated: Arc<AtomicBool>) -> Result<RecommendedWatcher> {
    let name = path.file_name().map(|n| n.to_os_string());
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(ev) => {
                let ours = ev
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == name);
                if ours && (ev.kind.is_modify() || ev.kind.is_create()) {
                    updated.store(true, Ordering::Release);
                }
            }
            Err(e) => warn!("gesture watcher error: {e}"),
        }
    })?;
    // editors replace files, so watch the directory
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!("watching {} for gesture changes", path.display());
    Ok(watcher)
}

#[derive(Debug)]
pub struct GestureEngine {
    provider: Box<dyn GestureProvider>,
    updated: Arc<AtomicBool>,
    width: f64,
    height: f64,
    gestures: Vec<Gesture>,
    move_delta: f64,
    last_position: Option<Point>,
    notice: Option<String>,
}

impl GestureEngine {
    pub fn new(provider: Box<dyn GestureProvider>, width: f64, height: f64) -> Self {
        let mut engine = Self {
            provider,
            updated: Arc::new(AtomicBool::new(false)),
            width,
            height,
            gestures: Vec::new(),
            move_delta: 0.0,
            last_position: None,
            notice: None,
        };
        engine.reload();
        engine
    }

    /// Flag that makes the engine re-read its gesture list on the next sample.
    pub fn updated_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.updated)
    }

    pub fn gestures(&self) -> &[Gesture] {
        &self.gestures
    }

    fn reload(&mut self) {
        match self.provider.load() {
            Ok(list) => {
                info!("loaded {} gesture(s)", list.len());
                self.gestures = list;
            }
            Err(e) => {
                warn!("gesture definitions unusable, no gestures active: {e}");
                self.gestures.clear();
                self.notice = Some("gesture definitions could not be loaded".into());
            }
        }
    }
}

impl TriggerEngine for GestureEngine {
    fn on_sample(&mut self, sample: &Sample) -> Vec<TriggerSignal> {
        if self.updated.swap(false, Ordering::AcqRel) {
            self.reload();
        }
        let mut out = Vec::new();
        if let Some(notice) = self.notice.take() {
            out.push(TriggerSignal::notification(notice));
        }

        let position = sample.position;
        let delta = self.last_position.map_or(0.0, |p| p.distance(position));
        self.move_delta = (2.0 * self.move_delta + delta) / 3.0;
        self.last_position = Some(position);

        let motion = Motion {
            now: sample.timestamp,
            position,
            move_delta: self.move_delta,
            width: self.width,
            height: self.height,
        };
        for gesture in self.gestures.iter_mut().filter(|g| g.enabled) {
            gesture.advance(&motion, &mut out);
        }
        out
    }

    fn clear(&mut self) {
        for g in &mut self.gestures {
            g.runtime = GestureRuntime::default();
        }
        self.move_delta = 0.0;
        self.last_position = None;
        self.notice = None;
        self.updated.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const GESTURES: &str = r#"
        [[gesture]]
        name = "glance-right"
        cooldown_ms = 500

        [[gesture.step]]
        type = "look_at_area"
        left = 40
        top = 40
        width = 20
        height = 20
        dwell_ms = 100

        [[gesture.step]]
        type = "look_in_direction"
        dx = 30
        time_limit_ms = 300
        commands = ["next_page"]
    "#;

    struct Rig {
        engine: GestureEngine,
        t0: Instant,
    }

    impl Rig {
        fn new(gestures: Vec<Gesture>) -> Self {
            Self {
                engine: GestureEngine::new(Box::new(StaticGestures(gestures)), 1000.0, 1000.0),
                t0: Instant::now(),
            }
        }

        fn at(&mut self, t_ms: u64, x: f64, y: f64) -> Vec<TriggerSignal> {
            let s = Sample::new(Point::new(x, y), None, self.t0 + Duration::from_millis(t_ms));
            self.engine.on_sample(&s)
        }

        fn step(&self) -> usize {
            self.engine.gestures()[0].runtime.step_index
        }
    }

    fn completions(signals: &[TriggerSignal]) -> usize {
        signals.iter().filter(|s| s.is_completion()).count()
    }

    #[test]
    fn parses_tagged_steps() {
        let gs = parse_gestures(GESTURES).unwrap();
        assert_eq!(gs.len(), 1);
        let g = &gs[0];
        assert!(g.enabled);
        assert_eq!(g.cooldown, Duration::from_millis(500));
        assert_eq!(
            g.steps[1].kind,
            StepKind::LookInDirection { dx: 30.0, dy: 0.0 }
        );
        assert_eq!(g.steps[1].time_limit, Some(Duration::from_millis(300)));
        assert_eq!(g.steps[1].commands, vec!["next_page"]);
    }

    #[test]
    fn degenerate_steps_are_rejected() {
        let err = parse_gestures(
            r#"
            [[gesture]]
            name = "nowhere"
            [[gesture.step]]
            type = "look_in_direction"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn completing_final_step_emits_one_pair() {
        let mut rig = Rig::new(parse_gestures(GESTURES).unwrap());
        let mut out = Vec::new();
        for t in (0..=100).step_by(50) {
            out.extend(rig.at(t, 500.0, 500.0));
        }
        assert_eq!(rig.step(), 1);
        assert!(out.is_empty());

        out.extend(rig.at(150, 700.0, 500.0));
        out.extend(rig.at(200, 850.0, 500.0));
        assert_eq!(completions(&out), 1);
        assert_eq!(out.len(), 2);
        assert!(out[1].is_reset());
        assert_eq!(
            out[0].context.as_ref().unwrap().target,
            Some(TargetId::Commands(vec!["next_page".into()]))
        );
        assert!(rig.engine.gestures()[0].is_complete());
    }

    #[test]
    fn cooldown_holds_completed_gesture() {
        let mut rig = Rig::new(parse_gestures(GESTURES).unwrap());
        for t in (0..=100).step_by(50) {
            rig.at(t, 500.0, 500.0);
        }
        rig.at(150, 850.0, 500.0);
        assert!(rig.engine.gestures()[0].is_complete());

        rig.at(400, 500.0, 500.0);
        assert!(rig.engine.gestures()[0].is_complete());
        rig.at(650, 500.0, 500.0);
        assert_eq!(rig.step(), 0);
    }

    #[test]
    fn step_time_limit_resets_to_first_step() {
        let mut rig = Rig::new(parse_gestures(GESTURES).unwrap());
        for t in (0..=100).step_by(50) {
            rig.at(t, 500.0, 500.0);
        }
        assert_eq!(rig.step(), 1);

        // outside the area but not far enough right
        for t in (150..=400).step_by(50) {
            assert!(rig.at(t, 300.0, 500.0).is_empty());
        }
        assert_eq!(rig.step(), 1);
        assert!(rig.at(450, 300.0, 500.0).is_empty());
        assert_eq!(rig.step(), 0);
    }

    #[test]
    fn holding_first_step_keeps_gesture_alive() {
        let mut rig = Rig::new(parse_gestures(GESTURES).unwrap());
        for t in (0..=1000).step_by(50) {
            rig.at(t, 500.0, 500.0);
        }
        assert_eq!(rig.step(), 1);
        assert_eq!(completions(&rig.at(1050, 850.0, 500.0)), 1);
    }

    #[test]
    fn fixation_rearms_on_movement() {
        let g = Gesture {
            name: "stare".into(),
            enabled: true,
            cooldown: Duration::ZERO,
            steps: vec![GestureStep {
                kind: StepKind::Fixation {
                    radius: 5.0,
                    dwell_time: Duration::from_millis(200),
                },
                time_limit: None,
                commands: vec!["click".into()],
            }],
            runtime: GestureRuntime::default(),
        };
        let mut rig = Rig::new(vec![g]);
        rig.at(0, 100.0, 100.0);
        rig.at(100, 100.0, 100.0);
        // the jump keeps the smoothed movement above the radius until 350
        rig.at(150, 160.0, 100.0);
        for t in (200..=450).step_by(50) {
            assert!(rig.at(t, 160.0, 100.0).is_empty(), "completed early at {t}");
        }
        let out = rig.at(500, 160.0, 100.0);
        assert_eq!(completions(&out), 1);
    }

    #[test]
    fn radial_dwell_without_prior_fixation_uses_trial_start() {
        let g = Gesture {
            name: "rest".into(),
            enabled: true,
            cooldown: Duration::from_secs(10),
            steps: vec![GestureStep {
                kind: StepKind::DefaultRadialDwell {
                    radius: 5.0,
                    dwell_time: Duration::from_millis(100),
                },
                time_limit: None,
                commands: Vec::new(),
            }],
            runtime: GestureRuntime::default(),
        };
        let mut rig = Rig::new(vec![g]);
        rig.at(0, 300.0, 300.0);
        rig.at(50, 310.0, 300.0);
        let out = rig.at(100, 320.0, 300.0);
        assert_eq!(completions(&out), 1);
        assert_eq!(out[0].context.as_ref().unwrap().target, None);
    }

    fn centre_area() -> GestureStep {
        GestureStep {
            kind: StepKind::LookAtArea {
                left: 40.0,
                top: 40.0,
                width: 20.0,
                height: 20.0,
                round: false,
                dwell_time: Duration::from_millis(100),
            },
            time_limit: None,
            commands: Vec::new(),
        }
    }

    fn gesture(name: &str, steps: Vec<GestureStep>) -> Gesture {
        Gesture {
            name: name.into(),
            enabled: true,
            cooldown: Duration::from_secs(10),
            steps,
            runtime: GestureRuntime::default(),
        }
    }

    #[test]
    fn direction_sign_and_both_axes_count() {
        let up_left = GestureStep {
            kind: StepKind::LookInDirection { dx: -30.0, dy: 20.0 },
            time_limit: None,
            commands: Vec::new(),
        };
        let mut rig = Rig::new(vec![gesture("down-left", vec![centre_area(), up_left])]);
        for t in (0..=100).step_by(50) {
            rig.at(t, 500.0, 500.0);
        }
        assert_eq!(rig.step(), 1);

        // far enough left, but not down
        assert!(rig.at(150, 150.0, 500.0).is_empty());
        // down, but right instead of left
        assert!(rig.at(200, 850.0, 800.0).is_empty());
        assert_eq!(rig.step(), 1);

        assert_eq!(completions(&rig.at(250, 150.0, 800.0)), 1);
    }

    #[test]
    fn radial_dwell_centres_on_earlier_fixation_point() {
        let right = GestureStep {
            kind: StepKind::LookInDirection { dx: 20.0, dy: 0.0 },
            time_limit: None,
            commands: Vec::new(),
        };
        let back = GestureStep {
            kind: StepKind::DefaultRadialDwell {
                radius: 5.0,
                dwell_time: Duration::from_millis(100),
            },
            time_limit: None,
            commands: Vec::new(),
        };
        let mut rig = Rig::new(vec![gesture("there-and-back", vec![centre_area(), right, back])]);
        for t in (0..=100).step_by(50) {
            rig.at(t, 500.0, 500.0);
        }
        rig.at(150, 750.0, 500.0);
        assert_eq!(rig.step(), 2);

        // next to where the glance ended, far from the area fixation
        assert!(rig.at(200, 760.0, 500.0).is_empty());
        assert!(rig.at(250, 510.0, 500.0).is_empty());
        assert!(rig.at(300, 510.0, 500.0).is_empty());
        assert_eq!(completions(&rig.at(350, 510.0, 500.0)), 1);
    }

    #[test]
    fn round_area_uses_ellipse_test() {
        let kind = StepKind::LookAtArea {
            left: 0.0,
            top: 0.0,
            width: 20.0,
            height: 10.0,
            round: true,
            dwell_time: Duration::ZERO,
        };
        let at = |x, y| Motion {
            now: Instant::now(),
            position: Point::new(x, y),
            move_delta: 0.0,
            width: 1000.0,
            height: 1000.0,
        };
        assert!(kind.inside_area(&at(100.0, 50.0)));
        assert!(kind.inside_area(&at(195.0, 50.0)));
        // inside the bounding box, outside the ellipse
        assert!(!kind.inside_area(&at(5.0, 5.0)));
    }

    #[test]
    fn disabled_gestures_are_skipped() {
        let mut gs = parse_gestures(GESTURES).unwrap();
        gs[0].enabled = false;
        let mut rig = Rig::new(gs);
        for t in (0..=300).step_by(50) {
            rig.at(t, 500.0, 500.0);
        }
        assert_eq!(rig.engine.gestures()[0].runtime, GestureRuntime::default());
    }

    #[test]
    fn broken_file_means_no_gestures_and_one_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gestures.toml");
        fs::write(&path, GESTURES).unwrap();

        let mut engine = GestureEngine::new(Box::new(FileGestures::new(&path)), 1000.0, 1000.0);
        assert_eq!(engine.gestures().len(), 1);

        fs::write(&path, "[[gesture]]\nname = 3").unwrap();
        engine.updated_flag().store(true, Ordering::Release);

        let t0 = Instant::now();
        let s = Sample::new(Point::new(1.0, 1.0), None, t0);
        let out = engine.on_sample(&s);
        assert!(engine.gestures().is_empty());
        assert_eq!(out.len(), 1);
        assert!(out[0].notification.is_some());

        let s = Sample::new(Point::new(1.0, 1.0), None, t0 + Duration::from_millis(10));
        assert!(engine.on_sample(&s).is_empty());
    }
}
