//! Trigger sources: turn samples and button edges into trigger signals.

pub mod digital;
mod expiry;
pub mod key_fixation;
pub mod point_fixation;
pub mod timing;

use log::{debug, error, info};
use serde::Deserialize;
use std::{fmt, str::FromStr, time::Instant};
use thiserror::Error;

use crate::config::Profile;
use crate::gestures::{GestureEngine, GestureProvider};
use crate::sample::{Sample, TriggerSignal};
use digital::{Control, DigitalEdgeSource, EdgeEvent};
use key_fixation::KeyFixationEngine;
use point_fixation::PointFixationEngine;

/// One step of the shared source contract. Implementations own all of
/// their runtime state and are driven strictly in order.
pub trait TriggerEngine {
    fn on_sample(&mut self, sample: &Sample) -> Vec<TriggerSignal>;

    fn on_edge(&mut self, _edge: &EdgeEvent) -> Vec<TriggerSignal> {
        Vec::new()
    }

    /// Fires timers due at `now` when no input arrived.
    fn on_tick(&mut self, _now: Instant) -> Vec<TriggerSignal> {
        Vec::new()
    }

    fn next_deadline(&self) -> Option<Instant> {
        None
    }

    /// Drops all runtime state and scheduled timers.
    fn clear(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSelection {
    KeyFixation,
    PointFixation,
    Gestures,
    Keyboard,
    Mouse,
    Gamepad,
}

impl SourceSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSelection::KeyFixation => "key_fixation",
            SourceSelection::PointFixation => "point_fixation",
            SourceSelection::Gestures => "gestures",
            SourceSelection::Keyboard => "keyboard",
            SourceSelection::Mouse => "mouse",
            SourceSelection::Gamepad => "gamepad",
        }
    }
}

impl fmt::Display for SourceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "key_fixation" => SourceSelection::KeyFixation,
            "point_fixation" => SourceSelection::PointFixation,
            "gestures" => SourceSelection::Gestures,
            "keyboard" => SourceSelection::Keyboard,
            "mouse" => SourceSelection::Mouse,
            "gamepad" => SourceSelection::Gamepad,
            other => return Err(ConfigError::UnknownSource(other.to_string())),
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown trigger source '{0}'")]
    UnknownSource(String),
    #[error("trigger source '{selection}' needs digital.{setting} to be set")]
    MissingControl {
        selection: SourceSelection,
        setting: &'static str,
    },
    #[error("trigger source 'gestures' needs a gesture provider")]
    MissingGestures,
}

#[derive(Debug, Error, PartialEq)]
pub enum TriggerError {
    #[error("event arrived {behind_ms}ms before the previous one")]
    OutOfOrder { behind_ms: u128 },
    #[error("sample position ({x}, {y}) is not finite")]
    InvalidPosition { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Sample(Sample),
    Edge(EdgeEvent),
}

#[derive(Debug)]
pub enum SourceKind {
    KeyFixation(KeyFixationEngine),
    PointFixation(PointFixationEngine),
    Gestures(GestureEngine),
    Digital(DigitalEdgeSource<Control>),
}

impl SourceKind {
    fn engine(&mut self) -> &mut dyn TriggerEngine {
        match self {
            SourceKind::KeyFixation(e) => e,
            SourceKind::PointFixation(e) => e,
            SourceKind::Gestures(e) => e,
            SourceKind::Digital(e) => e,
        }
    }

    fn engine_ref(&self) -> &dyn TriggerEngine {
        match self {
            SourceKind::KeyFixation(e) => e,
            SourceKind::PointFixation(e) => e,
            SourceKind::Gestures(e) => e,
            SourceKind::Digital(e) => e,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Stopped => "stopped",
            RunState::Running => "running",
            RunState::Paused => "paused",
        }
    }
}

/// A trigger engine plus its lifecycle: start/stop, the pause gate, and
/// ordering checks on incoming events.
#[derive(Debug)]
pub struct TriggerSource {
    selection: SourceSelection,
    kind: SourceKind,
    state: RunState,
    last_sample: Option<Instant>,
    last_edge: Option<Instant>,
    /// Notifications raised while paused, delivered on the next running emission.
    held: Vec<TriggerSignal>,
}

impl TriggerSource {
    pub fn new(selection: SourceSelection, kind: SourceKind) -> Self {
        Self {
            selection,
            kind,
            state: RunState::Stopped,
            last_sample: None,
            last_edge: None,
            held: Vec::new(),
        }
    }

    /// Builds the source the profile selects. `gestures` is only consulted
    /// for the gesture source.
    pub fn from_profile(
        profile: &Profile,
        selection: SourceSelection,
        gestures: Option<Box<dyn GestureProvider>>,
    ) -> Result<Self, ConfigError> {
        let d = &profile.digital;
        let missing = |setting: &'static str| ConfigError::MissingControl {
            selection,
            setting,
        };
        let kind = match selection {
            SourceSelection::KeyFixation => {
                SourceKind::KeyFixation(KeyFixationEngine::from_settings(&profile.key_fixation))
            }
            SourceSelection::PointFixation => SourceKind::PointFixation(
                PointFixationEngine::from_settings(&profile.point_fixation),
            ),
            SourceSelection::Gestures => {
                let provider = gestures.ok_or(ConfigError::MissingGestures)?;
                SourceKind::Gestures(GestureEngine::new(
                    provider,
                    profile.trigger.screen_width,
                    profile.trigger.screen_height,
                ))
            }
            SourceSelection::Keyboard => {
                let key = d.keyboard_key.clone().ok_or_else(|| missing("keyboard_key"))?;
                SourceKind::Digital(DigitalEdgeSource::new(Control::Key(key)))
            }
            SourceSelection::Mouse => {
                let button = d.mouse_button.ok_or_else(|| missing("mouse_button"))?;
                SourceKind::Digital(DigitalEdgeSource::new(Control::Mouse(button)))
            }
            SourceSelection::Gamepad => {
                let button = d
                    .gamepad_button
                    .clone()
                    .ok_or_else(|| missing("gamepad_button"))?;
                let control = Control::Gamepad(button);
                SourceKind::Digital(if d.gamepad_repeat {
                    DigitalEdgeSource::with_repeat(control)
                } else {
                    DigitalEdgeSource::new(control)
                })
            }
        };
        Ok(Self::new(selection, kind))
    }

    pub fn selection(&self) -> SourceSelection {
        self.selection
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    pub fn start(&mut self) {
        if self.state == RunState::Stopped {
            info!("{} source started", self.selection);
            self.state = RunState::Running;
        }
    }

    /// Cancels every pending timer and drops engine state; a later
    /// `start` begins from scratch.
    pub fn stop(&mut self) {
        self.kind.engine().clear();
        self.last_sample = None;
        self.last_edge = None;
        self.held.clear();
        if self.state != RunState::Stopped {
            info!("{} source stopped", self.selection);
        }
        self.state = RunState::Stopped;
    }

    /// Keeps processing input but withholds signals. Progress is kept.
    pub fn pause(&mut self) {
        if self.state == RunState::Running {
            debug!("{} source paused", self.selection);
            self.state = RunState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == RunState::Paused {
            debug!("{} source resumed", self.selection);
            self.state = RunState::Running;
        }
    }

    fn gate(&mut self, signals: Vec<TriggerSignal>) -> Vec<TriggerSignal> {
        match self.state {
            RunState::Running if self.held.is_empty() => signals,
            RunState::Running => {
                let mut out = std::mem::take(&mut self.held);
                out.extend(signals);
                out
            }
            _ => {
                self.held
                    .extend(signals.into_iter().filter(|s| s.notification.is_some()));
                Vec::new()
            }
        }
    }

    fn check_order(last: Option<Instant>, at: Instant) -> Result<(), TriggerError> {
        match last {
            Some(last) if at < last => Err(TriggerError::OutOfOrder {
                behind_ms: (last - at).as_millis(),
            }),
            _ => Ok(()),
        }
    }

    fn check_sample(&self, sample: &Sample) -> Result<(), TriggerError> {
        if !sample.position.is_finite() {
            return Err(TriggerError::InvalidPosition {
                x: sample.position.x,
                y: sample.position.y,
            });
        }
        Self::check_order(self.last_sample, sample.timestamp)
    }

    fn fail(&mut self, e: TriggerError) -> TriggerError {
        error!("{} source failed: {e}", self.selection);
        self.stop();
        e
    }

    /// Feeds one input event. An error ends this source: it is torn down
    /// before the error is returned.
    pub fn handle(&mut self, event: &InputEvent) -> Result<Vec<TriggerSignal>, TriggerError> {
        if self.state == RunState::Stopped {
            return Ok(Vec::new());
        }
        let signals = match event {
            InputEvent::Sample(sample) => {
                if let Err(e) = self.check_sample(sample) {
                    return Err(self.fail(e));
                }
                self.last_sample = Some(sample.timestamp);
                self.kind.engine().on_sample(sample)
            }
            InputEvent::Edge(edge) => {
                if let Err(e) = Self::check_order(self.last_edge, edge.timestamp) {
                    return Err(self.fail(e));
                }
                self.last_edge = Some(edge.timestamp);
                self.kind.engine().on_edge(edge)
            }
        };
        Ok(self.gate(signals))
    }

    pub fn tick(&mut self, now: Instant) -> Vec<TriggerSignal> {
        if self.state == RunState::Stopped {
            return Vec::new();
        }
        let signals = self.kind.engine().on_tick(now);
        self.gate(signals)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            RunState::Stopped => None,
            _ => self.kind.engine_ref().next_deadline(),
        }
    }
}
