//! Down/up adapters for keyboard keys, mouse buttons and gamepad buttons.

use log::debug;
use serde::Deserialize;
use std::{fmt, time::Instant};

use super::TriggerEngine;
use crate::sample::{Edge, Sample, TargetId, TriggerSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// A physical control as reported by the platform hook layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Key(String),
    Mouse(MouseButton),
    Gamepad(String),
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Key(k) => write!(f, "key {k}"),
            Control::Mouse(b) => write!(f, "mouse {b:?}"),
            Control::Gamepad(b) => write!(f, "gamepad {b}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Down,
    Up,
    /// Platform auto-repeat while held.
    Repeat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEvent<C = Control> {
    pub control: C,
    pub kind: EdgeKind,
    pub timestamp: Instant,
}

#[derive(Debug)]
pub struct DigitalEdgeSource<C = Control> {
    control: C,
    repeat: bool,
    pressed: Option<bool>,
    latest: Option<Sample>,
    /// Target under the pointer when the current press began.
    armed: Option<Option<TargetId>>,
}

impl<C: PartialEq + fmt::Debug> DigitalEdgeSource<C> {
    pub fn new(control: C) -> Self {
        Self {
            control,
            repeat: false,
            pressed: None,
            latest: None,
            armed: None,
        }
    }

    /// Forwards platform repeats while the pointer stays on the pressed target.
    pub fn with_repeat(control: C) -> Self {
        Self {
            repeat: true,
            ..Self::new(control)
        }
    }

    fn latest_target(&self) -> Option<TargetId> {
        self.latest.as_ref().and_then(|s| s.target.clone())
    }

    pub fn track(&mut self, sample: &Sample) {
        self.latest = Some(sample.clone());
    }

    pub fn handle_edge(&mut self, edge: &EdgeEvent<C>) -> Vec<TriggerSignal> {
        if edge.control != self.control {
            return Vec::new();
        }
        let context = self.latest.as_ref().map(Sample::context);

        match edge.kind {
            EdgeKind::Down if self.pressed != Some(true) => {
                self.pressed = Some(true);
                self.armed = Some(self.latest_target());
                vec![TriggerSignal::edge(Edge::Down, context)]
            }
            EdgeKind::Up if self.pressed == Some(true) => {
                self.pressed = Some(false);
                self.armed = None;
                vec![TriggerSignal::edge(Edge::Up, context)]
            }
            EdgeKind::Repeat if self.repeat && self.pressed == Some(true) => {
                let current = self.latest_target();
                if self.armed.as_ref() == Some(&current) {
                    vec![TriggerSignal::edge(Edge::Down, context)]
                } else {
                    debug!("{:?}: repeat suppressed, target moved", self.control);
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.pressed = None;
        self.latest = None;
        self.armed = None;
    }
}

impl TriggerEngine for DigitalEdgeSource<Control> {
    fn on_sample(&mut self, sample: &Sample) -> Vec<TriggerSignal> {
        self.track(sample);
        Vec::new()
    }

    fn on_edge(&mut self, edge: &EdgeEvent) -> Vec<TriggerSignal> {
        self.handle_edge(edge)
    }

    fn clear(&mut self) {
        self.reset();
    }
}
