//! Point samples, target identifiers and the trigger signals engines emit.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Identifier of an on-screen selectable target.
///
/// String form: `A` (text), `fn:Name` or `fn:Name#Label` (function key with a
/// dynamic label), `cmd:a,b` (synthetic target carrying gesture commands).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetId {
    Text(String),
    Function {
        name: String,
        label: Option<String>,
    },
    Commands(Vec<String>),
}

impl TargetId {
    pub fn text(s: impl Into<String>) -> Self {
        TargetId::Text(s.into())
    }

    pub fn function(name: impl Into<String>, label: Option<&str>) -> Self {
        TargetId::Function {
            name: name.into(),
            label: label.map(str::to_string),
        }
    }

    /// Function targets share one timing entry whatever label they currently show.
    pub fn canonical(&self) -> TargetId {
        match self {
            TargetId::Function { name, .. } => TargetId::Function {
                name: name.clone(),
                label: None,
            },
            other => other.clone(),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Text(s) => write!(f, "{s}"),
            TargetId::Function { name, label: None } => write!(f, "fn:{name}"),
            TargetId::Function {
                name,
                label: Some(label),
            } => write!(f, "fn:{name}#{label}"),
            TargetId::Commands(cmds) => write!(f, "cmd:{}", cmds.join(",")),
        }
    }
}

impl FromStr for TargetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty target id".into());
        }
        if let Some(rest) = s.strip_prefix("fn:") {
            let (name, label) = match rest.split_once('#') {
                Some((n, l)) => (n, Some(l)),
                None => (rest, None),
            };
            if name.is_empty() {
                return Err(format!("function target '{s}' has no name"));
            }
            return Ok(TargetId::function(name, label));
        }
        if let Some(rest) = s.strip_prefix("cmd:") {
            let cmds = rest
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(TargetId::Commands(cmds));
        }
        Ok(TargetId::Text(s.to_string()))
    }
}

impl TryFrom<String> for TargetId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TargetId> for String {
    fn from(t: TargetId) -> Self {
        t.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub position: Point,
    pub target: Option<TargetId>,
    pub timestamp: Instant,
}

impl Sample {
    pub fn new(position: Point, target: Option<TargetId>, timestamp: Instant) -> Self {
        Self {
            position,
            target,
            timestamp,
        }
    }

    pub fn context(&self) -> PointAndTarget {
        PointAndTarget {
            point: self.position,
            target: self.target.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointAndTarget {
    pub point: Point,
    pub target: Option<TargetId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i8")]
pub enum Edge {
    Down,
    Up,
}

impl From<Edge> for i8 {
    fn from(e: Edge) -> i8 {
        match e {
            Edge::Down => 1,
            Edge::Up => -1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerSignal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<Edge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<PointAndTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

impl TriggerSignal {
    pub fn progress(progress: f64, context: PointAndTarget) -> Self {
        Self {
            progress: Some(progress.clamp(0.0, 1.0)),
            context: Some(context),
            ..Self::default()
        }
    }

    /// Selection fired.
    pub fn completed(context: PointAndTarget) -> Self {
        Self {
            edge: Some(Edge::Down),
            progress: Some(1.0),
            context: Some(context),
            notification: None,
        }
    }

    pub fn reset() -> Self {
        Self {
            progress: Some(0.0),
            ..Self::default()
        }
    }

    pub fn edge(edge: Edge, context: Option<PointAndTarget>) -> Self {
        Self {
            edge: Some(edge),
            context,
            ..Self::default()
        }
    }

    pub fn notification(text: impl Into<String>) -> Self {
        Self {
            notification: Some(text.into()),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn is_reset(&self) -> bool {
        self.edge.is_none() && self.progress == Some(0.0) && self.context.is_none()
    }

    #[cfg(test)]
    pub fn is_completion(&self) -> bool {
        self.edge == Some(Edge::Down) && self.progress == Some(1.0)
    }
}
