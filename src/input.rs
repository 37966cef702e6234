//! JSON-lines input: pointer samples and button edges from the platform layer.
//!
//! ```text
//! {"sample": {"x": 410.0, "y": 222.5, "target": "A", "t_ms": 1200}}
//! {"edge": {"control": {"key": "Space"}, "kind": "down", "t_ms": 1250}}
//! ```
//!
//! `t_ms` is relative to when the reader started; without it the arrival
//! time is used.

use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::sample::{Point, Sample, TargetId};
use crate::trigger::InputEvent;
use crate::trigger::digital::{Control, EdgeEvent, EdgeKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum Line {
    Sample {
        x: f64,
        y: f64,
        #[serde(default)]
        target: Option<TargetId>,
        t_ms: Option<u64>,
    },
    Edge {
        control: Control,
        kind: EdgeKind,
        t_ms: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    base: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
        }
    }

    #[cfg(test)]
    pub fn starting_at(base: Instant) -> Self {
        Self { base }
    }

    fn timestamp(&self, t_ms: Option<u64>) -> Instant {
        match t_ms {
            Some(ms) => self.base + Duration::from_millis(ms),
            None => Instant::now(),
        }
    }
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str, clock: &Clock) -> Result<Option<InputEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let parsed: Line =
        serde_json::from_str(line).map_err(|e| anyhow!("bad input line '{line}': {e}"))?;
    let event = match parsed {
        Line::Sample { x, y, target, t_ms } => InputEvent::Sample(Sample::new(
            Point::new(x, y),
            target,
            clock.timestamp(t_ms),
        )),
        Line::Edge {
            control,
            kind,
            t_ms,
        } => InputEvent::Edge(EdgeEvent {
            control,
            kind,
            timestamp: clock.timestamp(t_ms),
        }),
    };
    Ok(Some(event))
}
