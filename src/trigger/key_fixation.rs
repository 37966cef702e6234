//! Dwell-to-select on discrete targets, with resumable progress.

use log::{debug, info};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    time::{Duration, Instant},
};

use super::TriggerEngine;
use super::expiry::ExpiryQueue;
use super::timing::KeyTimings;
use crate::config::KeyFixationSettings;
use crate::sample::{Point, PointAndTarget, Sample, TargetId, TriggerSignal};

/// Answers whether a target can currently be selected.
pub trait TargetAvailability: fmt::Debug + Send {
    fn is_enabled(&self, target: &TargetId) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct DisabledTargets(HashSet<TargetId>);

impl DisabledTargets {
    pub fn new(targets: impl IntoIterator<Item = TargetId>) -> Self {
        Self(targets.into_iter().map(|t| t.canonical()).collect())
    }
}

impl TargetAvailability for DisabledTargets {
    fn is_enabled(&self, target: &TargetId) -> bool {
        !self.0.contains(&target.canonical())
    }
}

#[derive(Debug, Clone)]
struct LockOn {
    target: TargetId,
    start: Instant,
}

#[derive(Debug, Clone)]
struct Fixation {
    target: TargetId,
    point: Point,
    start: Instant,
}

#[derive(Debug)]
pub struct KeyFixationEngine {
    timings: KeyTimings,
    resume_requires_lock_on: bool,
    availability: Box<dyn TargetAvailability>,
    lock_on: Option<LockOn>,
    active: Option<Fixation>,
    incomplete: HashMap<TargetId, Duration>,
    expiries: ExpiryQueue,
    last_target: Option<TargetId>,
    keystroke: u32,
}

impl KeyFixationEngine {
    pub fn new(
        timings: KeyTimings,
        resume_requires_lock_on: bool,
        availability: Box<dyn TargetAvailability>,
    ) -> Self {
        Self {
            timings,
            resume_requires_lock_on,
            availability,
            lock_on: None,
            active: None,
            incomplete: HashMap::new(),
            expiries: ExpiryQueue::new(),
            last_target: None,
            keystroke: 1,
        }
    }

    pub fn from_settings(s: &KeyFixationSettings) -> Self {
        Self::new(
            KeyTimings::from_settings(s),
            s.resume_requires_lock_on,
            Box::new(DisabledTargets::new(s.disabled.iter().cloned())),
        )
    }

    #[cfg(test)]
    pub fn is_locking_on(&self) -> bool {
        self.lock_on.is_some()
    }

    #[cfg(test)]
    pub fn fixation_target(&self) -> Option<&TargetId> {
        self.active.as_ref().map(|f| &f.target)
    }

    #[cfg(test)]
    pub fn banked(&self, target: &TargetId) -> Option<Duration> {
        self.incomplete.get(target).copied()
    }

    fn enabled<'a>(&self, target: Option<&'a TargetId>) -> Option<&'a TargetId> {
        target.filter(|t| self.availability.is_enabled(t))
    }

    fn expire(&mut self, now: Instant, out: &mut Vec<TriggerSignal>) {
        for target in self.expiries.pop_due(now) {
            if self.incomplete.remove(&target).is_some() {
                debug!("banked progress on {target} expired");
            }
            out.push(TriggerSignal::reset());
        }
    }

    fn track_lock_on(&mut self, sample: &Sample) {
        let now = sample.timestamp;
        let target = self.enabled(sample.target.as_ref());

        if !self.resume_requires_lock_on {
            if let Some(t) = target.filter(|t| self.incomplete.contains_key(*t)) {
                debug!("resuming fixation on {t} without lock-on");
                self.expiries.cancel(t);
                self.lock_on = None;
                self.active = Some(Fixation {
                    target: t.clone(),
                    point: sample.position,
                    start: now,
                });
                return;
            }
        }

        if let Some(lock) = &self.lock_on {
            if target != Some(&lock.target) {
                debug!("lock-on on {} cancelled", lock.target);
                self.lock_on = None;
            }
        }

        match &self.lock_on {
            None => {
                if let Some(t) = target {
                    self.lock_on = Some(LockOn {
                        target: t.clone(),
                        start: now,
                    });
                }
            }
            Some(lock) => {
                if now.duration_since(lock.start) >= self.timings.lock_on_time(&lock.target) {
                    debug!("locked on to {}", lock.target);
                    self.active = Some(Fixation {
                        target: lock.target.clone(),
                        point: sample.position,
                        start: now,
                    });
                    self.lock_on = None;
                }
            }
        }
    }

    fn track_fixation(&mut self, fix: Fixation, sample: &Sample, out: &mut Vec<TriggerSignal>) {
        let now = sample.timestamp;
        let elapsed = now.duration_since(fix.start);

        let still_on_target = sample.target.as_ref() == Some(&fix.target)
            && self.availability.is_enabled(&fix.target);
        if !still_on_target {
            let banked = self.incomplete.entry(fix.target.clone()).or_default();
            *banked += elapsed;
            debug!("fixation on {} interrupted, {:?} banked", fix.target, *banked);
            let ttl = self.timings.ttl(&fix.target);
            self.expiries.schedule(fix.target, now + ttl);
            self.active = None;
            return;
        }

        let banked = self.incomplete.get(&fix.target).copied().unwrap_or_default();
        let required =
            self.timings
                .required_time(&fix.target, self.last_target.as_ref(), self.keystroke);
        let progress = (banked + elapsed).as_secs_f64() / required.as_secs_f64();
        self.expiries.cancel(&fix.target);

        let context = PointAndTarget {
            point: fix.point,
            target: Some(fix.target.clone()),
        };
        if progress < 1.0 {
            if progress > 0.0 {
                out.push(TriggerSignal::progress(progress, context));
            }
            return;
        }

        self.expiries.clear();
        self.incomplete.clear();
        out.push(TriggerSignal::completed(context));

        if self.timings.has_completion_sequence(&fix.target) {
            self.keystroke = if self.last_target.as_ref() == Some(&fix.target) {
                self.keystroke + 1
            } else {
                1
            };
            info!("selected {} (keystroke {})", fix.target, self.keystroke);
            self.last_target = Some(fix.target.clone());
            self.active = Some(Fixation { start: now, ..fix });
        } else {
            info!("selected {}", fix.target);
            self.active = None;
        }
        out.push(TriggerSignal::reset());
    }
}

impl TriggerEngine for KeyFixationEngine {
    fn on_sample(&mut self, sample: &Sample) -> Vec<TriggerSignal> {
        let mut out = Vec::new();
        self.expire(sample.timestamp, &mut out);

        if self.last_target.is_some() && self.last_target != sample.target {
            self.keystroke = 1;
            self.last_target = None;
        }

        match self.active.clone() {
            None => self.track_lock_on(sample),
            Some(fix) => self.track_fixation(fix, sample, &mut out),
        }
        out
    }

    fn on_tick(&mut self, now: Instant) -> Vec<TriggerSignal> {
        let mut out = Vec::new();
        self.expire(now, &mut out);
        out
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.expiries.next_deadline()
    }

    fn clear(&mut self) {
        self.lock_on = None;
        self.active = None;
        self.incomplete.clear();
        self.expiries.clear();
        self.last_target = None;
        self.keystroke = 1;
    }
}
