//! Dwell timing lookup for the key fixation engine.

use std::{collections::HashMap, time::Duration};

use crate::config::{KeyFixationSettings, ms};
use crate::sample::TargetId;

/// Returns the value of the first rule that applies and has one, else `fallback`.
pub(crate) fn resolve<T: Copy>(rules: &[(bool, Option<T>)], fallback: T) -> T {
    rules
        .iter()
        .find_map(|&(applies, value)| if applies { value } else { None })
        .unwrap_or(fallback)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingOverrides {
    pub lock_on_time: Option<Duration>,
    pub completion_times: Vec<Duration>,
    pub time_required_to_lock_down: Option<Duration>,
    pub lock_down_attempt_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct KeyTimings {
    lock_on_time: Duration,
    time_to_complete: Duration,
    incomplete_ttl: Duration,
    per_target: HashMap<TargetId, Duration>,
    overrides: HashMap<TargetId, TimingOverrides>,
}

impl KeyTimings {
    pub fn new(lock_on_time: Duration, time_to_complete: Duration, incomplete_ttl: Duration) -> Self {
        Self {
            lock_on_time,
            time_to_complete,
            incomplete_ttl,
            per_target: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    pub fn from_settings(s: &KeyFixationSettings) -> Self {
        let mut t = Self::new(ms(s.lock_on_ms), ms(s.complete_ms), ms(s.incomplete_ttl_ms));
        for (target, v) in &s.complete_times {
            t.per_target.insert(target.canonical(), ms(*v));
        }
        for o in &s.overrides {
            t.set_override(
                &o.target,
                TimingOverrides {
                    lock_on_time: o.lock_on_ms.map(ms),
                    completion_times: o.completion_ms.iter().copied().map(ms).collect(),
                    time_required_to_lock_down: o.lock_down_ms.map(ms),
                    lock_down_attempt_timeout: o.lock_down_attempt_timeout_ms.map(ms),
                },
            );
        }
        t
    }

    #[cfg(test)]
    pub fn set_complete_time(&mut self, target: &TargetId, time: Duration) {
        self.per_target.insert(target.canonical(), time);
    }

    pub fn set_override(&mut self, target: &TargetId, o: TimingOverrides) {
        self.overrides.insert(target.canonical(), o);
    }

    fn override_for(&self, target: &TargetId) -> Option<&TimingOverrides> {
        self.overrides.get(&target.canonical())
    }

    pub fn lock_on_time(&self, target: &TargetId) -> Duration {
        let o = self.override_for(target);
        resolve(&[(true, o.and_then(|o| o.lock_on_time))], self.lock_on_time)
    }

    /// Time a fixation on `target` needs, given the previous selection and
    /// how many times in a row it has been selected.
    pub fn required_time(
        &self,
        target: &TargetId,
        last_target: Option<&TargetId>,
        keystroke: u32,
    ) -> Duration {
        let o = self.override_for(target);
        let changed = last_target != Some(target);
        let from_sequence = o
            .map(|o| o.completion_times.as_slice())
            .filter(|seq| !seq.is_empty())
            .and_then(|seq| {
                if changed {
                    seq.first().copied()
                } else {
                    seq.get(keystroke as usize).or(seq.last()).copied()
                }
            });

        resolve(
            &[
                (keystroke == 2, o.and_then(|o| o.time_required_to_lock_down)),
                (true, from_sequence),
                (true, self.per_target.get(&target.canonical()).copied()),
            ],
            self.time_to_complete,
        )
    }

    /// How long banked progress on `target` survives without a resume.
    pub fn ttl(&self, target: &TargetId) -> Duration {
        let o = self.override_for(target);
        resolve(
            &[(true, o.and_then(|o| o.lock_down_attempt_timeout))],
            self.incomplete_ttl,
        )
    }

    pub fn has_completion_sequence(&self, target: &TargetId) -> bool {
        self.override_for(target)
            .is_some_and(|o| !o.completion_times.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings() -> KeyTimings {
        let mut t = KeyTimings::new(ms(200), ms(1000), ms(3000));
        t.set_complete_time(&TargetId::function("Shift", None), ms(1500));
        t.set_override(
            &TargetId::text("A"),
            TimingOverrides {
                lock_on_time: Some(ms(50)),
                completion_times: vec![ms(900), ms(600), ms(400)],
                time_required_to_lock_down: Some(ms(2500)),
                lock_down_attempt_timeout: Some(ms(8000)),
            },
        );
        t
    }

    #[test]
    fn resolve_takes_first_applicable_value() {
        assert_eq!(resolve(&[(false, Some(1)), (true, None), (true, Some(3))], 9), 3);
        assert_eq!(resolve::<u32>(&[(false, Some(1))], 9), 9);
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let t = timings();
        let b = TargetId::text("B");
        assert_eq!(t.lock_on_time(&b), ms(200));
        assert_eq!(t.required_time(&b, None, 1), ms(1000));
        assert_eq!(t.ttl(&b), ms(3000));
        assert!(!t.has_completion_sequence(&b));
    }

    #[test]
    fn function_labels_share_one_timing_entry() {
        let t = timings();
        let labelled = TargetId::function("Shift", Some("SHIFT"));
        assert_eq!(t.required_time(&labelled, None, 1), ms(1500));
    }

    #[test]
    fn completion_sequence_follows_keystroke() {
        let t = timings();
        let a = TargetId::text("A");
        assert_eq!(t.lock_on_time(&a), ms(50));
        assert_eq!(t.required_time(&a, None, 1), ms(900));
        assert_eq!(t.required_time(&a, Some(&TargetId::text("B")), 3), ms(900));
        assert_eq!(t.required_time(&a, Some(&a), 1), ms(600));
        assert_eq!(t.required_time(&a, Some(&a), 7), ms(400));
        assert_eq!(t.ttl(&a), ms(8000));
    }

    #[test]
    fn lock_down_wins_on_second_keystroke() {
        let t = timings();
        let a = TargetId::text("A");
        assert_eq!(t.required_time(&a, Some(&a), 2), ms(2500));
    }
}
