use std::{cmp::Reverse, collections::BinaryHeap, time::Instant};

use crate::sample::TargetId;

/// Deadlines for banked progress, at most one per target.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    heap: BinaryHeap<Reverse<(Instant, TargetId)>>,
}

impl ExpiryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any deadline already pending for `target`.
    pub fn schedule(&mut self, target: TargetId, at: Instant) {
        self.cancel(&target);
        self.heap.push(Reverse((at, target)));
    }

    pub fn cancel(&mut self, target: &TargetId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|Reverse((_, t))| t != target);
        self.heap.len() != before
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse((at, _))| *at)
    }

    /// Removes and returns every target whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Vec<TargetId> {
        let mut due = Vec::new();
        while self.next_deadline().is_some_and(|at| at <= now) {
            if let Some(Reverse((_, target))) = self.heap.pop() {
                due.push(target);
            }
        }
        due
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pops_in_deadline_order() {
        let t0 = Instant::now();
        let mut q = ExpiryQueue::new();
        q.schedule(TargetId::text("B"), t0 + Duration::from_millis(20));
        q.schedule(TargetId::text("A"), t0 + Duration::from_millis(10));
        q.schedule(TargetId::text("C"), t0 + Duration::from_millis(30));

        assert_eq!(q.next_deadline(), Some(t0 + Duration::from_millis(10)));
        assert_eq!(
            q.pop_due(t0 + Duration::from_millis(20)),
            vec![TargetId::text("A"), TargetId::text("B")]
        );
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn rescheduling_replaces_previous_deadline() {
        let t0 = Instant::now();
        let mut q = ExpiryQueue::new();
        let a = TargetId::text("A");
        q.schedule(a.clone(), t0 + Duration::from_millis(10));
        q.schedule(a.clone(), t0 + Duration::from_millis(50));
        assert_eq!(q.len(), 1);
        assert!(q.pop_due(t0 + Duration::from_millis(10)).is_empty());

        assert!(q.cancel(&a));
        assert!(!q.cancel(&a));
        assert!(q.is_empty());
    }
}
