//! Spawn tracking: which pids are new, and when they appeared.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::proc::{Pid, ProcessDirectory};

/// First-observation record for a pid. Owned by [`SpawnTracker`] until it
/// ages out of the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRecord {
    pub pid: Pid,
    pub first_seen: Instant,
}

/// Tracks every pid observed this run and the time-stamped spawn events
/// inside the trailing window.
///
/// The seen set grows monotonically: a pid is only ever a spawn event once,
/// even if its record has long expired from the window.
#[derive(Debug, Default)]
pub struct SpawnTracker {
    seen: HashSet<Pid>,
    records: Vec<SpawnRecord>,
}

impl SpawnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff the current enumeration against the seen set. Newly observed
    /// pids are recorded with `now` as their spawn time and returned in
    /// enumeration order. A pid that cannot be inspected any further still
    /// counts as a spawn event; it existed at enumeration time.
    pub fn scan(&mut self, dir: &dyn ProcessDirectory, now: Instant) -> Vec<Pid> {
        let mut new_pids = Vec::new();
        for pid in dir.pids() {
            if self.seen.insert(pid) {
                self.records.push(SpawnRecord {
                    pid,
                    first_seen: now,
                });
                new_pids.push(pid);
            }
        }
        new_pids
    }

    /// Spawn records within `window` of `now`, in observation order.
    pub fn windowed(&self, now: Instant, window: Duration) -> Vec<SpawnRecord> {
        self.records
            .iter()
            .filter(|rec| now.saturating_duration_since(rec.first_seen) <= window)
            .copied()
            .collect()
    }

    /// Drop records that can no longer contribute to any window. The seen
    /// set is untouched.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        self.records
            .retain(|rec| now.saturating_duration_since(rec.first_seen) <= window);
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn is_seen(&self, pid: Pid) -> bool {
        self.seen.contains(&pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::testing::{FakeDirectory, FakeProcess};
    use pretty_assertions::assert_eq;

    fn dir_with(pids: &[Pid]) -> FakeDirectory {
        let mut dir = FakeDirectory::new();
        for &pid in pids {
            dir.add(FakeProcess::new(pid, "proc", 1));
        }
        dir
    }

    #[test]
    fn scan_reports_each_pid_once() {
        let mut tracker = SpawnTracker::new();
        let now = Instant::now();

        let first = tracker.scan(&dir_with(&[10, 11]), now);
        assert_eq!(first, vec![10, 11]);

        let second = tracker.scan(&dir_with(&[10, 11, 12]), now);
        assert_eq!(second, vec![12]);
        assert_eq!(tracker.seen_count(), 3);
    }

    #[test]
    fn seen_set_grows_monotonically() {
        let mut tracker = SpawnTracker::new();
        let now = Instant::now();

        tracker.scan(&dir_with(&[10, 11]), now);
        let before = tracker.seen_count();

        // 10 and 11 both exit; the seen set must not shrink.
        tracker.scan(&dir_with(&[12]), now + Duration::from_secs(1));
        assert!(tracker.seen_count() >= before);
        assert!(tracker.is_seen(10));
        assert!(tracker.is_seen(11));
    }

    #[test]
    fn windowed_excludes_expired_records() {
        let mut tracker = SpawnTracker::new();
        let start = Instant::now();
        let window = Duration::from_secs(3);

        tracker.scan(&dir_with(&[10]), start);
        tracker.scan(&dir_with(&[10, 11]), start + Duration::from_secs(2));

        let recent = tracker.windowed(start + Duration::from_secs(4), window);
        let pids: Vec<Pid> = recent.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![11]);
    }

    #[test]
    fn prune_keeps_seen_set_intact() {
        let mut tracker = SpawnTracker::new();
        let start = Instant::now();
        let window = Duration::from_secs(3);

        tracker.scan(&dir_with(&[10, 11]), start);
        tracker.prune(start + Duration::from_secs(10), window);

        assert!(tracker.windowed(start + Duration::from_secs(10), window).is_empty());
        assert_eq!(tracker.seen_count(), 2);
    }

    #[test]
    fn vanished_pid_still_counts_as_spawn_event() {
        let mut tracker = SpawnTracker::new();
        let now = Instant::now();

        let mut dir = dir_with(&[10]);
        let new_pids = tracker.scan(&dir, now);
        assert_eq!(new_pids, vec![10]);

        dir.remove(10);
        let recent = tracker.windowed(now, Duration::from_secs(3));
        assert_eq!(recent.len(), 1, "spawn record survives process exit");
    }
}
