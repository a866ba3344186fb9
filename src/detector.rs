//! Burst detection over the spawn window, plus the safe-parent filter.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::proc::{Pid, ProcessDirectory};
use crate::tracker::SpawnTracker;

/// A spawn burst attributed to its dominant immediate parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    /// Most frequent parent among the windowed spawns.
    pub parent_pid: Pid,
    /// How many windowed spawns that parent accounts for.
    pub child_count: usize,
    /// Total spawns in the window.
    pub spawn_count: usize,
}

/// Stateless window evaluator; all state lives in the tracker.
#[derive(Debug, Clone, Copy)]
pub struct BurstDetector {
    pub window: Duration,
    pub threshold: usize,
}

impl BurstDetector {
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self { window, threshold }
    }

    /// Evaluate the trailing window. Returns the dominant parent when the
    /// spawn count exceeds the threshold and at least one parent resolved.
    ///
    /// Parents are skipped when the child's identity is gone or the parent
    /// is the literal root 0 (kernel threads). Ties on frequency keep the
    /// first-encountered parent; the order is window-scan order, not a
    /// deliberate guarantee.
    pub fn evaluate(
        &self,
        dir: &dyn ProcessDirectory,
        tracker: &SpawnTracker,
        now: Instant,
    ) -> Option<Burst> {
        let recent = tracker.windowed(now, self.window);
        if recent.len() <= self.threshold {
            return None;
        }

        let mut counts: Vec<(Pid, usize)> = Vec::new();
        for record in &recent {
            let Some(identity) = dir.identity(record.pid) else {
                continue;
            };
            if identity.parent_pid == 0 {
                continue;
            }
            match counts.iter_mut().find(|(pid, _)| *pid == identity.parent_pid) {
                Some((_, count)) => *count += 1,
                None => counts.push((identity.parent_pid, 1)),
            }
        }

        let mut dominant: Option<(Pid, usize)> = None;
        for (pid, count) in counts {
            if dominant.map_or(true, |(_, best)| count > best) {
                dominant = Some((pid, count));
            }
        }

        dominant.map(|(parent_pid, child_count)| Burst {
            parent_pid,
            child_count,
            spawn_count: recent.len(),
        })
    }
}

/// Membership filter for parents that legitimately spawn many short-lived
/// children (init, shells, cron, system daemons) and must never alert.
#[derive(Debug, Clone)]
pub struct SafeParentFilter {
    names: HashSet<String>,
}

impl SafeParentFilter {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    /// Strip trailing parenthetical annotations (kernel thread decorations,
    /// WSL suffixes) and surrounding whitespace.
    pub fn normalize(name: &str) -> &str {
        name.trim().split('(').next().unwrap_or("")
    }

    pub fn is_safe(&self, name: &str) -> bool {
        self.names.contains(Self::normalize(name))
    }
}
