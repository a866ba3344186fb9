//! Anomaly buffering and grouped alert flushing.
//!
//! Individual burst detections would be noisy at a 1 s poll cadence, so
//! resolved anomalies are buffered and emitted as one grouped alert on a
//! fixed interval.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::proc::Pid;

/// A resolved spawn-burst anomaly. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyEvent {
    pub timestamp: DateTime<Local>,
    pub spawn_count: usize,
    pub instigator_pid: Pid,
    pub descriptor: String,
}

impl AnomalyEvent {
    /// Single alert line: `  • [HH:MM:SS] PID <pid> → <n> spawns — <descriptor>`.
    pub fn render(&self) -> String {
        format!(
            "  • [{}] PID {} → {} spawns — {}",
            self.timestamp.format("%H:%M:%S"),
            self.instigator_pid,
            self.spawn_count,
            self.descriptor
        )
    }
}

/// Append-only event buffer with a cadenced, all-or-nothing flush.
#[derive(Debug)]
pub struct AlertAggregator {
    buffer: Vec<AnomalyEvent>,
    last_flush: Instant,
    flush_interval: Duration,
}

impl AlertAggregator {
    pub fn new(flush_interval: Duration, now: Instant) -> Self {
        Self {
            buffer: Vec::new(),
            last_flush: now,
            flush_interval,
        }
    }

    pub fn add(&mut self, event: AnomalyEvent) {
        self.buffer.push(event);
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drain the buffer when the flush interval elapsed and there is
    /// something to emit. The flush clock only resets on an actual flush,
    /// so an empty interval never delays a later alert.
    pub fn maybe_flush(&mut self, now: Instant) -> Option<Vec<AnomalyEvent>> {
        if now.saturating_duration_since(self.last_flush) <= self.flush_interval
            || self.buffer.is_empty()
        {
            return None;
        }
        self.last_flush = now;
        Some(std::mem::take(&mut self.buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(pid: Pid, spawns: usize) -> AnomalyEvent {
        AnomalyEvent {
            timestamp: Local::now(),
            spawn_count: spawns,
            instigator_pid: pid,
            descriptor: format!("stress worker (PID {pid})"),
        }
    }

    #[test]
    fn early_flush_is_a_no_op() {
        let start = Instant::now();
        let mut aggregator = AlertAggregator::new(Duration::from_secs(5), start);
        for _ in 0..3 {
            aggregator.add(event(60, 9));
        }

        assert_eq!(aggregator.maybe_flush(start + Duration::from_secs(4)), None);
        assert_eq!(aggregator.pending(), 3);
    }

    #[test]
    fn late_flush_drains_everything_once() {
        let start = Instant::now();
        let mut aggregator = AlertAggregator::new(Duration::from_secs(5), start);
        for _ in 0..3 {
            aggregator.add(event(60, 9));
        }

        let flushed = aggregator
            .maybe_flush(start + Duration::from_secs(6))
            .expect("flush due");
        assert_eq!(flushed.len(), 3);
        assert_eq!(aggregator.pending(), 0);

        // Nothing left, nothing re-emitted.
        assert_eq!(aggregator.maybe_flush(start + Duration::from_secs(20)), None);
    }

    #[test]
    fn empty_buffer_never_emits_or_resets_the_clock() {
        let start = Instant::now();
        let mut aggregator = AlertAggregator::new(Duration::from_secs(5), start);

        assert_eq!(aggregator.maybe_flush(start + Duration::from_secs(10)), None);

        // An event added after the idle interval flushes as soon as the
        // next check runs, because the idle check did not touch the clock.
        aggregator.add(event(60, 9));
        let flushed = aggregator.maybe_flush(start + Duration::from_secs(11));
        assert_eq!(flushed.map(|f| f.len()), Some(1));
    }

    #[test]
    fn render_shape_matches_the_log_format() {
        let line = event(60, 9).render();
        assert!(line.starts_with("  • ["));
        assert!(line.contains("PID 60 → 9 spawns — stress worker (PID 60)"));
    }
}
