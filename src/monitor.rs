//! The polling monitor: one object owning all mutable state, one cycle
//! function, one async loop around it.
//!
//! Control flow per cycle: enumerate → spawn diff → per-new-pid chain
//! logging → burst evaluation → safe-parent filter → instigator resolution
//! → alert buffering → conditional flush. Strictly sequential; nothing in
//! the cycle blocks on user input, and every lookup degrades to sentinels,
//! so a cycle cannot fail. The only sanctioned exit is SIGINT/SIGTERM,
//! after which the session-end banner is the one final log write.

use std::time::Instant;

use chrono::Local;
use tracing::debug;

use crate::alerts::{AlertAggregator, AnomalyEvent};
use crate::chain::build_chain;
use crate::config::MonitorConfig;
use crate::detector::{Burst, BurstDetector, SafeParentFilter};
use crate::error::NetsnoopResult;
use crate::eventlog::EventLog;
use crate::instigator::InstigatorResolver;
use crate::proc::{Pid, ProcessDirectory, UNAVAILABLE};
use crate::tracker::SpawnTracker;

pub struct Monitor<D: ProcessDirectory> {
    dir: D,
    config: MonitorConfig,
    tracker: SpawnTracker,
    detector: BurstDetector,
    safe_parents: SafeParentFilter,
    resolver: InstigatorResolver,
    aggregator: AlertAggregator,
    log: EventLog,
}

impl<D: ProcessDirectory> Monitor<D> {
    pub fn new(dir: D, config: MonitorConfig) -> Self {
        let detector = BurstDetector::new(config.burst_window(), config.burst_threshold);
        let safe_parents = SafeParentFilter::new(config.safe_parents.iter().cloned());
        let resolver = InstigatorResolver::new(config.rules.clone());
        let aggregator = AlertAggregator::new(config.flush_interval(), Instant::now());
        let log = EventLog::new(
            config.log_path.clone(),
            config.fallback_log_path.clone(),
            config.debug,
        );
        Self {
            dir,
            config,
            tracker: SpawnTracker::new(),
            detector,
            safe_parents,
            resolver,
            aggregator,
            log,
        }
    }

    /// Preflight the sink and write the session-start banner.
    pub fn start_session(&self) {
        self.log.preflight();
        self.log.session_started();
    }

    /// Write the session-end banner.
    pub fn end_session(&self) {
        self.log.session_ended();
    }

    /// Run one poll cycle at `now`.
    pub fn cycle(&mut self, now: Instant) {
        let new_pids = self.tracker.scan(&self.dir, now);
        for pid in new_pids {
            self.log_new_process(pid);
        }

        if let Some(burst) = self.detector.evaluate(&self.dir, &self.tracker, now) {
            self.handle_burst(burst);
        }

        if let Some(events) = self.aggregator.maybe_flush(now) {
            self.log.grouped_alert(&events);
        }

        self.tracker.prune(now, self.detector.window);
    }

    /// Buffered anomalies not yet flushed.
    pub fn pending_alerts(&self) -> usize {
        self.aggregator.pending()
    }

    pub fn seen_pid_count(&self) -> usize {
        self.tracker.seen_count()
    }

    /// Mutable access to the process table, for scripting churn in tests.
    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.dir
    }

    fn log_new_process(&self, pid: Pid) {
        let chain = build_chain(&self.dir, pid);
        let (exe_path, cmdline) = match chain.last() {
            Some(leaf) => (self.dir.exe_path(leaf.pid), self.dir.cmdline(leaf.pid)),
            None => (UNAVAILABLE.to_string(), UNAVAILABLE.to_string()),
        };
        self.log.process_detected(&chain, &exe_path, &cmdline);
    }

    fn handle_burst(&mut self, burst: Burst) {
        let Some(identity) = self.dir.identity(burst.parent_pid) else {
            debug!(
                pid = burst.parent_pid,
                "skipping anomaly check, dominant parent vanished"
            );
            return;
        };
        debug!(
            pid = burst.parent_pid,
            name = %identity.name,
            children = burst.child_count,
            window_spawns = burst.spawn_count,
            "anomaly check"
        );

        if self.safe_parents.is_safe(&identity.name) {
            debug!(
                name = %SafeParentFilter::normalize(&identity.name),
                "burst from safe parent ignored"
            );
            return;
        }

        let descriptor = self.resolver.resolve(&self.dir, burst.parent_pid);
        for node in build_chain(&self.dir, burst.parent_pid) {
            debug!(
                pid = node.pid,
                name = %node.name,
                user = %node.owner,
                "instigator ancestry"
            );
        }

        self.aggregator.add(AnomalyEvent {
            timestamp: Local::now(),
            spawn_count: burst.spawn_count,
            instigator_pid: burst.parent_pid,
            descriptor,
        });
    }
}

#[cfg(unix)]
impl<D: ProcessDirectory> Monitor<D> {
    /// Poll until SIGINT/SIGTERM, then write the session-end marker.
    pub async fn run(&mut self) -> NetsnoopResult<()> {
        use tokio::signal::unix::{signal, SignalKind};

        self.start_session();

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle(Instant::now());
                }
                _ = sigint.recv() => {
                    debug!("received SIGINT, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    debug!("received SIGTERM, shutting down");
                    break;
                }
            }
        }

        self.end_session();
        Ok(())
    }
}
