//! NetSnoop library
//!
//! Host-level process-anomaly detection: poll the process table, diff newly
//! spawned pids, detect spawn bursts over a trailing window, attribute each
//! burst to the most plausible instigating program and append grouped
//! alerts to a persistent text log.

pub mod alerts;
pub mod chain;
pub mod config;
pub mod detector;
pub mod error;
pub mod eventlog;
pub mod instigator;
pub mod monitor;
pub mod proc;
pub mod rules;
pub mod tracker;

// Re-export commonly used types for convenience
pub use alerts::{AlertAggregator, AnomalyEvent};
pub use chain::{build_chain, ProcessChain, MAX_CHAIN_DEPTH};
pub use config::MonitorConfig;
pub use detector::{Burst, BurstDetector, SafeParentFilter};
pub use error::{NetsnoopError, NetsnoopResult};
pub use eventlog::EventLog;
pub use instigator::InstigatorResolver;
pub use monitor::Monitor;
pub use proc::{Pid, ProcessDirectory, ProcessIdentity, UNAVAILABLE};
#[cfg(unix)]
pub use proc::ProcfsDirectory;
pub use rules::RuleSet;
pub use tracker::{SpawnRecord, SpawnTracker};
