//! Append-only text sink for process-detected and anomaly records.
//!
//! Every line is timestamp-prefixed at write time unless it already
//! carries an embedded short-time header (process-detected records do).
//! A write failure falls back to a secondary path; if that fails too the
//! failure goes to the console and the monitor keeps running.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use colored::Colorize;
use tracing::{debug, error, info, warn};

use crate::alerts::AnomalyEvent;
use crate::proc::ProcessIdentity;

const BANNER: &str =
    "================================================================================";
const PROCESS_HEADER: &str = "] 🔧 New Process Detected:";
pub const GROUPED_HEADER: &str = "⚠️  Multiple Anomalies Detected (Grouped):";

fn full_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

fn short_timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// File-backed event log with a fallback path and optional console echo.
#[derive(Debug)]
pub struct EventLog {
    primary: PathBuf,
    fallback: PathBuf,
    echo_console: bool,
}

impl EventLog {
    pub fn new(primary: PathBuf, fallback: PathBuf, echo_console: bool) -> Self {
        Self {
            primary,
            fallback,
            echo_console,
        }
    }

    /// Check the primary sink is writable before the loop starts. The
    /// monitor runs either way; this just surfaces permission problems
    /// early.
    pub fn preflight(&self) {
        match OpenOptions::new().create(true).append(true).open(&self.primary) {
            Ok(_) => info!(path = %self.primary.display(), "log file is writable"),
            Err(err) => {
                warn!(
                    path = %self.primary.display(),
                    %err,
                    "cannot write to log file, will rely on fallback"
                );
            }
        }
    }

    /// Append a record (possibly multi-line). Prefixes the write-time
    /// timestamp unless the record carries its own short-time header.
    pub fn append(&self, text: &str) {
        let stamped = if Self::has_embedded_timestamp(text) {
            text.to_string()
        } else {
            format!("[{}] {}", full_timestamp(), text)
        };

        if self.echo_console {
            println!("{stamped}");
        }

        if let Err(err) = Self::try_append(&self.primary, &stamped) {
            warn!(
                path = %self.primary.display(),
                %err,
                "log write failed, trying fallback"
            );
            if let Err(err2) = Self::try_append(&self.fallback, &stamped) {
                error!(
                    path = %self.fallback.display(),
                    err = %err2,
                    "fallback log write failed, record lost"
                );
            }
        }
    }

    fn has_embedded_timestamp(text: &str) -> bool {
        text.starts_with('[') && text.contains(PROCESS_HEADER)
    }

    fn try_append(path: &Path, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()
    }

    /// Bordered session-start banner plus the monitor identification lines.
    pub fn session_started(&self) {
        self.append(&format!(
            "\n{BANNER}\n🚀 NEW SESSION STARTED: {}\n{BANNER}",
            full_timestamp()
        ));
        self.append(&format!(
            "{}",
            "🔗 NetSnoop — Universal Process Monitor & Anomaly Detection".cyan()
        ));
        self.append("📌 Language-agnostic process burst detection active");
    }

    /// Bordered session-end banner; the one graceful action on shutdown.
    pub fn session_ended(&self) {
        self.append(&format!(
            "\n🛑 SESSION ENDED: {}\n{BANNER}\n",
            full_timestamp()
        ));
    }

    /// Indented ancestry tree for a newly detected process, root first,
    /// with the leaf's executable path and command line.
    pub fn process_detected(&self, chain: &[ProcessIdentity], exe_path: &str, cmdline: &str) {
        let mut lines = vec![format!("[{}] 🔧 New Process Detected:", short_timestamp())];
        for (depth, identity) in chain.iter().enumerate() {
            lines.push(format!(
                "{}└── {} (PID {}, User: {})",
                "    ".repeat(depth),
                identity.name,
                identity.pid,
                identity.owner
            ));
        }
        let sub_indent = "    ".repeat(chain.len());
        lines.push(format!("{sub_indent}├── Executable: {exe_path}"));
        lines.push(format!("{sub_indent}└── CmdLine: {cmdline}"));
        self.append(&lines.join("\n"));
    }

    /// One grouped alert: header plus one rendered line per event. Also
    /// echoed to the console in color regardless of debug mode.
    pub fn grouped_alert(&self, events: &[AnomalyEvent]) {
        if events.is_empty() {
            debug!("grouped alert requested with no events, skipping");
            return;
        }
        println!("\n{}", GROUPED_HEADER.red());
        self.append(GROUPED_HEADER);
        for event in events {
            let line = event.render();
            println!("{}", line.yellow());
            self.append(&line);
        }
        println!();
    }
}
