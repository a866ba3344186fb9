//! Monitor configuration.
//!
//! Layered loading: built-in defaults, then an optional TOML file (explicit
//! path or `~/.config/netsnoop/netsnoop.toml`), then `NETSNOOP_*`
//! environment overrides. CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{errors, NetsnoopResult};
use crate::rules::RuleSet;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_BURST_WINDOW_SECS: u64 = 3;
pub const DEFAULT_BURST_THRESHOLD: usize = 8;
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_LOG_PATH: &str = "netsnoop_persistent.txt";
pub const DEFAULT_FALLBACK_LOG_PATH: &str = "netsnoop_persistent2.txt";

/// Parents that legitimately spawn many children on a stock Linux / WSL
/// host. Relay processes are not listed; they are handled by the wrapper
/// rules during resolution instead.
static DEFAULT_SAFE_PARENTS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "systemd",
        "init",
        "rsyslogd",
        "cron",
        "agetty",
        "dbus-daemon",
        "systemd-journal",
        "systemd-resolve",
        "systemd-timesyn",
        "unattended-upgr",
        "systemd-udevd",
        "wsl-pro-service",
        "bash",
        "login",
        "(sd-pam)",
        "init-systemd(Ub",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
});

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Poll cadence in seconds.
    pub poll_interval_secs: u64,
    /// Trailing window for burst counting, in seconds.
    pub burst_window_secs: u64,
    /// Spawns within the window must exceed this count to qualify as a burst.
    pub burst_threshold: usize,
    /// Grouped-alert flush cadence, in seconds.
    pub flush_interval_secs: u64,
    /// Parent names exempt from alerting (after normalization).
    pub safe_parents: Vec<String>,
    /// Primary log sink.
    pub log_path: PathBuf,
    /// Secondary sink used when the primary write fails.
    pub fallback_log_path: PathBuf,
    /// Echo log records to the console and enable debug tracing.
    pub debug: bool,
    /// Heuristic string-matching tables.
    pub rules: RuleSet,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            burst_window_secs: DEFAULT_BURST_WINDOW_SECS,
            burst_threshold: DEFAULT_BURST_THRESHOLD,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            safe_parents: DEFAULT_SAFE_PARENTS.clone(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            fallback_log_path: PathBuf::from(DEFAULT_FALLBACK_LOG_PATH),
            debug: false,
            rules: RuleSet::default(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn burst_window(&self) -> Duration {
        Duration::from_secs(self.burst_window_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// Load configuration from the layered sources. A missing file is only
    /// an error when it was requested explicitly.
    pub fn load(explicit_path: Option<&Path>) -> NetsnoopResult<Self> {
        let mut builder = config::Config::builder();

        match explicit_path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                if let Some(default_path) = Self::default_config_path() {
                    if default_path.exists() {
                        builder = builder.add_source(config::File::from(default_path));
                    }
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("NETSNOOP")
                .separator("__")
                .try_parsing(true),
        );

        let loaded = builder
            .build()
            .map_err(|err| errors::config_error_with_source("failed to read configuration", err))?;
        loaded
            .try_deserialize()
            .map_err(|err| errors::config_error_with_source("invalid configuration", err))
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("netsnoop").join("netsnoop.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_match_the_tuned_values() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.burst_window(), Duration::from_secs(3));
        assert_eq!(config.burst_threshold, 8);
        assert_eq!(config.flush_interval(), Duration::from_secs(5));
        assert!(config.safe_parents.iter().any(|name| name == "systemd"));
        assert!(config.safe_parents.iter().any(|name| name == "bash"));
        assert!(!config.debug);
    }

    #[test]
    fn partial_toml_overrides_keep_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netsnoop.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "burst_threshold = 20\nsafe_parents = [\"systemd\"]\n\n[rules]\nsession_markers = [\"tmux\"]"
        )
        .unwrap();

        let config = MonitorConfig::load(Some(&path)).expect("config loads");
        assert_eq!(config.burst_threshold, 20);
        assert_eq!(config.safe_parents, vec!["systemd".to_string()]);
        assert_eq!(config.rules.session_markers, vec!["tmux".to_string()]);
        // Untouched sections keep their defaults.
        assert_eq!(config.burst_window_secs, DEFAULT_BURST_WINDOW_SECS);
        assert!(config.rules.tool_names.iter().any(|t| t == "python"));
    }

    #[test]
    fn explicitly_missing_file_is_an_error() {
        let result = MonitorConfig::load(Some(Path::new("/nonexistent/netsnoop.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let config = MonitorConfig {
            poll_interval_secs: 0,
            ..MonitorConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
