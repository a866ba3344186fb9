//! Access to the OS process table.
//!
//! Every operation here may race with process exit, so lookups degrade to
//! `None` / `"N/A"` sentinels instead of failing a poll cycle. The live
//! implementation is `/proc`-backed: psutil for name and parent pid, direct
//! procfs reads for command line, executable path and owning user.

use std::collections::HashMap;

/// Process identifier, as procfs presents it.
pub type Pid = u32;

/// Sentinel for command lines and executable paths that could not be read.
pub const UNAVAILABLE: &str = "N/A";

/// Owner name reported when the uid cannot be mapped to a user.
pub const UNKNOWN_USER: &str = "unknown";

/// Identity of a process at lookup time. Derived fresh on each lookup and
/// never cached across poll cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: Pid,
    pub name: String,
    pub parent_pid: Pid,
    pub owner: String,
}

/// Abstraction over the process table. The monitor, chain builder and
/// instigator resolver only ever talk to this trait, which keeps the
/// heuristics testable against an in-memory table.
pub trait ProcessDirectory {
    /// Enumerate currently visible pids. Unreadable entries are skipped.
    fn pids(&self) -> Vec<Pid>;

    /// Name, parent pid and owning user, or `None` when the process has
    /// already vanished.
    fn identity(&self, pid: Pid) -> Option<ProcessIdentity>;

    /// Space-joined command line, or [`UNAVAILABLE`].
    fn cmdline(&self, pid: Pid) -> String;

    /// Resolved executable path, or [`UNAVAILABLE`].
    fn exe_path(&self, pid: Pid) -> String;
}

/// Live process table backed by `/proc`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsDirectory;

#[cfg(unix)]
impl ProcfsDirectory {
    fn owner_of(pid: Pid) -> String {
        let Some(uid) = Self::uid_of(pid) else {
            return UNKNOWN_USER.to_string();
        };
        match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
            Ok(Some(user)) => user.name,
            _ => UNKNOWN_USER.to_string(),
        }
    }

    fn uid_of(pid: Pid) -> Option<u32> {
        let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        status
            .lines()
            .find(|line| line.starts_with("Uid:"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|value| value.parse().ok())
    }
}

#[cfg(unix)]
impl ProcessDirectory for ProcfsDirectory {
    fn pids(&self) -> Vec<Pid> {
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(|n| n.parse().ok()))
            .collect()
    }

    fn identity(&self, pid: Pid) -> Option<ProcessIdentity> {
        let process = psutil::process::Process::new(pid.into()).ok()?;
        let name = process.name().ok()?;
        // ppid() yields None for pid 1; treat that as parented by the root.
        let parent_pid = process.ppid().ok()?.unwrap_or(0);
        Some(ProcessIdentity {
            pid,
            name,
            parent_pid,
            owner: Self::owner_of(pid),
        })
    }

    fn cmdline(&self, pid: Pid) -> String {
        match std::fs::read(format!("/proc/{pid}/cmdline")) {
            Ok(raw) => {
                let joined = String::from_utf8_lossy(&raw).replace('\0', " ");
                let trimmed = joined.trim();
                if trimmed.is_empty() {
                    UNAVAILABLE.to_string()
                } else {
                    trimmed.to_string()
                }
            }
            Err(_) => UNAVAILABLE.to_string(),
        }
    }

    fn exe_path(&self, pid: Pid) -> String {
        std::fs::read_link(format!("/proc/{pid}/exe"))
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| UNAVAILABLE.to_string())
    }
}

/// In-memory process table used by the test suites to script spawn bursts,
/// vanishing processes and malformed parent graphs.
pub mod testing {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct FakeProcess {
        pub pid: Pid,
        pub name: String,
        pub parent_pid: Pid,
        pub owner: String,
        pub cmdline: String,
        pub exe_path: String,
    }

    impl FakeProcess {
        pub fn new(pid: Pid, name: &str, parent_pid: Pid) -> Self {
            Self {
                pid,
                name: name.to_string(),
                parent_pid,
                owner: "dev".to_string(),
                cmdline: UNAVAILABLE.to_string(),
                exe_path: UNAVAILABLE.to_string(),
            }
        }

        pub fn with_owner(mut self, owner: &str) -> Self {
            self.owner = owner.to_string();
            self
        }

        pub fn with_cmdline(mut self, cmdline: &str) -> Self {
            self.cmdline = cmdline.to_string();
            self
        }

        pub fn with_exe_path(mut self, exe_path: &str) -> Self {
            self.exe_path = exe_path.to_string();
            self
        }
    }

    #[derive(Debug, Default, Clone)]
    pub struct FakeDirectory {
        procs: HashMap<Pid, FakeProcess>,
    }

    impl FakeDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add(&mut self, process: FakeProcess) {
            self.procs.insert(process.pid, process);
        }

        /// Simulate a process exiting between enumeration and inspection:
        /// the pid stays enumerable only while present here.
        pub fn remove(&mut self, pid: Pid) -> Option<FakeProcess> {
            self.procs.remove(&pid)
        }

        pub fn contains(&self, pid: Pid) -> bool {
            self.procs.contains_key(&pid)
        }
    }

    impl ProcessDirectory for FakeDirectory {
        fn pids(&self) -> Vec<Pid> {
            // Sorted for deterministic scan order in tests.
            let mut pids: Vec<Pid> = self.procs.keys().copied().collect();
            pids.sort_unstable();
            pids
        }

        fn identity(&self, pid: Pid) -> Option<ProcessIdentity> {
            self.procs.get(&pid).map(|p| ProcessIdentity {
                pid: p.pid,
                name: p.name.clone(),
                parent_pid: p.parent_pid,
                owner: p.owner.clone(),
            })
        }

        fn cmdline(&self, pid: Pid) -> String {
            self.procs
                .get(&pid)
                .map(|p| p.cmdline.clone())
                .unwrap_or_else(|| UNAVAILABLE.to_string())
        }

        fn exe_path(&self, pid: Pid) -> String {
            self.procs
                .get(&pid)
                .map(|p| p.exe_path.clone())
                .unwrap_or_else(|| UNAVAILABLE.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeDirectory, FakeProcess};
    use super::*;

    #[test]
    fn fake_directory_degrades_to_sentinels() {
        let dir = FakeDirectory::new();
        assert_eq!(dir.identity(9999), None);
        assert_eq!(dir.cmdline(9999), UNAVAILABLE);
        assert_eq!(dir.exe_path(9999), UNAVAILABLE);
    }

    #[test]
    fn fake_directory_round_trips_identity() {
        let mut dir = FakeDirectory::new();
        dir.add(
            FakeProcess::new(42, "worker", 7)
                .with_owner("alice")
                .with_cmdline("worker --serve")
                .with_exe_path("/opt/worker"),
        );

        let identity = dir.identity(42).expect("identity present");
        assert_eq!(identity.name, "worker");
        assert_eq!(identity.parent_pid, 7);
        assert_eq!(identity.owner, "alice");
        assert_eq!(dir.cmdline(42), "worker --serve");
        assert_eq!(dir.exe_path(42), "/opt/worker");
    }

    #[cfg(unix)]
    #[test]
    fn procfs_resolves_own_process() {
        let dir = ProcfsDirectory;
        let own = std::process::id();
        assert!(dir.pids().contains(&own));

        let identity = dir.identity(own).expect("own identity");
        assert_eq!(identity.pid, own);
        assert!(!identity.name.is_empty());
        assert_ne!(dir.cmdline(own), UNAVAILABLE);
    }
}
