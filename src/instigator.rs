//! Instigator resolution: walk past session plumbing to the program a
//! human would recognize as responsible for a spawn burst.
//!
//! Resolution is a priority-ordered fallback chain. A direct causal link
//! (ancestry) beats a plausible one (global scan plus session correlation),
//! which beats a generic one (raw identity). The resolver never fails: it
//! always produces a descriptor string.

use std::collections::HashSet;

use tracing::debug;

use crate::chain::{build_chain, MAX_CHAIN_DEPTH};
use crate::proc::{Pid, ProcessDirectory, UNAVAILABLE};
use crate::rules::RuleSet;

/// A non-system process found during the global scan, scored by the
/// candidate rule table.
#[derive(Debug, Clone)]
struct Candidate {
    priority: u8,
    descriptor: String,
    pid: Pid,
}

/// Recorded ancestor from the walk: name, command line, pid.
type Ancestor = (String, String, Pid);

#[derive(Debug, Clone)]
pub struct InstigatorResolver {
    rules: RuleSet,
}

impl InstigatorResolver {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Resolve `pid` to a human-meaningful descriptor.
    pub fn resolve(&self, dir: &dyn ProcessDirectory, pid: Pid) -> String {
        let mut ancestors: Vec<Ancestor> = Vec::new();

        if let Some(descriptor) = self.walk_ancestry(dir, pid, &mut ancestors) {
            return descriptor;
        }

        let candidates = self.global_candidates(dir);
        if !candidates.is_empty() {
            debug!(
                top = %candidates[0].descriptor,
                total = candidates.len(),
                "no meaningful ancestor, falling back to global candidates"
            );
            for candidate in &candidates {
                if self.shares_session_ancestor(dir, candidate.pid, pid) {
                    debug!(pid = candidate.pid, "candidate correlated through session ancestry");
                    return candidate.descriptor.clone();
                }
            }
            return format!("Likely instigator: {}", candidates[0].descriptor);
        }

        if let Some((name, cmd, apid)) = ancestors
            .iter()
            .find(|(name, cmd, _)| {
                !self.rules.is_wrapper_name(name) && !self.rules.is_system_cmdline(cmd)
            })
            .or_else(|| ancestors.first())
        {
            return format!("{name} - {cmd} (PID {apid})");
        }

        match dir.identity(pid) {
            Some(identity) => {
                format!("{} - {} (PID {})", identity.name, dir.cmdline(pid), pid)
            }
            None => format!("Unknown process (PID {pid})"),
        }
    }

    /// Walk up the parent chain looking for the first meaningful program.
    /// Records every resolvable ancestor along the way for later fallbacks.
    fn walk_ancestry(
        &self,
        dir: &dyn ProcessDirectory,
        pid: Pid,
        ancestors: &mut Vec<Ancestor>,
    ) -> Option<String> {
        let mut visited: HashSet<Pid> = HashSet::new();
        let mut current = pid;

        while current != 0 && current != 1 && visited.len() < MAX_CHAIN_DEPTH {
            if !visited.insert(current) {
                break;
            }
            let cmd = dir.cmdline(current);
            let Some(identity) = dir.identity(current) else {
                break;
            };
            debug!(pid = current, name = %identity.name, cmdline = %cmd, "tracing ancestor");

            if cmd != UNAVAILABLE {
                ancestors.push((identity.name.clone(), cmd.clone(), current));

                if !self.rules.should_skip(&identity.name, &cmd)
                    && self.rules.is_meaningful(&cmd)
                {
                    return Some(format!("{cmd} (PID {current})"));
                }
            }

            current = identity.parent_pid;
        }
        None
    }

    /// Enumerate every running process that could plausibly be an
    /// instigator, scored and sorted by descending priority (stable).
    fn global_candidates(&self, dir: &dyn ProcessDirectory) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for pid in dir.pids() {
            let Some(identity) = dir.identity(pid) else {
                continue;
            };
            let cmd = dir.cmdline(pid);
            if identity.name.is_empty() || cmd == UNAVAILABLE {
                continue;
            }
            if self.rules.should_skip(&identity.name, &cmd) {
                continue;
            }
            candidates.push(Candidate {
                priority: self.rules.candidate_priority(&cmd),
                descriptor: format!("{cmd} (PID {pid})"),
                pid,
            });
        }
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        candidates
    }

    /// True when the candidate's ancestor chain and the original pid's
    /// chain share a node whose name marks session plumbing (session
    /// leader, relay, shell).
    fn shares_session_ancestor(
        &self,
        dir: &dyn ProcessDirectory,
        candidate: Pid,
        original: Pid,
    ) -> bool {
        let candidate_chain = build_chain(dir, candidate);
        let original_chain = build_chain(dir, original);

        candidate_chain.iter().any(|node| {
            self.rules.is_session_marker(&node.name)
                && original_chain.iter().any(|other| other.pid == node.pid)
        })
    }
}
