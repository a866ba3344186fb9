//! Ancestor-chain construction.
//!
//! Walks a pid's parent links up to the OS root and returns the chain
//! root-first. The process table is live and racy, and parent links can be
//! corrupted, so the walk carries a visited-pid guard and a hard depth cap.

use std::collections::HashSet;

use crate::proc::{Pid, ProcessDirectory, ProcessIdentity};

/// Hard cap on ancestry depth. Real chains are far shallower; the cap only
/// matters against malformed parent graphs.
pub const MAX_CHAIN_DEPTH: usize = 50;

/// Ordered ancestor chain, root ancestor first, target process last.
/// Contains no duplicate pid.
pub type ProcessChain = Vec<ProcessIdentity>;

/// Build the ancestor chain for `pid`.
///
/// The walk stops at the OS root (pid 0/1), at the first unresolvable
/// ancestor, on a revisited pid, or at [`MAX_CHAIN_DEPTH`]. When it reaches
/// the root and the root itself resolves, the root identity is included.
pub fn build_chain(dir: &dyn ProcessDirectory, pid: Pid) -> ProcessChain {
    let mut chain: ProcessChain = Vec::new();
    let mut visited: HashSet<Pid> = HashSet::new();
    let mut current = pid;

    while current != 0 && current != 1 {
        if !visited.insert(current) || chain.len() >= MAX_CHAIN_DEPTH {
            chain.reverse();
            return chain;
        }
        let Some(identity) = dir.identity(current) else {
            chain.reverse();
            return chain;
        };
        current = identity.parent_pid;
        chain.push(identity);
    }

    if let Some(root) = dir.identity(current) {
        chain.push(root);
    }
    chain.reverse();
    chain
}
