//! Heuristic rule tables for instigator attribution.
//!
//! Everything here is string matching against process names and command
//! lines. The lists are configuration, not law: defaults mirror what a
//! stock Linux / WSL install looks like, and every list can be replaced
//! from the config file. Candidate scoring is a declarative, ordered rule
//! table so each rule can be unit tested on its own.

use once_cell::sync::Lazy;
use serde::Deserialize;

static DEFAULT_SCRIPT_EXTENSIONS: Lazy<Vec<String>> = Lazy::new(|| {
    [".py", ".sh", ".pl", ".rb", ".js", ".c", ".cpp", ".go"]
        .iter()
        .map(|s| s.to_string())
        .collect()
});

static DEFAULT_TOOL_NAMES: Lazy<Vec<String>> = Lazy::new(|| {
    ["python", "node", "java", "go", "rust", "gcc", "make", "cmake"]
        .iter()
        .map(|s| s.to_string())
        .collect()
});

static DEFAULT_BUILD_KEYWORDS: Lazy<Vec<String>> = Lazy::new(|| {
    ["build", "compile", "test", "run", "stress"]
        .iter()
        .map(|s| s.to_string())
        .collect()
});

static DEFAULT_WRAPPER_PREFIXES: Lazy<Vec<String>> = Lazy::new(|| {
    ["systemd", "init", "relay", "sessionleader", "kernel"]
        .iter()
        .map(|s| s.to_string())
        .collect()
});

static DEFAULT_SYSTEM_PATH_PREFIXES: Lazy<Vec<String>> = Lazy::new(|| {
    ["/usr/lib/systemd", "/sbin/", "kernel"]
        .iter()
        .map(|s| s.to_string())
        .collect()
});

// Session plumbing names are environment-specific (the defaults are tuned
// to WSL's SessionLeader/Relay wrappers plus plain shells), hence
// configurable rather than baked in.
static DEFAULT_SESSION_MARKERS: Lazy<Vec<String>> = Lazy::new(|| {
    ["SessionLeader", "Relay", "bash"]
        .iter()
        .map(|s| s.to_string())
        .collect()
});

static DEFAULT_SELF_MARKERS: Lazy<Vec<String>> =
    Lazy::new(|| vec!["netsnoop".to_string()]);

/// String-heuristic tables used to tell apart wrapper processes,
/// system plumbing and human-meaningful programs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuleSet {
    /// Script/source-file extensions that mark a command line as a user program.
    pub script_extensions: Vec<String>,
    /// Interpreter, runtime and build-tool names (matched case-insensitively).
    pub tool_names: Vec<String>,
    /// Build/test/run keywords (matched case-insensitively).
    pub build_keywords: Vec<String>,
    /// Process-name prefixes of system wrappers to walk past (lowercased match).
    pub wrapper_prefixes: Vec<String>,
    /// Command-line prefixes of system binaries to walk past.
    pub system_path_prefixes: Vec<String>,
    /// Name substrings of session-leader/relay/shell wrappers used for
    /// ancestry correlation.
    pub session_markers: Vec<String>,
    /// Command-line substrings identifying the monitor itself.
    pub self_markers: Vec<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            script_extensions: DEFAULT_SCRIPT_EXTENSIONS.clone(),
            tool_names: DEFAULT_TOOL_NAMES.clone(),
            build_keywords: DEFAULT_BUILD_KEYWORDS.clone(),
            wrapper_prefixes: DEFAULT_WRAPPER_PREFIXES.clone(),
            system_path_prefixes: DEFAULT_SYSTEM_PATH_PREFIXES.clone(),
            session_markers: DEFAULT_SESSION_MARKERS.clone(),
            self_markers: DEFAULT_SELF_MARKERS.clone(),
        }
    }
}

/// A single scoring rule for global instigator candidates.
pub struct CandidateRule {
    pub label: &'static str,
    pub priority: u8,
    matches: fn(&RuleSet, &str) -> bool,
}

/// Ordered candidate scoring table, highest priority first. The first
/// matching rule wins; anything else scores as a plain custom binary.
pub const CANDIDATE_RULES: [CandidateRule; 3] = [
    CandidateRule {
        label: "script-or-source",
        priority: 3,
        matches: RuleSet::has_script_extension,
    },
    CandidateRule {
        label: "known-tool",
        priority: 2,
        matches: RuleSet::names_known_tool,
    },
    CandidateRule {
        label: "custom-binary",
        priority: 1,
        matches: RuleSet::is_custom_binary,
    },
];

/// Baseline score for candidates no rule claims.
pub const FALLBACK_PRIORITY: u8 = 1;

impl RuleSet {
    /// Command line references a script or source file.
    pub fn has_script_extension(&self, cmdline: &str) -> bool {
        self.script_extensions.iter().any(|ext| cmdline.contains(ext.as_str()))
    }

    /// Command line mentions a known interpreter, runtime or build tool.
    pub fn names_known_tool(&self, cmdline: &str) -> bool {
        let lower = cmdline.to_lowercase();
        self.tool_names.iter().any(|tool| lower.contains(tool.as_str()))
    }

    /// Command line contains a build/test/run keyword.
    pub fn has_build_keyword(&self, cmdline: &str) -> bool {
        let lower = cmdline.to_lowercase();
        self.build_keywords.iter().any(|kw| lower.contains(kw.as_str()))
    }

    /// Executable is not rooted under the standard system-binary directory.
    pub fn is_custom_binary(&self, cmdline: &str) -> bool {
        !cmdline.contains('/') || !cmdline.starts_with("/usr/bin/")
    }

    /// Process name marks a system wrapper (init, session plumbing, kernel
    /// threads) that cannot itself be the causal program.
    pub fn is_wrapper_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.wrapper_prefixes
            .iter()
            .any(|prefix| lower.starts_with(prefix.as_str()))
    }

    /// Command line starts from a known system binary directory.
    pub fn is_system_cmdline(&self, cmdline: &str) -> bool {
        self.system_path_prefixes
            .iter()
            .any(|prefix| cmdline.starts_with(prefix.as_str()))
    }

    /// Command line belongs to the monitor's own process.
    pub fn is_monitor_self(&self, cmdline: &str) -> bool {
        let lower = cmdline.to_lowercase();
        self.self_markers.iter().any(|marker| lower.contains(marker.as_str()))
    }

    /// Process name indicates session-leader/relay/shell plumbing.
    pub fn is_session_marker(&self, name: &str) -> bool {
        self.session_markers
            .iter()
            .any(|marker| name.contains(marker.as_str()))
    }

    /// Wrapper/system/self processes are never instigator candidates.
    pub fn should_skip(&self, name: &str, cmdline: &str) -> bool {
        self.is_wrapper_name(name)
            || self.is_system_cmdline(cmdline)
            || self.is_monitor_self(cmdline)
    }

    /// A command line a human would recognize as "the program that did this":
    /// a script/source reference, a known tool, a non-system executable
    /// location, or a build/test keyword.
    pub fn is_meaningful(&self, cmdline: &str) -> bool {
        self.has_script_extension(cmdline)
            || self.names_known_tool(cmdline)
            || self.is_custom_binary(cmdline)
            || self.has_build_keyword(cmdline)
    }

    /// Score a candidate command line through the ordered rule table.
    pub fn candidate_priority(&self, cmdline: &str) -> u8 {
        CANDIDATE_RULES
            .iter()
            .find(|rule| (rule.matches)(self, cmdline))
            .map(|rule| rule.priority)
            .unwrap_or(FALLBACK_PRIORITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("python script.py", true; "python script")]
    #[test_case("/bin/bash deploy.sh", true; "shell script")]
    #[test_case("/usr/bin/ls -la", false; "plain binary")]
    fn script_extension_rule(cmdline: &str, expected: bool) {
        assert_eq!(RuleSet::default().has_script_extension(cmdline), expected);
    }

    #[test_case("Python3 -c 'pass'", true; "case insensitive interpreter")]
    #[test_case("make -j8", true; "build tool")]
    #[test_case("/usr/bin/vi", false; "editor is not a tool")]
    fn tool_name_rule(cmdline: &str, expected: bool) {
        assert_eq!(RuleSet::default().names_known_tool(cmdline), expected);
    }

    #[test_case("./stress --cpus 8", true; "stress keyword")]
    #[test_case("cargo build --release", true; "build keyword")]
    #[test_case("/usr/bin/sleep 5", false; "no keyword")]
    fn build_keyword_rule(cmdline: &str, expected: bool) {
        assert_eq!(RuleSet::default().has_build_keyword(cmdline), expected);
    }

    #[test_case("myprog", true; "bare name")]
    #[test_case("/home/dev/bin/tool", true; "home binary")]
    #[test_case("/usr/bin/ls", false; "system binary")]
    fn custom_binary_rule(cmdline: &str, expected: bool) {
        assert_eq!(RuleSet::default().is_custom_binary(cmdline), expected);
    }

    #[test_case("systemd-udevd", true; "systemd prefix")]
    #[test_case("SessionLeader", true; "session leader lowercased")]
    #[test_case("Relay(99)", true; "relay with annotation")]
    #[test_case("python3", false; "interpreter is not a wrapper")]
    fn wrapper_name_rule(name: &str, expected: bool) {
        assert_eq!(RuleSet::default().is_wrapper_name(name), expected);
    }

    #[test]
    fn system_cmdline_rule() {
        let rules = RuleSet::default();
        assert!(rules.is_system_cmdline("/usr/lib/systemd/systemd-journald"));
        assert!(rules.is_system_cmdline("/sbin/agetty"));
        assert!(!rules.is_system_cmdline("/usr/bin/top"));
    }

    #[test]
    fn self_marker_rule() {
        let rules = RuleSet::default();
        assert!(rules.is_monitor_self("/usr/local/bin/netsnoop --debug"));
        assert!(!rules.is_monitor_self("python script.py"));
    }

    #[test]
    fn session_marker_rule_is_case_sensitive() {
        let rules = RuleSet::default();
        assert!(rules.is_session_marker("SessionLeader"));
        assert!(rules.is_session_marker("Relay(190)"));
        assert!(rules.is_session_marker("bash"));
        assert!(!rules.is_session_marker("sessionleader"));
    }

    #[test_case("python script.py", 3; "script outranks interpreter")]
    #[test_case("node server", 2; "known tool")]
    #[test_case("/opt/custom/daemon", 1; "custom binary")]
    #[test_case("/usr/bin/yes", 1; "fallback score")]
    fn candidate_priority_table(cmdline: &str, expected: u8) {
        assert_eq!(RuleSet::default().candidate_priority(cmdline), expected);
    }

    #[test]
    fn candidate_rules_are_ordered_by_priority() {
        let priorities: Vec<u8> = CANDIDATE_RULES.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn meaningful_predicate_covers_all_branches() {
        let rules = RuleSet::default();
        assert!(rules.is_meaningful("bash loop.sh"));
        assert!(rules.is_meaningful("java -jar app.jar"));
        assert!(rules.is_meaningful("/opt/tools/churn"));
        assert!(rules.is_meaningful("/usr/bin/stress --vm 4"));
        assert!(!rules.is_meaningful("/usr/bin/sleep 1"));
    }
}
