// src/vcs/git.rs

//! Scraping branch, revision and modification data from git
//!
//! Only the output of a handful of git commands is interpreted. Each query
//! goes through the [`VcsQuery`] trait so the probing logic can be driven by
//! canned output in tests.

use super::VcsInfo;
use crate::tool::{ToolInvocation, ToolRunner};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Source of raw VCS command output
pub trait VcsQuery {
    /// Run a VCS subcommand, returning its stdout when it exits cleanly
    fn query(&self, args: &[&str]) -> Option<String>;
}

/// [`VcsQuery`] backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    repo_dir: PathBuf,
    runner: ToolRunner,
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>, repo_dir: &Path) -> Self {
        Self {
            program: program.into(),
            repo_dir: repo_dir.to_path_buf(),
            runner: ToolRunner::new(),
        }
    }

    pub fn with_runner(mut self, runner: ToolRunner) -> Self {
        self.runner = runner;
        self
    }
}

impl VcsQuery for GitCli {
    fn query(&self, args: &[&str]) -> Option<String> {
        let invocation = ToolInvocation::new(&self.program)
            .args(args)
            .current_dir(&self.repo_dir);
        match self.runner.run(&invocation) {
            Ok(output) if output.success() => Some(output.stdout),
            Ok(output) => {
                debug!("{} returned {}", invocation, output.status_display());
                None
            }
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

/// One way of working out the current branch name
#[derive(Clone, Copy)]
pub struct BranchStrategy {
    pub name: &'static str,
    pub detect: fn(&dyn VcsQuery) -> Option<String>,
}

impl std::fmt::Debug for BranchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchStrategy").field("name", &self.name).finish()
    }
}

/// Branch detection strategies, in priority order
pub const DEFAULT_BRANCH_STRATEGIES: [BranchStrategy; 3] = [
    BranchStrategy {
        name: "show-current",
        detect: show_current_branch,
    },
    BranchStrategy {
        name: "remote-contains",
        detect: remote_containing_branch,
    },
    BranchStrategy {
        name: "starred-branch",
        detect: starred_branch,
    },
];

static REMOTE_BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^/]*/([^ ]+)").expect("remote branch pattern is valid")
});

fn first_non_empty_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Named branch: `git branch --show-current`
///
/// Prints nothing when HEAD is detached.
pub fn show_current_branch(vcs: &dyn VcsQuery) -> Option<String> {
    let output = vcs.query(&["branch", "--show-current"])?;
    first_non_empty_line(&output)
}

/// Detached HEAD that is still reachable from a remote branch
pub fn remote_containing_branch(vcs: &dyn VcsQuery) -> Option<String> {
    let output = vcs.query(&["branch", "--remote", "--verbose", "--no-abbrev", "--contains"])?;
    output.lines().find_map(|line| {
        REMOTE_BRANCH_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Last resort: the starred line of `git branch`
pub fn starred_branch(vcs: &dyn VcsQuery) -> Option<String> {
    let output = vcs.query(&["branch"])?;
    output
        .lines()
        .find_map(|line| line.strip_prefix("* "))
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
}

/// Extract the commit distance from `git describe --tags` output
///
/// `v4.0.6-85-gf253d3f9d` yields `85`. Anything that does not split into
/// exactly three `-` separated parts yields `None`.
pub fn parse_describe_distance(describe: &str) -> Option<&str> {
    let parts: Vec<&str> = describe.trim().split('-').collect();
    if parts.len() == 3 {
        Some(parts[1])
    } else {
        None
    }
}

/// Count modified, added and deleted tracked files in `git status` output
pub fn count_local_modifications(status: &str) -> u64 {
    status
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("modified:") || l.starts_with("new file:") || l.starts_with("deleted:"))
        .count() as u64
}

/// Collects a [`VcsInfo`] from a [`VcsQuery`]
pub struct VcsProbe<'a> {
    vcs: &'a dyn VcsQuery,
    primary_branch: String,
    strategies: Vec<BranchStrategy>,
}

impl<'a> VcsProbe<'a> {
    pub fn new(vcs: &'a dyn VcsQuery, primary_branch: &str) -> Self {
        Self {
            vcs,
            primary_branch: primary_branch.to_string(),
            strategies: DEFAULT_BRANCH_STRATEGIES.to_vec(),
        }
    }

    /// Replace the branch detection chain
    pub fn with_strategies(mut self, strategies: Vec<BranchStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Run the strategy chain, stopping at the first answer
    pub fn detect_branch(&self) -> Option<String> {
        for strategy in &self.strategies {
            if let Some(branch) = (strategy.detect)(self.vcs) {
                debug!("Branch '{}' detected by {}", branch, strategy.name);
                return Some(branch);
            }
            debug!("Branch strategy {} found nothing", strategy.name);
        }
        None
    }

    /// Revision number for the given branch
    ///
    /// The primary branch counts first-parent commits; any other branch uses
    /// the distance from the most recent tag.
    pub fn revision(&self, branch: Option<&str>) -> Option<u64> {
        let raw = if branch == Some(self.primary_branch.as_str()) {
            self.vcs
                .query(&["rev-list", "--count", "HEAD", "--first-parent"])
                .and_then(|out| first_non_empty_line(&out))
        } else {
            self.vcs
                .query(&["describe", "--always", "--tags"])
                .and_then(|out| first_non_empty_line(&out))
                .and_then(|line| parse_describe_distance(&line).map(str::to_string))
        };
        let raw = raw?;

        match raw.trim().parse::<u64>() {
            Ok(rev) => Some(rev),
            Err(_) => {
                warn!("Invalid revision number {:?}", raw);
                None
            }
        }
    }

    /// Number of locally modified tracked files, `None` if status failed
    pub fn local_modifications(&self) -> Option<u64> {
        self.vcs
            .query(&["status"])
            .map(|out| count_local_modifications(&out))
    }

    /// Gather everything that can be determined
    ///
    /// Fields that cannot be worked out are left empty; this never fails.
    pub fn collect(&self) -> VcsInfo {
        let mut info = VcsInfo::default();

        info.branch = self.detect_branch();
        if info.branch.is_none() {
            warn!("Could not get branch information");
        }

        info.revision = self.revision(info.branch.as_deref());
        if info.revision.is_none() {
            warn!("Could not determine revision number");
        }

        match self.local_modifications() {
            Some(0) => {}
            Some(count) => info.local_modifications = Some(count),
            None => warn!("Could not count local modifications"),
        }

        info
    }
}
