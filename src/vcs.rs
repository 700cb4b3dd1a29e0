//! Version-control access used by the header scanner and the commit
//! validator. `GitCli` shells out to `git`; tests substitute their own `Vcs`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, Result};

/// A commit and its raw message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub message: String,
}

impl Commit {
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(12)]
    }
}

/// A `<from>..<to>` revision range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRange {
    pub from: String,
    pub to: String,
}

impl CommitRange {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.contains("...") {
            return Err(ComplianceError::InvalidRange(s.to_string()));
        }
        match s.split_once("..") {
            Some((from, to)) if !from.is_empty() => Ok(Self {
                from: from.to_string(),
                to: if to.is_empty() { "HEAD".into() } else { to.to_string() },
            }),
            _ => Err(ComplianceError::InvalidRange(s.to_string())),
        }
    }
}

impl std::fmt::Display for CommitRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

pub trait Vcs {
    /// Files tracked at the working tree, relative to `root`.
    fn tracked_files(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// Files that already existed before `rev`, i.e. in the tree of its
    /// first parent. Empty when `rev` is a root commit.
    fn files_before(&self, root: &Path, rev: &str) -> Result<HashSet<PathBuf>>;

    /// Non-merge commits in `range`, oldest first.
    fn commits(&self, root: &Path, range: &CommitRange) -> Result<Vec<Commit>>;
}

/// `Vcs` backed by the `git` executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    fn git(&self, root: &Path, args: &[&str]) -> Result<String> {
        tracing::debug!(args = ?args, "running git");
        let output = Command::new("git").current_dir(root).args(args).output()?;
        if !output.status.success() {
            return Err(ComplianceError::Git {
                args: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn has_parent(&self, root: &Path, rev: &str) -> bool {
        Command::new("git")
            .current_dir(root)
            .args(["rev-parse", "--verify", "--quiet", &format!("{rev}^")])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

const RECORD_SEP: char = '\u{1e}';
const FIELD_SEP: char = '\u{1f}';

impl Vcs for GitCli {
    fn tracked_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let out = self.git(root, &["ls-files", "-z"])?;
        Ok(out
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn files_before(&self, root: &Path, rev: &str) -> Result<HashSet<PathBuf>> {
        // Fail loudly on a bad revision rather than exempting everything.
        self.git(root, &["rev-parse", "--verify", &format!("{rev}^{{commit}}")])?;
        if !self.has_parent(root, rev) {
            return Ok(HashSet::new());
        }
        let parent = format!("{rev}^");
        let out = self.git(root, &["ls-tree", "-r", "-z", "--name-only", &parent])?;
        Ok(out
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn commits(&self, root: &Path, range: &CommitRange) -> Result<Vec<Commit>> {
        let format = format!("--format=%H{FIELD_SEP}%B{RECORD_SEP}");
        let range = range.to_string();
        let out = self.git(root, &["log", "--no-merges", "--reverse", &format, &range])?;
        Ok(parse_log(&out))
    }
}

fn parse_log(out: &str) -> Vec<Commit> {
    out.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            let (id, message) = record.split_once(FIELD_SEP)?;
            Some(Commit {
                id: id.trim().to_string(),
                message: message.trim_end().to_string(),
            })
        })
        .collect()
}
