//! License header scanner for the project's own source files.
//!
//! Every tracked file with a listed extension must match all header
//! patterns within its first lines. With an enterprise boundary set, files
//! absent from the tree just before the boundary commit are exempt.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use regex::Regex;

use crate::config::HeaderConfig;
use crate::error::Result;
use crate::rules::{Rule, Violation};
use crate::vcs::Vcs;

pub struct HeaderScanner {
    extensions: HashSet<String>,
    exclude: Vec<Pattern>,
    patterns: Vec<Regex>,
    max_lines: usize,
}

impl HeaderScanner {
    pub fn new(config: &HeaderConfig) -> Result<Self> {
        Ok(Self {
            extensions: config.extensions.iter().map(|e| e.to_lowercase()).collect(),
            exclude: config
                .exclude
                .iter()
                .map(|p| Pattern::new(p))
                .collect::<std::result::Result<_, _>>()?,
            patterns: config
                .patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<std::result::Result<_, _>>()?,
            max_lines: config.max_lines,
        })
    }

    /// Whether `rel` (relative to the project root) must carry a header.
    pub fn applies_to(&self, rel: &Path) -> bool {
        let ext = rel
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.extensions.contains(&ext) && !self.exclude.iter().any(|p| p.matches_path(rel))
    }

    /// Whether `content` carries the header within the first lines.
    pub fn has_header(&self, content: &str) -> bool {
        let head: String = content
            .lines()
            .take(self.max_lines)
            .collect::<Vec<_>>()
            .join("\n");
        self.patterns.iter().all(|re| re.is_match(&head))
    }

    /// Check `files` (relative to `root`), skipping those in `exempt`.
    pub fn scan(
        &self,
        root: &Path,
        files: &[PathBuf],
        exempt: &dyn Fn(&Path) -> bool,
    ) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        for rel in files {
            if !self.applies_to(rel) {
                continue;
            }
            if exempt(rel) {
                tracing::debug!(file = %rel.display(), "introduced after enterprise boundary, exempt");
                continue;
            }
            let path = root.join(rel);
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(file = %rel.display(), "tracked file missing from worktree");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !self.has_header(&String::from_utf8_lossy(&bytes)) {
                let location = rel.display().to_string();
                violations.push(
                    Violation::new(
                        Rule::HeaderMissing,
                        format!("{location} has no license header"),
                    )
                    .at(location),
                );
            }
        }

        Ok(violations)
    }
}

/// Scan the project's source files.
///
/// `vcs` is `None` for an unversioned tree: files are then discovered with a
/// `.gitignore`-aware walk and the enterprise boundary cannot apply.
pub fn check(root: &Path, config: &HeaderConfig, vcs: Option<&dyn Vcs>) -> Result<Vec<Violation>> {
    let scanner = HeaderScanner::new(config)?;

    let files = match vcs {
        Some(vcs) => vcs.tracked_files(root)?,
        None => walk_files(root),
    };

    let before = match (&config.enterprise_boundary, vcs) {
        (Some(boundary), Some(vcs)) => {
            tracing::info!(boundary = %boundary, "applying enterprise boundary");
            Some(vcs.files_before(root, boundary)?)
        }
        (Some(boundary), None) => {
            tracing::warn!(boundary = %boundary, "enterprise boundary ignored for unversioned tree");
            None
        }
        (None, _) => None,
    };

    let exempt = |rel: &Path| before.as_ref().is_some_and(|set| !set.contains(rel));
    scanner.scan(root, &files, &exempt)
}

fn walk_files(root: &Path) -> Vec<PathBuf> {
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .build();

    let mut files: Vec<PathBuf> = walker
        .flatten()
        .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}
