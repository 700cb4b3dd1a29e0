//! compliance-check — CI compliance checks for licensing and commit
//! conventions.
//!
//! Verifies that vendored dependencies and source files carry acceptable
//! license declarations, that the checksum manifest of license texts matches
//! the files on disk, and that commit messages follow conventional commits.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use compliance::{run, CheckOptions};
//!
//! let mut options = CheckOptions::default();
//! options.search_path = std::env::var_os("COMPLIANCE_SEARCH_PATH");
//! options.register_license("vendor/example.org/lib/NOTICE");
//! match run(Path::new("."), &options) {
//!     Ok(report) => println!("{} stages passed", report.stages.len()),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

pub mod commits;
pub mod config;
pub mod error;
pub mod headers;
pub mod licenses;
pub mod locator;
pub mod output;
pub mod rules;
pub mod runner;
pub mod vcs;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

use config::Config;
use error::{ComplianceError, Result};
use output::OutputFormat;
use rules::Violation;
use runner::{CheckContext, CheckRunner, NativeRunner, ScriptRunner, Stage};
use vcs::{CommitRange, GitCli, Vcs};

/// How the stages are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunnerKind {
    /// In-process checks.
    #[default]
    Native,
    /// Shell scripts from the tooling package.
    Script,
}

/// Options for one compliance run. Everything that varies per run lives
/// here; nothing is read from process-wide state.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Path to config file (defaults to `.compliance.toml` in the project).
    pub config_path: Option<PathBuf>,
    /// Search path for the tooling package.
    pub search_path: Option<OsString>,
    /// Overrides `headers.enterprise_boundary`.
    pub enterprise_boundary: Option<String>,
    /// Added to `licenses.registered`.
    pub registered_licenses: Vec<PathBuf>,
    /// Overrides `commits.range`.
    pub commit_range: Option<String>,
    /// The project has no version history.
    pub unversioned: bool,
    pub runner: RunnerKind,
    pub format: OutputFormat,
}

impl CheckOptions {
    /// Register a license file that does not follow canonical naming.
    pub fn register_license(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.registered_licenses.push(path.into());
        self
    }
}

/// Output of one passing stage.
#[derive(Debug, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub output: String,
    /// Warnings that did not fail the stage.
    pub violations: Vec<Violation>,
}

/// Report of a run in which every stage passed.
#[derive(Debug, Serialize)]
pub struct ComplianceReport {
    pub root: PathBuf,
    pub package_dir: PathBuf,
    pub stages: Vec<StageReport>,
}

/// Run every stage with the runner selected in `options`, using `git` for
/// version history.
pub fn run(root: &Path, options: &CheckOptions) -> Result<ComplianceReport> {
    let vcs = GitCli;
    match options.runner {
        RunnerKind::Native => run_with(root, options, &NativeRunner, &vcs),
        RunnerKind::Script => run_with(root, options, &ScriptRunner::default(), &vcs),
    }
}

/// Locate the tooling package, resolve configuration, then run headers,
/// commits and licenses in that order. The first failing stage ends the run.
pub fn run_with(
    root: &Path,
    options: &CheckOptions,
    runner: &dyn CheckRunner,
    vcs: &dyn Vcs,
) -> Result<ComplianceReport> {
    let root = std::fs::canonicalize(root)?;
    let root = root.as_path();
    let explicit = options.config_path.as_deref();

    // The tooling section must come from the project side: the package
    // cannot tell us where to find itself.
    let project_config = Config::resolve(explicit, root, None)?;
    let package_dir = locator::locate(
        root,
        &project_config.tooling.vendor_dir,
        &project_config.tooling.package,
        options.search_path.as_deref(),
    )?;

    let mut config = Config::resolve(explicit, root, Some(&package_dir))?;
    if let Some(boundary) = &options.enterprise_boundary {
        config.headers.enterprise_boundary = Some(boundary.clone());
    }
    config
        .licenses
        .registered
        .extend(options.registered_licenses.iter().cloned());

    let commit_range = options
        .commit_range
        .as_deref()
        .or(config.commits.range.as_deref())
        .map(CommitRange::parse)
        .transpose()?;

    let ctx = CheckContext {
        root,
        package_dir: &package_dir,
        config: &config,
        vcs,
        commit_range: commit_range.as_ref(),
        unversioned: options.unversioned,
    };

    let mut stages = Vec::new();
    for stage in Stage::ORDER {
        tracing::info!(stage = %stage, "running check");
        let out = runner
            .run_check(stage, &ctx)
            .map_err(|e| ComplianceError::StageFailed {
                stage,
                output: String::new(),
                source: Box::new(e),
            })?;

        if let Some(failure) = out.failure {
            tracing::info!(stage = %stage, "check failed");
            return Err(ComplianceError::StageFailed {
                stage,
                output: out.output,
                source: Box::new(failure),
            });
        }

        stages.push(StageReport {
            stage,
            output: out.output,
            violations: out.violations,
        });
    }

    Ok(ComplianceReport {
        root: root.to_path_buf(),
        package_dir,
        stages,
    })
}

/// Render a report in the specified format.
pub fn render_report(report: &ComplianceReport, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}
