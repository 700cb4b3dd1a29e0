pub mod script;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{ComplianceError, Result};
use crate::output::console;
use crate::rules::{Rule, Violation};
use crate::vcs::{CommitRange, Vcs};
use crate::{commits, headers, licenses};

pub use script::ScriptRunner;

/// The checks, in the order the orchestrator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Headers,
    Commits,
    Licenses,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Headers, Stage::Commits, Stage::Licenses];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headers => write!(f, "License header"),
            Self::Commits => write!(f, "Commit message"),
            Self::Licenses => write!(f, "License"),
        }
    }
}

/// Everything a check needs for one run. Built fresh per run from the
/// resolved configuration and the caller's options.
pub struct CheckContext<'a> {
    pub root: &'a Path,
    pub package_dir: &'a Path,
    pub config: &'a Config,
    pub vcs: &'a dyn Vcs,
    pub commit_range: Option<&'a CommitRange>,
    /// The project has no version history to consult.
    pub unversioned: bool,
}

/// Result of running one stage.
#[derive(Debug)]
pub struct CheckOutput {
    pub stage: Stage,
    /// Captured human-readable output.
    pub output: String,
    /// Violations after policy, empty for script-based checks.
    pub violations: Vec<Violation>,
    pub failure: Option<ComplianceError>,
}

impl CheckOutput {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Runs a single stage and reports its output and status.
pub trait CheckRunner {
    fn run_check(&self, stage: Stage, ctx: &CheckContext<'_>) -> Result<CheckOutput>;
}

/// Runs the checks in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRunner;

impl NativeRunner {
    fn violations(&self, stage: Stage, ctx: &CheckContext<'_>) -> Result<Vec<Violation>> {
        let vcs = (!ctx.unversioned).then_some(ctx.vcs);
        match stage {
            Stage::Headers => headers::check(ctx.root, &ctx.config.headers, vcs),
            Stage::Commits => match vcs {
                Some(vcs) => commits::check(
                    ctx.root,
                    &ctx.config.commits,
                    &ctx.config.policy,
                    vcs,
                    ctx.commit_range,
                ),
                None => {
                    tracing::info!("unversioned repository, skipping commit validation");
                    Ok(Vec::new())
                }
            },
            Stage::Licenses => licenses::check(ctx.root, &ctx.config.licenses),
        }
    }
}

impl CheckRunner for NativeRunner {
    fn run_check(&self, stage: Stage, ctx: &CheckContext<'_>) -> Result<CheckOutput> {
        let raw = match self.violations(stage, ctx) {
            Ok(raw) => raw,
            Err(e) if e.is_content_failure() => {
                return Ok(CheckOutput {
                    stage,
                    output: format!("{e}\n"),
                    violations: Vec::new(),
                    failure: Some(e),
                });
            }
            Err(e) => return Err(e),
        };

        let violations = ctx.config.policy.apply(&raw);
        let failure = stage_failure(stage, &violations, ctx.commit_range);
        Ok(CheckOutput {
            stage,
            output: console::render_violations(&violations),
            violations,
            failure,
        })
    }
}

/// Fold a stage's error-level violations into one typed error. The kind is
/// taken from the first error; every error of the same kind is included.
pub fn stage_failure(
    stage: Stage,
    violations: &[Violation],
    range: Option<&CommitRange>,
) -> Option<ComplianceError> {
    let errors: Vec<&Violation> = violations.iter().filter(|v| v.is_error()).collect();
    let first = *errors.first()?;

    let error = match first.rule {
        Rule::DependencyLicenseMissing | Rule::ProjectLicenseMissing => {
            ComplianceError::LicenseMissing {
                dependencies: locations(
                    &errors,
                    &[Rule::DependencyLicenseMissing, Rule::ProjectLicenseMissing],
                ),
            }
        }
        Rule::UnexpectedProjectLicense => ComplianceError::UnexpectedLicense {
            files: locations(&errors, &[Rule::UnexpectedProjectLicense]),
        },
        Rule::ChecksumMismatch | Rule::ChecksumFileMissing => ComplianceError::ChecksumMismatch {
            mismatches: errors
                .iter()
                .filter(|v| matches!(v.rule, Rule::ChecksumMismatch | Rule::ChecksumFileMissing))
                .map(|v| v.message.clone())
                .collect(),
        },
        Rule::HeaderMissing => ComplianceError::HeaderMissing {
            files: locations(&errors, &[Rule::HeaderMissing]),
        },
        _ => ComplianceError::CommitSchemaViolation {
            range: range.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
            commit: first.location.clone().unwrap_or_default(),
            message: first.snippet.clone().unwrap_or_default(),
            reasons: errors
                .iter()
                .filter(|v| v.rule.stage() == Stage::Commits && v.location == first.location)
                .map(|v| v.message.clone())
                .collect(),
        },
    };

    tracing::debug!(stage = %stage, errors = errors.len(), "stage failed");
    Some(error)
}

fn locations(errors: &[&Violation], rules: &[Rule]) -> Vec<String> {
    errors
        .iter()
        .filter(|v| rules.contains(&v.rule))
        .map(|v| v.location.clone().unwrap_or_else(|| v.message.clone()))
        .collect()
}
