use std::path::{Path, PathBuf};
use std::process::Command;

use super::{CheckContext, CheckOutput, CheckRunner, Stage};
use crate::error::{ComplianceError, Result};

pub const ENV_COMMIT_RANGE: &str = "COMPLIANCE_COMMIT_RANGE";
pub const ENV_UNVERSIONED: &str = "COMPLIANCE_UNVERSIONED";
pub const ENV_ENTERPRISE_BOUNDARY: &str = "COMPLIANCE_ENTERPRISE_BOUNDARY";
pub const ENV_REGISTERED_LICENSES: &str = "COMPLIANCE_REGISTERED_LICENSES";

/// Runs the shell scripts shipped in the tooling package's `scripts/`
/// directory. A non-zero exit fails the stage with the combined output.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    pub scripts_dir: PathBuf,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("scripts"),
        }
    }
}

impl ScriptRunner {
    pub fn script_name(stage: Stage) -> &'static str {
        match stage {
            Stage::Headers => "check_license_headers.sh",
            Stage::Commits => "check_commits.sh",
            Stage::Licenses => "check_licenses.sh",
        }
    }

    fn script_path(&self, package_dir: &Path, stage: Stage) -> PathBuf {
        package_dir
            .join(&self.scripts_dir)
            .join(Self::script_name(stage))
    }
}

impl CheckRunner for ScriptRunner {
    fn run_check(&self, stage: Stage, ctx: &CheckContext<'_>) -> Result<CheckOutput> {
        let script = self.script_path(ctx.package_dir, stage);
        if !script.is_file() {
            return Err(ComplianceError::Config(format!(
                "check script {} not found",
                script.display()
            )));
        }

        let mut cmd = Command::new("sh");
        cmd.arg(&script).current_dir(ctx.root);
        for var in [
            ENV_COMMIT_RANGE,
            ENV_UNVERSIONED,
            ENV_ENTERPRISE_BOUNDARY,
            ENV_REGISTERED_LICENSES,
        ] {
            cmd.env_remove(var);
        }
        if let Some(range) = ctx.commit_range {
            cmd.env(ENV_COMMIT_RANGE, range.to_string());
        }
        if ctx.unversioned {
            cmd.env(ENV_UNVERSIONED, "1");
        }
        if let Some(boundary) = &ctx.config.headers.enterprise_boundary {
            cmd.env(ENV_ENTERPRISE_BOUNDARY, boundary);
        }
        if !ctx.config.licenses.registered.is_empty() {
            let joined = std::env::join_paths(&ctx.config.licenses.registered)
                .map_err(|e| ComplianceError::Config(e.to_string()))?;
            cmd.env(ENV_REGISTERED_LICENSES, joined);
        }

        tracing::info!(stage = %stage, script = %script.display(), "running check script");
        let out = cmd.output()?;

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));

        let failure = (!out.status.success()).then(|| ComplianceError::ScriptFailed {
            script: script.clone(),
            status: out.status.to_string(),
        });

        Ok(CheckOutput {
            stage,
            output,
            violations: Vec::new(),
            failure,
        })
    }
}
