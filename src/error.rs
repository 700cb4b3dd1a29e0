use std::path::PathBuf;

use thiserror::Error;

use crate::runner::Stage;

pub type Result<T> = std::result::Result<T, ComplianceError>;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("Tooling package '{package}' not found (searched: {})", display_paths(.searched))]
    PathNotFound {
        package: String,
        searched: Vec<PathBuf>,
    },

    #[error("{} dependencies lack a license: {}", .dependencies.len(), .dependencies.join(", "))]
    LicenseMissing { dependencies: Vec<String> },

    #[error("Unexpected license files at project root: {}", .files.join(", "))]
    UnexpectedLicense { files: Vec<String> },

    #[error("License checksum mismatch: {}", .mismatches.join("; "))]
    ChecksumMismatch { mismatches: Vec<String> },

    #[error("Malformed checksum manifest line {line_no} in {}: '{line}'", .manifest.display())]
    ManifestMalformed {
        manifest: PathBuf,
        line_no: usize,
        line: String,
    },

    #[error("{} source files lack a license header: {}", .files.len(), .files.join(", "))]
    HeaderMissing { files: Vec<String> },

    #[error("Commit {commit} in range {range} violates the commit schema ({}):\n{message}", .reasons.join("; "))]
    CommitSchemaViolation {
        range: String,
        commit: String,
        message: String,
        reasons: Vec<String>,
    },

    #[error("{stage} check failed: {source}")]
    StageFailed {
        stage: Stage,
        output: String,
        #[source]
        source: Box<ComplianceError>,
    },

    #[error("Script {} exited with {status}", .script.display())]
    ScriptFailed { script: PathBuf, status: String },

    #[error("git {args} failed: {message}")]
    Git { args: String, message: String },

    #[error("Invalid commit range '{0}' (expected <from>..<to>)")]
    InvalidRange(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),
}

impl ComplianceError {
    /// Whether this error reports non-compliant content rather than a
    /// failure to run the checks at all.
    pub fn is_content_failure(&self) -> bool {
        match self {
            Self::LicenseMissing { .. }
            | Self::UnexpectedLicense { .. }
            | Self::ChecksumMismatch { .. }
            | Self::ManifestMalformed { .. }
            | Self::HeaderMissing { .. }
            | Self::CommitSchemaViolation { .. }
            | Self::ScriptFailed { .. } => true,
            Self::StageFailed { source, .. } => source.is_content_failure(),
            _ => false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PathNotFound { .. } => 3,
            e if e.is_content_failure() => 1,
            _ => 2,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".into();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
