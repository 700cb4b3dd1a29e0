pub mod policy;

use serde::{Deserialize, Serialize};

use crate::runner::Stage;

pub use policy::{Policy, PolicyVerdict};

/// Every rule the native checks can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    #[serde(rename = "LIC-001")]
    DependencyLicenseMissing,
    #[serde(rename = "LIC-002")]
    UnexpectedProjectLicense,
    #[serde(rename = "LIC-003")]
    ProjectLicenseMissing,
    #[serde(rename = "LIC-004")]
    ChecksumMismatch,
    #[serde(rename = "LIC-005")]
    ChecksumFileMissing,
    #[serde(rename = "HDR-001")]
    HeaderMissing,
    #[serde(rename = "COM-001")]
    HeaderGrammar,
    #[serde(rename = "COM-002")]
    UnknownType,
    #[serde(rename = "COM-003")]
    EmptySubject,
    #[serde(rename = "COM-004")]
    SubjectFullStop,
    #[serde(rename = "COM-005")]
    HeaderTooLong,
    #[serde(rename = "COM-006")]
    BodyLeadingBlank,
    #[serde(rename = "COM-007")]
    BreakingChangeEmpty,
    #[serde(rename = "COM-008")]
    SignOffMissing,
    #[serde(rename = "COM-009")]
    CherryPickNotLast,
    #[serde(rename = "COM-010")]
    BodyLineTooLong,
    #[serde(rename = "COM-011")]
    SubjectCase,
}

impl Rule {
    pub const ALL: [Rule; 17] = [
        Rule::DependencyLicenseMissing,
        Rule::UnexpectedProjectLicense,
        Rule::ProjectLicenseMissing,
        Rule::ChecksumMismatch,
        Rule::ChecksumFileMissing,
        Rule::HeaderMissing,
        Rule::HeaderGrammar,
        Rule::UnknownType,
        Rule::EmptySubject,
        Rule::SubjectFullStop,
        Rule::HeaderTooLong,
        Rule::BodyLeadingBlank,
        Rule::BreakingChangeEmpty,
        Rule::SignOffMissing,
        Rule::CherryPickNotLast,
        Rule::BodyLineTooLong,
        Rule::SubjectCase,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::DependencyLicenseMissing => "LIC-001",
            Self::UnexpectedProjectLicense => "LIC-002",
            Self::ProjectLicenseMissing => "LIC-003",
            Self::ChecksumMismatch => "LIC-004",
            Self::ChecksumFileMissing => "LIC-005",
            Self::HeaderMissing => "HDR-001",
            Self::HeaderGrammar => "COM-001",
            Self::UnknownType => "COM-002",
            Self::EmptySubject => "COM-003",
            Self::SubjectFullStop => "COM-004",
            Self::HeaderTooLong => "COM-005",
            Self::BodyLeadingBlank => "COM-006",
            Self::BreakingChangeEmpty => "COM-007",
            Self::SignOffMissing => "COM-008",
            Self::CherryPickNotLast => "COM-009",
            Self::BodyLineTooLong => "COM-010",
            Self::SubjectCase => "COM-011",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DependencyLicenseMissing => "Dependency License Missing",
            Self::UnexpectedProjectLicense => "Unexpected Project License",
            Self::ProjectLicenseMissing => "Project License Missing",
            Self::ChecksumMismatch => "License Checksum Mismatch",
            Self::ChecksumFileMissing => "Checksummed File Missing",
            Self::HeaderMissing => "License Header Missing",
            Self::HeaderGrammar => "Commit Header Grammar",
            Self::UnknownType => "Unknown Commit Type",
            Self::EmptySubject => "Empty Commit Subject",
            Self::SubjectFullStop => "Subject Full Stop",
            Self::HeaderTooLong => "Commit Header Too Long",
            Self::BodyLeadingBlank => "Body Leading Blank",
            Self::BreakingChangeEmpty => "Empty Breaking Change",
            Self::SignOffMissing => "Sign-off Missing",
            Self::CherryPickNotLast => "Cherry-pick Line Not Last",
            Self::BodyLineTooLong => "Body Line Too Long",
            Self::SubjectCase => "Subject Case",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::DependencyLicenseMissing => {
                "Vendored dependency has no license file, registration or manifest entry"
            }
            Self::UnexpectedProjectLicense => "Extra license-like file at the project root",
            Self::ProjectLicenseMissing => "Project root lacks its license file",
            Self::ChecksumMismatch => "Manifest digest differs from the file on disk",
            Self::ChecksumFileMissing => "File listed in the checksum manifest does not exist",
            Self::HeaderMissing => "Source file lacks the license header near the top",
            Self::HeaderGrammar => "Commit header does not match type(scope): subject",
            Self::UnknownType => "Commit type is not in the allowed vocabulary",
            Self::EmptySubject => "Commit subject is empty",
            Self::SubjectFullStop => "Commit subject ends with a full stop",
            Self::HeaderTooLong => "Commit header exceeds 100 characters",
            Self::BodyLeadingBlank => "Commit body is not separated from the header by a blank line",
            Self::BreakingChangeEmpty => "BREAKING CHANGE footer has no description",
            Self::SignOffMissing => "Commit message lacks a Signed-off-by trailer",
            Self::CherryPickNotLast => "Cherry-pick marker is not the last line of the message",
            Self::BodyLineTooLong => "Commit body line exceeds the maximum length",
            Self::SubjectCase => "Commit subject is neither lower-case nor sentence-case",
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            Self::BodyLineTooLong | Self::SubjectCase => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn stage(self) -> Stage {
        match self {
            Self::DependencyLicenseMissing
            | Self::UnexpectedProjectLicense
            | Self::ProjectLicenseMissing
            | Self::ChecksumMismatch
            | Self::ChecksumFileMissing => Stage::Licenses,
            Self::HeaderMissing => Stage::Headers,
            _ => Stage::Commits,
        }
    }

    pub fn metadata(self) -> RuleMetadata {
        RuleMetadata {
            id: self.id().into(),
            name: self.name().into(),
            description: self.description().into(),
            default_severity: self.default_severity(),
            stage: self.stage(),
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single policy violation produced by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: Rule,
    pub severity: Severity,
    pub message: String,
    /// File path, dependency directory or commit id.
    pub location: Option<String>,
    /// Offending text, e.g. the full commit message.
    pub snippet: Option<String>,
}

impl Violation {
    pub fn new(rule: Rule, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: rule.default_severity(),
            message: message.into(),
            location: None,
            snippet: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Metadata about a rule, used for `list-rules` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub default_severity: Severity,
    pub stage: Stage,
}

/// List metadata for all rules.
pub fn list_rules() -> Vec<RuleMetadata> {
    Rule::ALL.iter().map(|r| r.metadata()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_ids_are_unique() {
        let ids: std::collections::HashSet<&str> = Rule::ALL.iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), Rule::ALL.len());
    }

    #[test]
    fn rule_serializes_as_id() {
        let json = serde_json::to_string(&Rule::HeaderMissing).unwrap();
        assert_eq!(json, "\"HDR-001\"");
    }

    #[test]
    fn only_style_rules_default_to_warning() {
        let warnings: Vec<Rule> = Rule::ALL
            .iter()
            .copied()
            .filter(|r| r.default_severity() == Severity::Warning)
            .collect();
        assert_eq!(warnings, vec![Rule::BodyLineTooLong, Rule::SubjectCase]);
    }
}
