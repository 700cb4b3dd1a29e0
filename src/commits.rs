//! Conventional-commit validation.
//!
//! Header grammar is `type(scope)!: subject` with an optional scope and an
//! optional `!`. Bodies must be separated by a blank line; a
//! `BREAKING CHANGE:` footer must carry a description.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::CommitConfig;
use crate::error::Result;
use crate::rules::{Policy, Rule, Violation};
use crate::vcs::{Commit, CommitRange, Vcs};

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<type>\w+)(?:\((?P<scope>[^()\r\n]*)\))?(?P<breaking>!)?:(?P<subject>.*)$")
        .unwrap()
});

static SIGNED_OFF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Signed-off-by:\s.+\s<[^<>]+>$").unwrap());

static CHERRY_PICK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(cherry picked from commit [0-9a-f]{7,40}\)$").unwrap());

const BREAKING_MARKERS: [&str; 2] = ["BREAKING CHANGE:", "BREAKING-CHANGE:"];

const IGNORED_PREFIXES: [&str; 5] = ["Merge ", "Revert \"", "fixup!", "squash!", "amend!"];

/// Headers produced by git tooling rather than written by hand.
pub fn is_ignored(message: &str) -> bool {
    let header = message.lines().next().unwrap_or("");
    IGNORED_PREFIXES.iter().any(|p| header.starts_with(p))
}

pub struct CommitLinter<'a> {
    config: &'a CommitConfig,
}

impl<'a> CommitLinter<'a> {
    pub fn new(config: &'a CommitConfig) -> Self {
        Self { config }
    }

    /// Lint one message. Violations carry no location.
    pub fn lint(&self, message: &str) -> Vec<Violation> {
        let message = message.trim_end();
        if is_ignored(message) {
            return Vec::new();
        }

        let lines: Vec<&str> = message.lines().map(str::trim_end).collect();
        let header = lines.first().copied().unwrap_or("");
        let mut violations = self.lint_header(header);

        if lines.len() > 1 && !lines[1].trim().is_empty() {
            violations.push(Violation::new(
                Rule::BodyLeadingBlank,
                "body must be separated from the header by a blank line",
            ));
        }

        for (idx, line) in lines.iter().enumerate().skip(1) {
            let len = line.chars().count();
            if len > self.config.max_body_line_length {
                violations.push(Violation::new(
                    Rule::BodyLineTooLong,
                    format!(
                        "line {} is {} characters long (max {})",
                        idx + 1,
                        len,
                        self.config.max_body_line_length
                    ),
                ));
            }

            if let Some(rest) = BREAKING_MARKERS.iter().find_map(|m| line.strip_prefix(m)) {
                let continued = lines.get(idx + 1).is_some_and(|l| !l.trim().is_empty());
                if rest.trim().is_empty() && !continued {
                    violations.push(Violation::new(
                        Rule::BreakingChangeEmpty,
                        "BREAKING CHANGE footer needs a description",
                    ));
                }
            }
        }

        if self.config.require_sign_off && !lines.iter().any(|l| SIGNED_OFF_RE.is_match(l.trim())) {
            violations.push(Violation::new(
                Rule::SignOffMissing,
                "Signed-off-by: is missing in the commit message",
            ));
        }

        if let Some(idx) = lines.iter().position(|l| CHERRY_PICK_RE.is_match(l.trim())) {
            if idx != lines.len() - 1 {
                violations.push(Violation::new(
                    Rule::CherryPickNotLast,
                    "cherry-pick line must be the last one in the commit message",
                ));
            }
        }

        violations
    }

    fn lint_header(&self, header: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        let len = header.chars().count();
        if len > self.config.max_header_length {
            violations.push(Violation::new(
                Rule::HeaderTooLong,
                format!(
                    "header is {} characters long (max {})",
                    len, self.config.max_header_length
                ),
            ));
        }

        let Some(caps) = HEADER_RE.captures(header) else {
            violations.push(
                Violation::new(
                    Rule::HeaderGrammar,
                    "header must look like 'type(scope): subject'",
                )
                .with_snippet(header),
            );
            return violations;
        };

        if caps.name("scope").is_some_and(|s| s.as_str().trim().is_empty()) {
            violations.push(Violation::new(
                Rule::HeaderGrammar,
                "scope must not be empty when parentheses are given",
            ));
        }

        let kind = &caps["type"];
        if !self.config.types.iter().any(|t| t == kind) {
            violations.push(Violation::new(
                Rule::UnknownType,
                format!(
                    "type '{}' must be one of: {}",
                    kind,
                    self.config.types.join(", ")
                ),
            ));
        }

        let raw_subject = &caps["subject"];
        let subject = raw_subject.trim();
        if subject.is_empty() {
            violations.push(Violation::new(Rule::EmptySubject, "subject may not be empty"));
            return violations;
        }
        if !raw_subject.starts_with(' ') {
            violations.push(Violation::new(
                Rule::HeaderGrammar,
                "a space must follow the colon",
            ));
        }
        if subject.ends_with('.') {
            violations.push(Violation::new(
                Rule::SubjectFullStop,
                "subject may not end with a full stop",
            ));
        }
        if !is_lower_or_sentence_case(subject) {
            violations.push(Violation::new(
                Rule::SubjectCase,
                format!("subject '{subject}' should be lower-case or sentence-case"),
            ));
        }

        violations
    }
}

fn is_lower_or_sentence_case(subject: &str) -> bool {
    if subject == subject.to_lowercase() {
        return true;
    }
    let mut chars = subject.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            let rest = chars.as_str();
            rest == rest.to_lowercase()
        }
        _ => false,
    }
}

/// Lint `commits` in order and stop after the first commit that fails under
/// `policy`. Violations are located at the commit's short id and carry the
/// full message as snippet.
pub fn validate(commits: &[Commit], config: &CommitConfig, policy: &Policy) -> Vec<Violation> {
    let linter = CommitLinter::new(config);
    let mut violations = Vec::new();

    for commit in commits {
        let found: Vec<Violation> = linter
            .lint(&commit.message)
            .into_iter()
            .map(|v| v.at(commit.short_id()).with_snippet(commit.message.clone()))
            .collect();
        let failed = !policy.evaluate(&found).pass;
        tracing::debug!(commit = %commit.short_id(), violations = found.len(), failed, "linted commit");
        violations.extend(found);
        if failed {
            break;
        }
    }

    violations
}

/// Validate every commit in `range`. No range means nothing to check.
pub fn check(
    root: &Path,
    config: &CommitConfig,
    policy: &Policy,
    vcs: &dyn Vcs,
    range: Option<&CommitRange>,
) -> Result<Vec<Violation>> {
    let Some(range) = range else {
        tracing::info!("no commit range configured, skipping commit validation");
        return Ok(Vec::new());
    };
    let commits = vcs.commits(root, range)?;
    tracing::info!(range = %range, commits = commits.len(), "validating commit messages");
    Ok(validate(&commits, config, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;

    fn lint(message: &str) -> Vec<Rule> {
        let config = CommitConfig::default();
        CommitLinter::new(&config)
            .lint(message)
            .into_iter()
            .map(|v| v.rule)
            .collect()
    }

    fn commit(id: &str, message: &str) -> Commit {
        Commit {
            id: id.into(),
            message: message.into(),
        }
    }

    #[test]
    fn conventional_header_passes() {
        assert!(lint("feat(app): New feature added").is_empty());
        assert!(lint("fix: handle empty input").is_empty());
        assert!(lint("refactor(core)!: drop legacy api").is_empty());
    }

    #[test]
    fn missing_verb_fails() {
        assert_eq!(lint("Missing commit verb"), vec![Rule::HeaderGrammar]);
    }

    #[test]
    fn unknown_type_fails() {
        assert_eq!(lint("feature(app): add thing"), vec![Rule::UnknownType]);
    }

    #[test]
    fn empty_subject_and_scope_fail() {
        assert_eq!(lint("fix(app):"), vec![Rule::EmptySubject]);
        assert_eq!(lint("fix(): repair"), vec![Rule::HeaderGrammar]);
        assert_eq!(lint("fix:repair"), vec![Rule::HeaderGrammar]);
    }

    #[test]
    fn full_stop_and_length() {
        assert_eq!(lint("docs: update readme."), vec![Rule::SubjectFullStop]);
        let long = format!("docs: {}", "a".repeat(100));
        assert_eq!(lint(&long), vec![Rule::HeaderTooLong]);
    }

    #[test]
    fn subject_case_is_a_warning() {
        let config = CommitConfig::default();
        let violations = CommitLinter::new(&config).lint("feat: Add New Thing");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::SubjectCase);
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn body_needs_leading_blank() {
        assert_eq!(
            lint("fix: repair\nthe body follows directly"),
            vec![Rule::BodyLeadingBlank]
        );
        assert!(lint("fix: repair\n\nthe body follows a blank").is_empty());
    }

    #[test]
    fn long_body_line_warns() {
        let message = format!("fix: repair\n\n{}", "x".repeat(101));
        assert_eq!(lint(&message), vec![Rule::BodyLineTooLong]);
    }

    #[test]
    fn breaking_change_footer() {
        assert!(lint("feat(api): new endpoint\n\nBREAKING CHANGE: removes /v1").is_empty());
        assert!(lint("feat(api): new endpoint\n\nBREAKING-CHANGE: removes /v1").is_empty());
        assert_eq!(
            lint("feat(api): new endpoint\n\nBREAKING CHANGE:"),
            vec![Rule::BreakingChangeEmpty]
        );
    }

    #[test]
    fn sign_off_when_required() {
        let config = CommitConfig {
            require_sign_off: true,
            ..CommitConfig::default()
        };
        let linter = CommitLinter::new(&config);
        let rules: Vec<Rule> = linter.lint("fix: repair").iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![Rule::SignOffMissing]);
        assert!(linter
            .lint("fix: repair\n\nSigned-off-by: Jane Doe <jane@example.com>")
            .is_empty());
    }

    #[test]
    fn cherry_pick_line_must_be_last() {
        let ok = "fix: repair\n\nSigned-off-by: Jane Doe <jane@example.com>\n(cherry picked from commit 0123456789abcdef)";
        assert!(lint(ok).is_empty());
        let bad = "fix: repair\n\n(cherry picked from commit 0123456789abcdef)\nSigned-off-by: Jane Doe <jane@example.com>";
        assert_eq!(lint(bad), vec![Rule::CherryPickNotLast]);
    }

    #[test]
    fn tooling_headers_are_ignored() {
        assert!(lint("Merge branch 'main' into topic").is_empty());
        assert!(lint("fixup! feat: thing").is_empty());
        assert!(lint("Revert \"feat: thing\"").is_empty());
    }

    #[test]
    fn validation_stops_at_first_failing_commit() {
        let commits = vec![
            commit("aaaaaaaa", "feat(app): New feature added"),
            commit("bbbbbbbb", "Missing commit verb"),
            commit("cccccccc", "also bad"),
        ];
        let violations = validate(&commits, &CommitConfig::default(), &Policy::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location.as_deref(), Some("bbbbbbbb"));
        assert_eq!(violations[0].snippet.as_deref(), Some("Missing commit verb"));
    }

    #[test]
    fn warnings_do_not_stop_validation() {
        let commits = vec![
            commit("aaaaaaaa", "feat: Title Case Subject"),
            commit("bbbbbbbb", "nope"),
        ];
        let violations = validate(&commits, &CommitConfig::default(), &Policy::default());
        let locations: Vec<_> = violations.iter().filter_map(|v| v.location.as_deref()).collect();
        assert_eq!(locations, vec!["aaaaaaaa", "bbbbbbbb"]);
    }

    #[test]
    fn subject_case_helper() {
        assert!(is_lower_or_sentence_case("add thing"));
        assert!(is_lower_or_sentence_case("Add thing"));
        assert!(!is_lower_or_sentence_case("Add Thing"));
        assert!(!is_lower_or_sentence_case("ADD"));
    }
}
