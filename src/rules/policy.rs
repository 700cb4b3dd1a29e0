use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Severity, Violation};

/// Policy verdict for one stage, after applying the ignore list and
/// severity overrides to raw violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub pass: bool,
    pub total_violations: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Policy configuration loaded from `[policy]` in `.compliance.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Rule IDs to ignore entirely.
    #[serde(default)]
    pub ignore_rules: HashSet<String>,
    /// Per-rule severity overrides.
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl Policy {
    /// Filter violations: remove ignored rules, apply overrides.
    pub fn apply(&self, violations: &[Violation]) -> Vec<Violation> {
        violations
            .iter()
            .filter(|v| !self.ignore_rules.contains(v.rule.id()))
            .map(|v| {
                let mut v = v.clone();
                if let Some(&severity) = self.overrides.get(v.rule.id()) {
                    v.severity = severity;
                }
                v
            })
            .collect()
    }

    /// Evaluate violations against this policy. Any remaining error fails.
    pub fn evaluate(&self, violations: &[Violation]) -> PolicyVerdict {
        let effective = self.apply(violations);
        let errors = effective.iter().filter(|v| v.is_error()).count();

        PolicyVerdict {
            pass: errors == 0,
            total_violations: violations.len(),
            errors,
            warnings: effective.len() - errors,
        }
    }
}
