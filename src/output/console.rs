use crate::error::ComplianceError;
use crate::rules::{Severity, Violation};
use crate::ComplianceReport;

/// Render violations as the captured output of a stage, errors first.
pub fn render_violations(violations: &[Violation]) -> String {
    let mut output = String::new();

    let mut sorted: Vec<&Violation> = violations.iter().collect();
    sorted.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.location.cmp(&b.location))
    });

    for violation in sorted {
        let tag = match violation.severity {
            Severity::Error => "[ERROR]",
            Severity::Warning => "[WARN] ",
        };
        output.push_str(&format!(
            "  {} {} {}\n",
            tag, violation.rule, violation.message
        ));
        if let Some(location) = &violation.location {
            output.push_str(&format!("          at {}\n", location));
        }
    }

    output
}

/// Render a passing run, stage by stage.
pub fn render(report: &ComplianceReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n  Tooling package: {}\n\n",
        report.package_dir.display()
    ));

    for stage in &report.stages {
        let warnings = stage.violations.len();
        if warnings == 0 {
            output.push_str(&format!("  {} check: ok\n", stage.stage));
        } else {
            output.push_str(&format!(
                "  {} check: ok ({} warning(s))\n",
                stage.stage, warnings
            ));
            output.push_str(&stage.output);
        }
    }

    output.push_str("\n  Result: PASS\n\n");
    output
}

/// Render a failed run: the stage, its captured output and the cause.
pub fn render_failure(error: &ComplianceError) -> String {
    let mut output = String::new();

    match error {
        ComplianceError::StageFailed {
            stage,
            output: captured,
            source,
        } => {
            output.push_str(&format!("\n  {} check failed:\n\n", stage));
            if !captured.is_empty() {
                output.push_str(captured);
                output.push('\n');
            }
            output.push_str(&format!("  cause: {}\n", source));
        }
        other => {
            output.push_str(&format!("\n  {}\n", other));
        }
    }

    output.push_str("\n  Result: FAIL\n\n");
    output
}
