use serde::Serialize;

use crate::error::{ComplianceError, Result};
use crate::runner::Stage;
use crate::ComplianceReport;

#[derive(Serialize)]
struct JsonFailure<'a> {
    pass: bool,
    stage: Option<Stage>,
    output: &'a str,
    error: String,
}

/// Render a passing run as JSON.
pub fn render(report: &ComplianceReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

/// Render a failed run as JSON.
pub fn render_failure(error: &ComplianceError) -> Result<String> {
    let failure = match error {
        ComplianceError::StageFailed {
            stage,
            output,
            source,
        } => JsonFailure {
            pass: false,
            stage: Some(*stage),
            output,
            error: source.to_string(),
        },
        other => JsonFailure {
            pass: false,
            stage: None,
            output: "",
            error: other.to_string(),
        },
    };
    let json = serde_json::to_string_pretty(&failure)?;
    Ok(json)
}
