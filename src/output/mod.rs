pub mod console;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, Result};
use crate::ComplianceReport;

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render a successful run.
pub fn render(report: &ComplianceReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(report)),
        OutputFormat::Json => json::render(report),
    }
}

/// Render a failed run.
pub fn render_failure(error: &ComplianceError, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render_failure(error)),
        OutputFormat::Json => json::render_failure(error),
    }
}
