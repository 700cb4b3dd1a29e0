//! Locates the compliance-tooling package.
//!
//! The vendored copy under the project wins; otherwise every entry of the
//! search path is tried in order.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{ComplianceError, Result};

/// Find `package` under `<root>/<vendor_dir>` or on the search path.
///
/// An unset or empty search path is only an error when no vendored copy
/// exists.
pub fn locate(
    root: &Path,
    vendor_dir: &Path,
    package: &str,
    search_path: Option<&OsStr>,
) -> Result<PathBuf> {
    let vendored = root.join(vendor_dir).join(package);
    if vendored.is_dir() {
        tracing::debug!(path = %vendored.display(), "tooling package found in vendor directory");
        return Ok(vendored);
    }

    let mut searched = vec![vendored];

    let entries = search_path.filter(|s| !s.is_empty());
    if let Some(entries) = entries {
        for entry in std::env::split_paths(entries) {
            if entry.as_os_str().is_empty() {
                continue;
            }
            let candidate = entry.join(package);
            if candidate.is_dir() {
                tracing::debug!(path = %candidate.display(), "tooling package found on search path");
                return Ok(candidate);
            }
            searched.push(candidate);
        }
    } else {
        tracing::warn!("search path is unset and no vendored tooling package exists");
    }

    Err(ComplianceError::PathNotFound {
        package: package.to_string(),
        searched,
    })
}
