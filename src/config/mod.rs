use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::Policy;

/// File name of the project-level configuration.
pub const CONFIG_FILE: &str = ".compliance.toml";

/// File name of the organization-wide defaults inside the tooling package.
pub const PACKAGE_CONFIG_FILE: &str = "compliance.toml";

/// Top-level configuration from `.compliance.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tooling: ToolingConfig,
    #[serde(default)]
    pub licenses: LicenseConfig,
    #[serde(default)]
    pub headers: HeaderConfig,
    #[serde(default)]
    pub commits: CommitConfig,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolingConfig {
    /// Directory name of the compliance-tooling package.
    pub package: String,
    /// Vendor directory searched before the search path.
    pub vendor_dir: PathBuf,
}

impl Default for ToolingConfig {
    fn default() -> Self {
        Self {
            package: "compliance-tooling".into(),
            vendor_dir: PathBuf::from("vendor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// The single license file expected at the project root.
    pub project_license: String,
    /// Roots of vendored dependencies, relative to the project root.
    pub vendor_dirs: Vec<PathBuf>,
    /// Case-insensitive file name prefixes recognized as license files.
    pub canonical_prefixes: Vec<String>,
    /// Checksum manifests, relative to the project root.
    pub manifests: Vec<PathBuf>,
    /// Explicitly registered license files, relative to the project root.
    pub registered: Vec<PathBuf>,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            project_license: "LICENSE".into(),
            vendor_dirs: vec![PathBuf::from("vendor")],
            canonical_prefixes: ["LICENSE", "LICENCE", "COPYING", "UNLICENSE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            manifests: vec![PathBuf::from("LIC_FILES_CHKSUM.sha256")],
            registered: Vec::new(),
        }
    }
}

impl LicenseConfig {
    pub fn is_canonical(&self, file_name: &str) -> bool {
        let upper = file_name.to_uppercase();
        self.canonical_prefixes
            .iter()
            .any(|p| upper.starts_with(&p.to_uppercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// File extensions that must carry a header.
    pub extensions: Vec<String>,
    /// Glob patterns (relative to the project root) excluded from scanning.
    pub exclude: Vec<String>,
    /// Regexes that must all match within the first `max_lines` lines.
    pub patterns: Vec<String>,
    pub max_lines: usize,
    /// First commit whose newly introduced files are exempt.
    pub enterprise_boundary: Option<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            extensions: ["go", "rs", "py", "sh", "js", "ts", "c", "h", "cpp", "java"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude: vec!["vendor/**".into()],
            patterns: vec![
                r"Copyright \d{4}".into(),
                r"Licensed under|SPDX-License-Identifier:".into(),
            ],
            max_lines: 20,
            enterprise_boundary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    /// Allowed commit types.
    pub types: Vec<String>,
    pub require_sign_off: bool,
    pub max_header_length: usize,
    pub max_body_line_length: usize,
    /// Range checked when none is given on the command line.
    pub range: Option<String>,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            types: [
                "build", "chore", "ci", "docs", "feat", "fix", "perf", "refactor", "revert",
                "style", "test",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            require_sign_off: false,
            max_header_length: 100,
            max_body_line_length: 100,
            range: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Pick the configuration file for a run: an explicit path, then the
    /// project's `.compliance.toml`, then the tooling package's defaults.
    pub fn resolve(explicit: Option<&Path>, root: &Path, package_dir: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let project = root.join(CONFIG_FILE);
        if project.exists() {
            return Self::load(&project);
        }
        if let Some(pkg) = package_dir {
            let shared = pkg.join(PACKAGE_CONFIG_FILE);
            if shared.exists() {
                tracing::debug!(path = %shared.display(), "using tooling package config");
                return Self::load(&shared);
            }
        }
        Ok(Self::default())
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# compliance-check configuration

[licenses]
# The single license file expected at the project root.
project_license = "LICENSE"
vendor_dirs = ["vendor"]
manifests = ["LIC_FILES_CHKSUM.sha256"]
# License files that do not follow the LICENSE/COPYING naming.
# registered = ["vendor/example.org/lib/NOTICE"]

[headers]
exclude = ["vendor/**"]
max_lines = 20
# Files introduced at or after this commit need no open-source header.
# enterprise_boundary = "0123abcd"

[commits]
# require_sign_off = true
max_body_line_length = 100
# range = "origin/main..HEAD"

[policy]
# Rule IDs to ignore entirely.
# ignore_rules = ["COM-011"]

# Per-rule severity overrides.
# [policy.overrides]
# "COM-006" = "warning"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/.compliance.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn starter_toml_parses() {
        let config: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert_eq!(config.licenses.project_license, "LICENSE");
        assert!(!config.commits.require_sign_off);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: Config = toml::from_str("[commits]\nrequire_sign_off = true\n").unwrap();
        assert!(config.commits.require_sign_off);
        assert_eq!(config.commits.max_body_line_length, 100);
        assert!(config.commits.types.iter().any(|t| t == "feat"));
    }

    #[test]
    fn canonical_names_are_case_insensitive_prefixes() {
        let licenses = LicenseConfig::default();
        assert!(licenses.is_canonical("LICENSE"));
        assert!(licenses.is_canonical("license-mit.txt"));
        assert!(licenses.is_canonical("COPYING.LESSER"));
        assert!(!licenses.is_canonical("README.md"));
        assert!(!licenses.is_canonical("LIC_FILES_CHKSUM.sha256"));
    }

    #[test]
    fn project_config_wins_over_package_defaults() {
        let root = tempfile::TempDir::new().unwrap();
        let pkg = tempfile::TempDir::new().unwrap();
        std::fs::write(
            pkg.path().join(PACKAGE_CONFIG_FILE),
            "[headers]\nmax_lines = 5\n",
        )
        .unwrap();

        let shared = Config::resolve(None, root.path(), Some(pkg.path())).unwrap();
        assert_eq!(shared.headers.max_lines, 5);

        std::fs::write(root.path().join(CONFIG_FILE), "[headers]\nmax_lines = 7\n").unwrap();
        let project = Config::resolve(None, root.path(), Some(pkg.path())).unwrap();
        assert_eq!(project.headers.max_lines, 7);
    }
}
