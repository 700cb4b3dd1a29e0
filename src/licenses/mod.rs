//! License checks for the project root and its vendored dependencies.
//!
//! A dependency is any directory below a vendor root that directly holds
//! files. It is licensed when it, or an ancestor below the vendor root,
//! contains a canonical license file, a registered license file, or a file
//! listed in a checksum manifest. Canonical files are trusted as they are;
//! everything else must be covered by a manifest digest.

pub mod manifest;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::LicenseConfig;
use crate::error::Result;
use crate::rules::{Rule, Violation};

pub use manifest::{Manifest, ManifestEntry};

/// A vendored dependency directory and how its license was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub path: PathBuf,
    /// Canonical license file found in the directory or an ancestor.
    pub license_file: Option<PathBuf>,
    /// Registered or manifest-listed file covering the directory.
    pub registered: Option<PathBuf>,
}

impl Dependency {
    pub fn is_licensed(&self) -> bool {
        self.license_file.is_some() || self.registered.is_some()
    }
}

/// Run the project-root check, the dependency check and the checksum
/// verification. A malformed manifest aborts with `ManifestMalformed`.
pub fn check(root: &Path, config: &LicenseConfig) -> Result<Vec<Violation>> {
    let root = std::fs::canonicalize(root)?;
    let root = root.as_path();
    let mut violations = check_project_license(root, config)?;

    let mut manifests = Vec::new();
    for rel in &config.manifests {
        let path = root.join(rel);
        if path.is_file() {
            manifests.push(Manifest::load(&path)?);
        } else {
            tracing::debug!(path = %path.display(), "no checksum manifest");
        }
    }

    let mut covering: Vec<PathBuf> = Vec::new();
    for rel in &config.registered {
        let path = normalize(&root.join(rel));
        if path.is_file() {
            covering.push(path);
        } else {
            tracing::warn!(path = %rel.display(), "registered license file does not exist, ignoring");
        }
    }
    covering.extend(
        manifests
            .iter()
            .flat_map(|m| m.entries.iter().map(|e| e.path.clone())),
    );

    for vendor in &config.vendor_dirs {
        let vendor_root = normalize(&root.join(vendor));
        if !vendor_root.is_dir() {
            continue;
        }
        let mut reported: Vec<PathBuf> = Vec::new();
        for dep in dependencies(&vendor_root, config, &covering)? {
            if dep.is_licensed() {
                continue;
            }
            if reported.iter().any(|r| dep.path.starts_with(r)) {
                continue;
            }
            violations.push(
                Violation::new(
                    Rule::DependencyLicenseMissing,
                    format!("{} has no license file", relative(root, &dep.path)),
                )
                .at(relative(root, &dep.path)),
            );
            reported.push(dep.path);
        }
    }

    for manifest in &manifests {
        violations.extend(manifest.verify(root)?);
    }

    Ok(violations)
}

/// Exactly one license file at the project root, and no other file whose
/// name looks like a license.
pub fn check_project_license(root: &Path, config: &LicenseConfig) -> Result<Vec<Violation>> {
    let mut violations = Vec::new();

    if !root.join(&config.project_license).is_file() {
        violations.push(
            Violation::new(
                Rule::ProjectLicenseMissing,
                format!("project root has no {} file", config.project_license),
            )
            .at(config.project_license.clone()),
        );
    }

    let mut extras: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name != config.project_license && config.is_canonical(&name) {
            extras.push(name);
        }
    }
    extras.sort();

    for name in extras {
        violations.push(
            Violation::new(
                Rule::UnexpectedProjectLicense,
                format!(
                    "unexpected license file {} next to {}",
                    name, config.project_license
                ),
            )
            .at(name),
        );
    }

    Ok(violations)
}

/// Every directory below `vendor_root` that directly holds a file, with its
/// license resolution.
pub fn dependencies(
    vendor_root: &Path,
    config: &LicenseConfig,
    covering: &[PathBuf],
) -> Result<Vec<Dependency>> {
    let mut canonical_cache: HashMap<PathBuf, Option<PathBuf>> = HashMap::new();
    let mut deps = Vec::new();

    let walker = WalkDir::new(vendor_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        if !holds_files(dir)? {
            continue;
        }

        let mut license_file = None;
        let mut registered = None;
        for ancestor in dir.ancestors() {
            if ancestor == vendor_root || !ancestor.starts_with(vendor_root) {
                break;
            }
            if license_file.is_none() {
                license_file = match canonical_cache.get(ancestor) {
                    Some(found) => found.clone(),
                    None => {
                        let found = canonical_license(ancestor, config)?;
                        canonical_cache.insert(ancestor.to_path_buf(), found.clone());
                        found
                    }
                };
            }
            if registered.is_none() {
                registered = covering
                    .iter()
                    .find(|f| f.parent() == Some(ancestor))
                    .cloned();
            }
            if license_file.is_some() || registered.is_some() {
                break;
            }
        }

        tracing::debug!(
            dependency = %dir.display(),
            licensed = license_file.is_some() || registered.is_some(),
            "resolved dependency license"
        );
        deps.push(Dependency {
            path: dir.to_path_buf(),
            license_file,
            registered,
        });
    }

    Ok(deps)
}

fn holds_files(dir: &Path) -> Result<bool> {
    for entry in std::fs::read_dir(dir)? {
        if entry?.file_type()?.is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn canonical_license(dir: &Path, config: &LicenseConfig) -> Result<Option<PathBuf>> {
    let mut found: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && config.is_canonical(&entry.file_name().to_string_lossy())
        {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}

/// Lexically resolve `.` and `..` components. A `..` with nothing left to
/// cancel is kept, except directly below the filesystem root.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `path` relative to `root` for display, falling back to the full path.
pub(crate) fn relative(root: &Path, path: &Path) -> String {
    let root = normalize(root);
    let path = normalize(path);
    path.strip_prefix(&root)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    const README: &str = "Some library\n\nLicensed under the MIT license.\n";

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("LICENSE"), "Apache-2.0").unwrap();
        let licensed = dir.path().join("vendor/example.org/good");
        std::fs::create_dir_all(licensed.join("sub")).unwrap();
        std::fs::write(licensed.join("LICENSE"), "MIT").unwrap();
        std::fs::write(licensed.join("lib.go"), "package good").unwrap();
        std::fs::write(licensed.join("sub/util.go"), "package sub").unwrap();
        dir
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn rules(violations: &[Violation]) -> Vec<Rule> {
        violations.iter().map(|v| v.rule).collect()
    }

    #[test]
    fn licensed_tree_passes() {
        let dir = project();
        let violations = check(dir.path(), &LicenseConfig::default()).unwrap();
        assert_eq!(violations, vec![]);
    }

    #[test]
    fn dependency_without_license_is_reported_once() {
        let dir = project();
        write(dir.path(), "vendor/dummy-site.org/test-repo/test.go", "");
        write(dir.path(), "vendor/dummy-site.org/test-repo/inner/more.go", "");

        let violations = check(dir.path(), &LicenseConfig::default()).unwrap();
        assert_eq!(rules(&violations), vec![Rule::DependencyLicenseMissing]);
        assert_eq!(
            violations[0].location.as_deref(),
            Some("vendor/dummy-site.org/test-repo")
        );
    }

    #[test]
    fn every_unlicensed_dependency_is_collected() {
        let dir = project();
        write(dir.path(), "vendor/a.org/one/x.go", "");
        write(dir.path(), "vendor/b.org/two/y.go", "");

        let violations = check(dir.path(), &LicenseConfig::default()).unwrap();
        let locations: Vec<_> = violations.iter().filter_map(|v| v.location.clone()).collect();
        assert_eq!(locations, vec!["vendor/a.org/one", "vendor/b.org/two"]);
    }

    #[test]
    fn unexpected_root_license_is_a_violation() {
        let dir = project();
        write(dir.path(), "LICENSE.unexpected", "");

        let violations = check(dir.path(), &LicenseConfig::default()).unwrap();
        assert_eq!(rules(&violations), vec![Rule::UnexpectedProjectLicense]);
        assert_eq!(violations[0].location.as_deref(), Some("LICENSE.unexpected"));
    }

    #[test]
    fn missing_root_license_is_a_violation() {
        let dir = project();
        std::fs::remove_file(dir.path().join("LICENSE")).unwrap();
        let violations = check(dir.path(), &LicenseConfig::default()).unwrap();
        assert_eq!(rules(&violations), vec![Rule::ProjectLicenseMissing]);
    }

    #[test]
    fn readme_license_needs_a_manifest_entry() {
        let dir = project();
        write(dir.path(), "vendor/example.org/readme-only/README.md", README);
        write(dir.path(), "vendor/example.org/readme-only/lib.go", "");

        let without = check(dir.path(), &LicenseConfig::default()).unwrap();
        assert_eq!(rules(&without), vec![Rule::DependencyLicenseMissing]);

        let digest = hex::encode(Sha256::digest(README.as_bytes()));
        write(
            dir.path(),
            "LIC_FILES_CHKSUM.sha256",
            &format!("{digest}  vendor/example.org/readme-only/README.md\n"),
        );
        let with = check(dir.path(), &LicenseConfig::default()).unwrap();
        assert_eq!(with, vec![]);
    }

    #[test]
    fn tampered_readme_license_is_a_mismatch() {
        let dir = project();
        write(dir.path(), "vendor/example.org/readme-only/README.md", "changed");
        let digest = hex::encode(Sha256::digest(README.as_bytes()));
        write(
            dir.path(),
            "LIC_FILES_CHKSUM.sha256",
            &format!("{digest}  vendor/example.org/readme-only/README.md\n"),
        );

        let violations = check(dir.path(), &LicenseConfig::default()).unwrap();
        assert_eq!(rules(&violations), vec![Rule::ChecksumMismatch]);
    }

    #[test]
    fn registered_file_covers_dependency() {
        let dir = project();
        write(dir.path(), "vendor/example.org/odd/NOTICE", "license text");
        write(dir.path(), "vendor/example.org/odd/lib.go", "");

        let mut config = LicenseConfig::default();
        config.registered.push(PathBuf::from("./vendor/example.org/odd/NOTICE"));
        assert_eq!(check(dir.path(), &config).unwrap(), vec![]);
    }

    #[test]
    fn license_in_vendor_root_covers_nothing() {
        let dir = project();
        write(dir.path(), "vendor/LICENSE", "");
        write(dir.path(), "vendor/c.org/three/z.go", "");

        let violations = check(dir.path(), &LicenseConfig::default()).unwrap();
        assert_eq!(rules(&violations), vec![Rule::DependencyLicenseMissing]);
    }

    #[test]
    fn dependencies_record_their_license_file() {
        let dir = project();
        let vendor = dir.path().join("vendor");
        let deps = dependencies(&vendor, &LicenseConfig::default(), &[]).unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(Dependency::is_licensed));
        assert_eq!(
            deps[1].license_file,
            Some(vendor.join("example.org/good/LICENSE"))
        );
    }

    #[test]
    fn normalize_strips_dot_components() {
        assert_eq!(
            normalize(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
    }

    #[test]
    fn normalize_keeps_leading_parent_components() {
        assert_eq!(normalize(Path::new("../vendor")), PathBuf::from("../vendor"));
        assert_eq!(normalize(Path::new("a/../../b/./c")), PathBuf::from("../b/c"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    /// `target` spelled relative to the working directory, climbing with `..`.
    #[cfg(unix)]
    fn climbing_path(target: &Path) -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        let mut rel = PathBuf::new();
        for _ in cwd.components().skip(1) {
            rel.push("..");
        }
        rel.join(target.strip_prefix("/").unwrap())
    }

    #[cfg(unix)]
    #[test]
    fn root_given_through_parent_components_is_checked() {
        let dir = project();
        write(dir.path(), "vendor/bad.org/lib/lib.go", "");
        write(dir.path(), "vendor/bad.org/lib/README.md", README);
        let digest = hex::encode(Sha256::digest(b"other"));
        write(
            dir.path(),
            "LIC_FILES_CHKSUM.sha256",
            &format!("{digest}  vendor/bad.org/lib/README.md\n"),
        );

        let root = climbing_path(dir.path());
        assert!(root.starts_with(".."));
        let violations = check(&root, &LicenseConfig::default()).unwrap();
        assert_eq!(rules(&violations), vec![Rule::ChecksumMismatch]);

        std::fs::remove_file(dir.path().join("LIC_FILES_CHKSUM.sha256")).unwrap();
        let violations = check(&root, &LicenseConfig::default()).unwrap();
        assert_eq!(rules(&violations), vec![Rule::DependencyLicenseMissing]);
        assert_eq!(violations[0].location.as_deref(), Some("vendor/bad.org/lib"));
    }
}
