//! Checksum manifests of non-canonical license texts.
//!
//! Each line reads `<sha256-hex>  <path>` with exactly two spaces. Paths are
//! relative to the directory holding the manifest.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::{normalize, relative};
use crate::error::{ComplianceError, Result};
use crate::rules::{Rule, Violation};

static ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9a-fA-F]{64})  (\S.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Lower-case hex digest.
    pub digest: String,
    /// Path as written in the manifest.
    pub listed: String,
    /// `listed` resolved against the manifest's directory.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub path: PathBuf,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    /// Parse manifest text. Blank lines and `#` comments are skipped; any
    /// other line that is not a well-formed entry is a hard error.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let base = path.parent().unwrap_or(Path::new(""));
        let mut entries = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let caps = ENTRY_RE
                .captures(line)
                .ok_or_else(|| ComplianceError::ManifestMalformed {
                    manifest: path.to_path_buf(),
                    line_no: idx + 1,
                    line: line.to_string(),
                })?;
            let listed = caps[2].trim_end().to_string();
            entries.push(ManifestEntry {
                digest: caps[1].to_lowercase(),
                path: normalize(&base.join(&listed)),
                listed,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Re-hash every listed file and report mismatches and missing files.
    pub fn verify(&self, root: &Path) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        for entry in &self.entries {
            let location = relative(root, &entry.path);
            if !entry.path.is_file() {
                violations.push(
                    Violation::new(
                        Rule::ChecksumFileMissing,
                        format!(
                            "'{}' is listed in {} but does not exist",
                            entry.listed,
                            relative(root, &self.path)
                        ),
                    )
                    .at(location),
                );
                continue;
            }

            let actual = sha256_file(&entry.path)?;
            if actual != entry.digest {
                violations.push(
                    Violation::new(
                        Rule::ChecksumMismatch,
                        format!(
                            "{}: expected {}, found {}",
                            location, entry.digest, actual
                        ),
                    )
                    .at(location),
                );
            } else {
                tracing::debug!(path = %location, "checksum verified");
            }
        }

        Ok(violations)
    }
}

/// Lower-case hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const README: &str = "Copyright (c) Example\nPermission is hereby granted...\n";

    fn digest_of(content: &str) -> String {
        hex::encode(Sha256::digest(content.as_bytes()))
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let dep = dir.path().join("vendor/example.org/lib");
        std::fs::create_dir_all(&dep).unwrap();
        std::fs::write(dep.join("README.md"), README).unwrap();
        dir
    }

    #[test]
    fn parses_entries_relative_to_manifest() {
        let line = format!("{}  vendor/example.org/lib/README.md\n", digest_of(README));
        let manifest = Manifest::parse(Path::new("/proj/LIC_FILES_CHKSUM.sha256"), &line).unwrap();
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(
            manifest.entries[0].path,
            PathBuf::from("/proj/vendor/example.org/lib/README.md")
        );
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let text = format!("# license texts\n\n{}  README.md\n", digest_of(README));
        let manifest = Manifest::parse(Path::new("m.sha256"), &text).unwrap();
        assert_eq!(manifest.entries.len(), 1);
    }

    #[test]
    fn short_digest_is_malformed() {
        let digest = &digest_of(README)[..63];
        let text = format!("{digest}  README.md\n");
        match Manifest::parse(Path::new("m.sha256"), &text) {
            Err(ComplianceError::ManifestMalformed { line_no, line, .. }) => {
                assert_eq!(line_no, 1);
                assert!(line.ends_with("README.md"));
            }
            other => panic!("expected ManifestMalformed, got {other:?}"),
        }
    }

    #[test]
    fn single_space_separator_is_malformed() {
        let text = format!("{} README.md\n", digest_of(README));
        assert!(matches!(
            Manifest::parse(Path::new("m.sha256"), &text),
            Err(ComplianceError::ManifestMalformed { .. })
        ));
    }

    #[test]
    fn matching_digest_verifies() {
        let dir = fixture();
        let text = format!("{}  vendor/example.org/lib/README.md\n", digest_of(README));
        let manifest = Manifest::parse(&dir.path().join("LIC_FILES_CHKSUM.sha256"), &text).unwrap();
        assert!(manifest.verify(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn uppercase_digest_is_accepted() {
        let dir = fixture();
        let text = format!(
            "{}  vendor/example.org/lib/README.md\n",
            digest_of(README).to_uppercase()
        );
        let manifest = Manifest::parse(&dir.path().join("LIC_FILES_CHKSUM.sha256"), &text).unwrap();
        assert!(manifest.verify(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn changed_file_reports_expected_and_actual() {
        let dir = fixture();
        let expected = digest_of("something else");
        let text = format!("{expected}  vendor/example.org/lib/README.md\n");
        let manifest = Manifest::parse(&dir.path().join("LIC_FILES_CHKSUM.sha256"), &text).unwrap();
        let violations = manifest.verify(dir.path()).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::ChecksumMismatch);
        assert!(violations[0].message.contains(&expected));
        assert!(violations[0].message.contains(&digest_of(README)));
        assert_eq!(
            violations[0].location.as_deref(),
            Some("vendor/example.org/lib/README.md")
        );
    }

    #[test]
    fn missing_listed_file_is_reported() {
        let dir = fixture();
        let text = format!("{}  vendor/gone/README.md\n", digest_of(README));
        let manifest = Manifest::parse(&dir.path().join("LIC_FILES_CHKSUM.sha256"), &text).unwrap();
        let violations = manifest.verify(dir.path()).unwrap();
        assert_eq!(violations[0].rule, Rule::ChecksumFileMissing);
    }

    proptest! {
        #[test]
        fn digests_shorter_than_64_never_parse(len in 1usize..64, path in "[a-z]{1,8}\\.md") {
            let digest = "a".repeat(len);
            let text = format!("{digest}  {path}\n");
            let is_malformed = matches!(
                Manifest::parse(Path::new("m.sha256"), &text),
                Err(ComplianceError::ManifestMalformed { .. })
            );
            prop_assert!(is_malformed);
        }

        #[test]
        fn verification_is_idempotent(content in ".{0,64}", tamper in proptest::bool::ANY) {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("README.md"), &content).unwrap();
            let listed = if tamper { digest_of("tampered") } else { digest_of(&content) };
            let text = format!("{listed}  README.md\n");
            let manifest = Manifest::parse(&dir.path().join("m.sha256"), &text).unwrap();
            let first = manifest.verify(dir.path()).unwrap();
            let second = manifest.verify(dir.path()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
