//! Content fingerprints and cache keys.
//!
//! All fingerprints are lowercase hex SHA-256 digests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Digest of one source file's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFingerprint(String);

impl SourceFingerprint {
    /// Fingerprints raw file content.
    #[must_use]
    pub fn of_bytes(content: &[u8]) -> Self {
        Self(sha256_hex(content))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of a resolved rule set's canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSetFingerprint(String);

impl RuleSetFingerprint {
    /// Fingerprints canonical rule-set bytes.
    #[must_use]
    pub fn of_bytes(canonical: &[u8]) -> Self {
        Self(sha256_hex(canonical))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RuleSetFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of everything besides sources and rules that shapes analyzer output:
/// tool version, target version, analyzer classpath and project classpath.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentFingerprint(String);

impl EnvironmentFingerprint {
    /// Computes the environment fingerprint.
    ///
    /// Classpath entries contribute their path, size and modification time so
    /// that replacing a library invalidates the cache without hashing archives.
    #[must_use]
    pub fn compute(
        target_version: &str,
        analyzer_classpath: &[PathBuf],
        project_classpath: &[PathBuf],
    ) -> Self {
        let mut text = format!(
            "tool={}\ntarget={target_version}\n",
            env!("CARGO_PKG_VERSION")
        );
        text.push_str("[analyzer]\n");
        for entry in analyzer_classpath {
            text.push_str(&describe_entry(entry));
        }
        text.push_str("[project]\n");
        for entry in project_classpath {
            text.push_str(&describe_entry(entry));
        }
        Self(sha256_hex(text.as_bytes()))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn describe_entry(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_secs());
            format!("{}\t{}\t{modified}\n", path.display(), meta.len())
        }
        Err(_) => format!("{}\tmissing\n", path.display()),
    }
}

/// Cache lookup key: source content under a specific rule set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: SourceFingerprint,
    rules: RuleSetFingerprint,
}

impl CacheKey {
    /// Creates a key.
    #[must_use]
    pub fn new(source: SourceFingerprint, rules: RuleSetFingerprint) -> Self {
        Self { source, rules }
    }

    /// The source content fingerprint.
    #[must_use]
    pub fn source(&self) -> &SourceFingerprint {
        &self.source
    }

    /// The rule-set fingerprint.
    #[must_use]
    pub fn rules(&self) -> &RuleSetFingerprint {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_fingerprint_is_content_based() {
        let a = SourceFingerprint::of_bytes(b"class A {}");
        let b = SourceFingerprint::of_bytes(b"class A {}");
        let c = SourceFingerprint::of_bytes(b"class B {}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            SourceFingerprint::of_bytes(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn environment_changes_with_target_version() {
        let cp = vec![PathBuf::from("/nonexistent/analyzer.jar")];
        let a = EnvironmentFingerprint::compute("17", &cp, &[]);
        let b = EnvironmentFingerprint::compute("21", &cp, &[]);
        assert_ne!(a, b);
        assert_eq!(a, EnvironmentFingerprint::compute("17", &cp, &[]));
    }

    #[test]
    fn environment_distinguishes_classpath_roles() {
        let entry = vec![PathBuf::from("/nonexistent/lib.jar")];
        let as_analyzer = EnvironmentFingerprint::compute("17", &entry, &[]);
        let as_project = EnvironmentFingerprint::compute("17", &[], &entry);
        assert_ne!(as_analyzer, as_project);
    }

    #[test]
    fn cache_keys_compare_both_parts() {
        let src = SourceFingerprint::of_bytes(b"x");
        let r1 = RuleSetFingerprint::of_bytes(b"rules-1");
        let r2 = RuleSetFingerprint::of_bytes(b"rules-2");
        assert_ne!(
            CacheKey::new(src.clone(), r1.clone()),
            CacheKey::new(src.clone(), r2)
        );
        assert_eq!(CacheKey::new(src.clone(), r1.clone()), CacheKey::new(src, r1));
    }
}
