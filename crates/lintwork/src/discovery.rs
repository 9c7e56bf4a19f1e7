//! Source file discovery.
//!
//! Walks a project root (honouring `.gitignore` unless disabled) and keeps the
//! files whose root-relative path matches an include pattern and no exclude
//! pattern.

use glob::{MatchOptions, Pattern};
use lintwork_core::AnalysisConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Errors from source discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A source or exclude pattern is not a valid glob.
    #[error("invalid source pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The pattern as configured.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// The project root does not exist or is not a directory.
    #[error("project root {} is not a directory", .0.display())]
    RootNotFound(PathBuf),
}

/// Include/exclude glob patterns applied to root-relative paths.
#[derive(Debug, Clone)]
pub struct SourceDiscovery {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    respect_gitignore: bool,
}

impl SourceDiscovery {
    /// Compiles include and exclude patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid glob.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, DiscoveryError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            respect_gitignore: true,
        })
    }

    /// Builds discovery from the `[analysis]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid glob.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, DiscoveryError> {
        Ok(Self::new(&config.sources, &config.exclude)?.respect_gitignore(config.respect_gitignore))
    }

    /// Whether `.gitignore`, `.ignore` and git exclude files are honoured.
    #[must_use]
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Returns `true` if a root-relative path is selected.
    #[must_use]
    pub fn matches(&self, relative: &Path) -> bool {
        self.include
            .iter()
            .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
    }

    /// Walks `root` and returns the selected files, sorted.
    ///
    /// Unreadable directory entries are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !root.is_dir() {
            return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
        }

        let mut builder = ignore::WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .ignore(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .require_git(false);

        let mut files = Vec::new();
        let mut seen = 0usize;
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            seen += 1;

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if self.matches(relative) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        debug!(
            "Discovered {} source file(s) out of {} under {}",
            files.len(),
            seen,
            root.display()
        );
        Ok(files)
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, DiscoveryError> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Pattern::new(p).map_err(|e| DiscoveryError::InvalidPattern {
                pattern: p.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class X {}").unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn include_and_exclude_patterns() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/main/java/a/App.java");
        touch(tmp.path(), "src/main/java/a/generated/Gen.java");
        touch(tmp.path(), "src/main/java/a/notes.txt");
        touch(tmp.path(), "src/test/java/a/AppTest.java");

        let discovery =
            SourceDiscovery::new(&["src/main/java/**/*.java"], &["**/generated/**"]).unwrap();
        let files = discovery.discover(tmp.path()).unwrap();
        assert_eq!(relative(tmp.path(), &files), vec!["src/main/java/a/App.java"]);
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let discovery = SourceDiscovery::new(&["src/*.java"], &[] as &[&str]).unwrap();
        assert!(discovery.matches(Path::new("src/A.java")));
        assert!(!discovery.matches(Path::new("src/a/A.java")));
    }

    #[test]
    fn results_are_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in ["c/C.java", "a/A.java", "b/B.java"] {
            touch(tmp.path(), name);
        }
        let discovery = SourceDiscovery::new(&["**/*.java"], &[] as &[&str]).unwrap();
        let files = discovery.discover(tmp.path()).unwrap();
        assert_eq!(
            relative(tmp.path(), &files),
            vec!["a/A.java", "b/B.java", "c/C.java"]
        );
    }

    #[test]
    fn gitignore_respected_unless_disabled() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/A.java");
        touch(tmp.path(), "build/B.java");
        fs::write(tmp.path().join(".gitignore"), "build/\n").unwrap();

        let discovery = SourceDiscovery::new(&["**/*.java"], &[] as &[&str]).unwrap();
        let files = discovery.discover(tmp.path()).unwrap();
        assert_eq!(relative(tmp.path(), &files), vec!["src/A.java"]);

        let files = discovery
            .respect_gitignore(false)
            .discover(tmp.path())
            .unwrap();
        assert_eq!(relative(tmp.path(), &files).len(), 2);
    }

    #[test]
    fn from_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/main/java/App.java");
        touch(tmp.path(), "Other.java");

        let discovery = SourceDiscovery::from_config(&AnalysisConfig::default()).unwrap();
        let files = discovery.discover(tmp.path()).unwrap();
        assert_eq!(relative(tmp.path(), &files), vec!["src/main/java/App.java"]);
    }

    #[test]
    fn invalid_pattern_rejected() {
        let err = SourceDiscovery::new(&["src/[.java"], &[] as &[&str]).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidPattern { .. }));
    }

    #[test]
    fn missing_root_rejected() {
        let discovery = SourceDiscovery::new(&["**/*.java"], &[] as &[&str]).unwrap();
        let err = discovery.discover(Path::new("/nonexistent/lintwork")).unwrap_err();
        assert!(matches!(err, DiscoveryError::RootNotFound(_)));
    }
}
