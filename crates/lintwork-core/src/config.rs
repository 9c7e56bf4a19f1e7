//! Configuration file (`lintwork.toml`).

use crate::orchestrator::ExecutionOptions;
use crate::request::AnalysisRequestBuilder;
use crate::ruleset::{DuplicatePolicy, RuleConfig, RuleSetSource};
use crate::types::Priority;
use crate::worker::ProcessWorkerConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// What to analyze and how.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// How to launch the analyzer.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Builds a request builder from the `[analysis]` section, resolving
    /// relative paths against `root`. Sources are left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if a classpath pattern is invalid or the inline
    /// rule configuration file cannot be read.
    pub fn request_builder(&self, root: &Path) -> Result<AnalysisRequestBuilder, ConfigError> {
        let analysis = &self.analysis;

        let inline = match &analysis.rule_set_config {
            Some(path) => {
                let path = root.join(path);
                let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                Some(content)
            }
            None => None,
        };

        let rule_set_files = analysis
            .rule_set_files
            .iter()
            .map(|reference| match RuleSetSource::parse(reference) {
                RuleSetSource::File(path) => RuleSetSource::File(root.join(path)),
                resource @ RuleSetSource::Resource(_) => resource,
            })
            .collect();

        let rules = RuleConfig {
            rule_sets: analysis.rule_sets.clone(),
            rule_set_files,
            inline,
            threshold: analysis.rule_priority,
            duplicate_policy: analysis.duplicate_policy,
        };

        Ok(AnalysisRequestBuilder::default()
            .project_classpath(expand_classpath(root, &analysis.classpath)?)
            .analyzer_classpath(expand_classpath(root, &self.analyzer.classpath)?)
            .target_version(analysis.target_version.clone())
            .rules(rules)
            .ignore_failures(analysis.ignore_failures)
            .incremental(analysis.incremental)
            .cache_file(root.join(&analysis.cache_file)))
    }

    /// Builds the process worker configuration from `[analyzer]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAnalyzer`] if no program is configured.
    pub fn worker_config(&self, root: &Path) -> Result<ProcessWorkerConfig, ConfigError> {
        let analyzer = &self.analyzer;
        let program = analyzer
            .program
            .as_ref()
            .ok_or(ConfigError::MissingAnalyzer)?;

        Ok(ProcessWorkerConfig::new(root.join(program))
            .with_args(analyzer.args.iter().cloned())
            .with_timeout(Duration::from_secs(analyzer.timeout_secs))
            .with_inherit_env(analyzer.inherit_env.iter().cloned())
            .with_violation_exit_codes(analyzer.violation_exit_codes.clone())
            .with_working_dir(root))
    }

    /// Parallelism and batch size.
    #[must_use]
    pub fn execution_options(&self) -> ExecutionOptions {
        let defaults = ExecutionOptions::default();
        ExecutionOptions {
            parallelism: self
                .analysis
                .parallelism
                .filter(|&n| n > 0)
                .unwrap_or(defaults.parallelism),
            batch_size: if self.analysis.batch_size == 0 {
                defaults.batch_size
            } else {
                self.analysis.batch_size
            },
        }
    }
}

/// The `[analysis]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Glob patterns selecting source files, relative to the project root.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// Glob patterns to exclude from analysis.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Whether to respect .gitignore files.
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Project classpath entries (globs allowed).
    #[serde(default)]
    pub classpath: Vec<String>,

    /// Target language version.
    #[serde(default = "default_target_version")]
    pub target_version: String,

    /// Built-in rule sets.
    #[serde(default = "default_rule_sets")]
    pub rule_sets: Vec<String>,

    /// Rule-set files (`resource:NAME` for packaged ones).
    #[serde(default)]
    pub rule_set_files: Vec<String>,

    /// File with inline rule-set configuration.
    #[serde(default)]
    pub rule_set_config: Option<PathBuf>,

    /// Rules less severe than this are not run.
    #[serde(default = "default_rule_priority")]
    pub rule_priority: Priority,

    /// Which definition wins for duplicate rules.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Echo the report to the console.
    #[serde(default = "default_true")]
    pub console_output: bool,

    /// Report violations without failing.
    #[serde(default)]
    pub ignore_failures: bool,

    /// Reuse results for unchanged files.
    #[serde(default = "default_true")]
    pub incremental: bool,

    /// Cache file location.
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    /// Maximum concurrent analyzer batches (default: available CPUs).
    #[serde(default)]
    pub parallelism: Option<usize>,

    /// Files per analyzer batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            exclude: Vec::new(),
            respect_gitignore: true,
            classpath: Vec::new(),
            target_version: default_target_version(),
            rule_sets: default_rule_sets(),
            rule_set_files: Vec::new(),
            rule_set_config: None,
            rule_priority: default_rule_priority(),
            duplicate_policy: DuplicatePolicy::default(),
            console_output: true,
            ignore_failures: false,
            incremental: true,
            cache_file: default_cache_file(),
            parallelism: None,
            batch_size: default_batch_size(),
        }
    }
}

/// The `[analyzer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Analyzer executable.
    #[serde(default)]
    pub program: Option<PathBuf>,

    /// Fixed arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// The analyzer's own classpath (globs allowed).
    #[serde(default)]
    pub classpath: Vec<String>,

    /// Wall-clock budget per batch, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variables passed through to the analyzer.
    #[serde(default = "default_inherit_env")]
    pub inherit_env: Vec<String>,

    /// Exit codes besides 0 meaning "completed with violations".
    #[serde(default = "default_violation_exit_codes")]
    pub violation_exit_codes: Vec<i32>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            classpath: Vec::new(),
            timeout_secs: default_timeout_secs(),
            inherit_env: default_inherit_env(),
            violation_exit_codes: default_violation_exit_codes(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["src/main/java/**/*.java".to_string()]
}

fn default_target_version() -> String {
    "17".to_string()
}

fn default_rule_sets() -> Vec<String> {
    vec!["errorprone".to_string()]
}

fn default_rule_priority() -> Priority {
    Priority::LOWEST
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("build/lintwork/incremental.cache")
}

fn default_batch_size() -> usize {
    crate::orchestrator::DEFAULT_BATCH_SIZE
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_inherit_env() -> Vec<String> {
    vec!["JAVA_HOME".to_string()]
}

fn default_violation_exit_codes() -> Vec<i32> {
    vec![crate::worker::process::DEFAULT_VIOLATION_EXIT_CODE]
}

fn default_true() -> bool {
    true
}

/// Expands classpath entries against `root`. Entries containing glob
/// characters are replaced by their sorted matches; others are kept as is.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPattern`] for malformed glob patterns.
pub fn expand_classpath(root: &Path, entries: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut expanded = Vec::new();
    for entry in entries {
        let path = root.join(entry);
        if !entry.contains(['*', '?', '[']) {
            expanded.push(path);
            continue;
        }

        let pattern = path.to_string_lossy().into_owned();
        let invalid = |message: String| ConfigError::InvalidPattern {
            pattern: entry.clone(),
            message,
        };
        let mut matches = glob::glob(&pattern)
            .map_err(|e| invalid(e.to_string()))?
            .filter_map(Result::ok)
            .collect::<Vec<_>>();
        matches.sort();
        expanded.extend(matches);
    }
    Ok(expanded)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a config file or a file it references.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A glob pattern is malformed.
    #[error("Invalid pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Why it is invalid.
        message: String,
    },

    /// `[analyzer] program` is not set.
    #[error("No analyzer configured; set `program` in the [analyzer] section")]
    MissingAnalyzer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.rule_sets, vec!["errorprone".to_string()]);
        assert_eq!(config.analysis.rule_priority, Priority::LOWEST);
        assert!(config.analysis.incremental);
        assert_eq!(config.analyzer.violation_exit_codes, vec![4]);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analysis]
sources = ["src/**/*.java"]
rule_sets = ["errorprone", "bestpractices"]
rule_priority = 3
duplicate_policy = "last-definition"
ignore_failures = true
batch_size = 10

[analyzer]
program = "bin/analyzer"
timeout_secs = 60
inherit_env = ["JAVA_HOME", "LANG"]
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.analysis.rule_sets.len(), 2);
        assert_eq!(config.analysis.rule_priority.get(), 3);
        assert_eq!(
            config.analysis.duplicate_policy,
            DuplicatePolicy::LastDefinition
        );
        assert!(config.analysis.ignore_failures);
        assert_eq!(config.execution_options().batch_size, 10);
        assert_eq!(config.analyzer.timeout_secs, 60);
    }

    #[test]
    fn rejects_out_of_range_priority() {
        let err = Config::parse("[analysis]\nrule_priority = 9\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_unknown_duplicate_policy() {
        assert!(Config::parse("[analysis]\nduplicate_policy = \"random\"\n").is_err());
    }

    #[test]
    fn request_builder_resolves_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("libs")).unwrap();
        std::fs::write(dir.path().join("libs/b.jar"), b"").unwrap();
        std::fs::write(dir.path().join("libs/a.jar"), b"").unwrap();
        std::fs::write(
            dir.path().join("inline.xml"),
            r#"<ruleset><rule name="X"/></ruleset>"#,
        )
        .unwrap();

        let config = Config::parse(
            r#"
[analysis]
classpath = ["build/classes", "libs/*.jar"]
rule_set_files = ["config/rules.xml", "resource:rulesets/quickstart.xml"]
rule_set_config = "inline.xml"
"#,
        )
        .unwrap();

        let request = config
            .request_builder(dir.path())
            .unwrap()
            .sources(["A.java"])
            .build()
            .unwrap();

        assert_eq!(
            request.project_classpath(),
            &[
                dir.path().join("build/classes"),
                dir.path().join("libs/a.jar"),
                dir.path().join("libs/b.jar"),
            ]
        );
        assert_eq!(
            request.rules().rule_set_files,
            vec![
                RuleSetSource::File(dir.path().join("config/rules.xml")),
                RuleSetSource::Resource("rulesets/quickstart.xml".to_string()),
            ]
        );
        assert!(request.rules().inline.is_some());
        assert_eq!(
            request.cache_file(),
            Some(dir.path().join("build/lintwork/incremental.cache").as_path())
        );
    }

    #[test]
    fn missing_inline_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let config = Config::parse("[analysis]\nrule_set_config = \"nope.xml\"\n").unwrap();
        assert!(matches!(
            config.request_builder(dir.path()),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn worker_config_requires_program() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::default().worker_config(dir.path()),
            Err(ConfigError::MissingAnalyzer)
        ));

        let config = Config::parse("[analyzer]\nprogram = \"/opt/analyzer/run\"\n").unwrap();
        let worker = config.worker_config(dir.path()).unwrap();
        assert_eq!(worker.program, PathBuf::from("/opt/analyzer/run"));
        assert_eq!(worker.timeout, Duration::from_secs(300));
        assert_eq!(worker.working_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn invalid_classpath_pattern() {
        let err = expand_classpath(Path::new("."), &["libs/[.jar".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
