//! The immutable input of one analysis invocation.

use crate::fingerprint::EnvironmentFingerprint;
use crate::ruleset::{DuplicatePolicy, RuleConfig, RuleSetSource};
use crate::types::Priority;
use crate::worker::WorkerEnvironment;

use std::path::{Path, PathBuf};

/// Errors from [`AnalysisRequestBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// No target language version was given.
    #[error("target version must not be empty")]
    EmptyTargetVersion,

    /// Incremental analysis is on but no cache location was given.
    #[error("incremental analysis requires a cache file location")]
    MissingCacheFile,

    /// A path is on both the analyzer classpath and the project classpath.
    #[error("{} is on both the analyzer classpath and the project classpath", .entry.display())]
    ClasspathOverlap {
        /// The shared entry.
        entry: PathBuf,
    },
}

/// Console echo of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleOutput {
    /// Print the report after analysis.
    pub enabled: bool,
    /// Use ANSI colors (only when stdout is a terminal).
    pub colored: bool,
}

/// Everything one invocation needs. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    sources: Vec<PathBuf>,
    project_classpath: Vec<PathBuf>,
    analyzer_classpath: Vec<PathBuf>,
    target_version: String,
    rules: RuleConfig,
    console: ConsoleOutput,
    ignore_failures: bool,
    incremental: bool,
    cache_file: Option<PathBuf>,
}

impl AnalysisRequest {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> AnalysisRequestBuilder {
        AnalysisRequestBuilder::default()
    }

    /// Source files, de-duplicated and sorted.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Project classpath, handed to the analyzer as `auxclasspath`.
    #[must_use]
    pub fn project_classpath(&self) -> &[PathBuf] {
        &self.project_classpath
    }

    /// The analyzer's own classpath.
    #[must_use]
    pub fn analyzer_classpath(&self) -> &[PathBuf] {
        &self.analyzer_classpath
    }

    /// Target language version.
    #[must_use]
    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    /// Rule configuration.
    #[must_use]
    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    /// Console settings.
    #[must_use]
    pub fn console(&self) -> ConsoleOutput {
        self.console
    }

    /// Whether violations are reported without failing.
    #[must_use]
    pub fn ignore_failures(&self) -> bool {
        self.ignore_failures
    }

    /// Whether the fingerprint cache is used.
    #[must_use]
    pub fn incremental(&self) -> bool {
        self.incremental
    }

    /// Cache file location.
    #[must_use]
    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    /// Classpaths and target version for the worker.
    #[must_use]
    pub fn worker_environment(&self) -> WorkerEnvironment {
        WorkerEnvironment {
            analyzer_classpath: self.analyzer_classpath.clone(),
            auxclasspath: self.project_classpath.clone(),
            target_version: self.target_version.clone(),
        }
    }

    /// Fingerprint of the environment the analyzer runs in.
    #[must_use]
    pub fn environment_fingerprint(&self) -> EnvironmentFingerprint {
        EnvironmentFingerprint::compute(
            &self.target_version,
            &self.analyzer_classpath,
            &self.project_classpath,
        )
    }
}

/// Validating builder for [`AnalysisRequest`].
#[derive(Debug, Clone)]
pub struct AnalysisRequestBuilder {
    sources: Vec<PathBuf>,
    project_classpath: Vec<PathBuf>,
    analyzer_classpath: Vec<PathBuf>,
    target_version: String,
    rules: RuleConfig,
    console: ConsoleOutput,
    ignore_failures: bool,
    incremental: bool,
    cache_file: Option<PathBuf>,
}

impl Default for AnalysisRequestBuilder {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            project_classpath: Vec::new(),
            analyzer_classpath: Vec::new(),
            target_version: String::new(),
            rules: RuleConfig::default(),
            console: ConsoleOutput::default(),
            ignore_failures: false,
            incremental: true,
            cache_file: None,
        }
    }
}

impl AnalysisRequestBuilder {
    /// Adds source files.
    #[must_use]
    pub fn sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Sets the project classpath.
    #[must_use]
    pub fn project_classpath(mut self, entries: Vec<PathBuf>) -> Self {
        self.project_classpath = entries;
        self
    }

    /// Sets the analyzer classpath.
    #[must_use]
    pub fn analyzer_classpath(mut self, entries: Vec<PathBuf>) -> Self {
        self.analyzer_classpath = entries;
        self
    }

    /// Sets the target language version.
    #[must_use]
    pub fn target_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = version.into();
        self
    }

    /// Replaces the whole rule configuration.
    #[must_use]
    pub fn rules(mut self, rules: RuleConfig) -> Self {
        self.rules = rules;
        self
    }

    /// Adds a built-in rule set by name.
    #[must_use]
    pub fn rule_set(mut self, name: impl Into<String>) -> Self {
        self.rules.rule_sets.push(name.into());
        self
    }

    /// Adds a rule-set file or resource.
    #[must_use]
    pub fn rule_set_file(mut self, source: RuleSetSource) -> Self {
        self.rules.rule_set_files.push(source);
        self
    }

    /// Sets inline rule-set content.
    #[must_use]
    pub fn inline_rules(mut self, content: impl Into<String>) -> Self {
        self.rules.inline = Some(content.into());
        self
    }

    /// Sets the priority threshold.
    #[must_use]
    pub fn priority_threshold(mut self, threshold: Priority) -> Self {
        self.rules.threshold = threshold;
        self
    }

    /// Sets the duplicate-rule policy.
    #[must_use]
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.rules.duplicate_policy = policy;
        self
    }

    /// Sets console output.
    #[must_use]
    pub fn console(mut self, console: ConsoleOutput) -> Self {
        self.console = console;
        self
    }

    /// Sets the ignore-failures flag.
    #[must_use]
    pub fn ignore_failures(mut self, ignore: bool) -> Self {
        self.ignore_failures = ignore;
        self
    }

    /// Sets the incremental flag (default on).
    #[must_use]
    pub fn incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Sets the cache file location.
    #[must_use]
    pub fn cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    /// Validates and builds the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the target version is empty, incremental analysis
    /// has no cache location, or the two classpaths share an entry.
    pub fn build(self) -> Result<AnalysisRequest, RequestError> {
        let target_version = self.target_version.trim().to_string();
        if target_version.is_empty() {
            return Err(RequestError::EmptyTargetVersion);
        }
        if self.incremental && self.cache_file.is_none() {
            return Err(RequestError::MissingCacheFile);
        }
        if let Some(entry) = self
            .analyzer_classpath
            .iter()
            .find(|e| self.project_classpath.contains(e))
        {
            return Err(RequestError::ClasspathOverlap {
                entry: entry.clone(),
            });
        }

        let mut sources = self.sources;
        sources.sort();
        sources.dedup();

        Ok(AnalysisRequest {
            sources,
            project_classpath: self.project_classpath,
            analyzer_classpath: self.analyzer_classpath,
            target_version,
            rules: self.rules,
            console: self.console,
            ignore_failures: self.ignore_failures,
            incremental: self.incremental,
            cache_file: self.cache_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AnalysisRequestBuilder {
        AnalysisRequest::builder()
            .target_version("17")
            .cache_file("build/lintwork.cache")
    }

    #[test]
    fn test_builder() {
        let request = base()
            .sources(["src/B.java", "src/A.java", "src/B.java"])
            .rule_set("errorprone")
            .priority_threshold(Priority::MEDIUM)
            .ignore_failures(true)
            .build()
            .unwrap();

        assert_eq!(
            request.sources(),
            &[PathBuf::from("src/A.java"), PathBuf::from("src/B.java")]
        );
        assert_eq!(request.rules().rule_sets, vec!["errorprone".to_string()]);
        assert_eq!(request.rules().threshold, Priority::MEDIUM);
        assert!(request.ignore_failures());
        assert!(request.incremental());
        assert!(!request.console().enabled);
    }

    #[test]
    fn rejects_empty_target_version() {
        let err = AnalysisRequest::builder()
            .target_version("  ")
            .incremental(false)
            .build()
            .unwrap_err();
        assert_eq!(err, RequestError::EmptyTargetVersion);
    }

    #[test]
    fn incremental_needs_cache_file() {
        let err = AnalysisRequest::builder()
            .target_version("17")
            .build()
            .unwrap_err();
        assert_eq!(err, RequestError::MissingCacheFile);

        let ok = AnalysisRequest::builder()
            .target_version("17")
            .incremental(false)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn classpaths_must_be_disjoint() {
        let shared = PathBuf::from("libs/guava.jar");
        let err = base()
            .analyzer_classpath(vec![PathBuf::from("/opt/a.jar"), shared.clone()])
            .project_classpath(vec![shared.clone()])
            .build()
            .unwrap_err();
        assert_eq!(err, RequestError::ClasspathOverlap { entry: shared });
    }

    #[test]
    fn worker_environment_keeps_classpaths_apart() {
        let request = base()
            .analyzer_classpath(vec![PathBuf::from("/opt/a.jar")])
            .project_classpath(vec![PathBuf::from("libs/dep.jar")])
            .build()
            .unwrap();
        let env = request.worker_environment();
        assert_eq!(env.analyzer_classpath, vec![PathBuf::from("/opt/a.jar")]);
        assert_eq!(env.auxclasspath, vec![PathBuf::from("libs/dep.jar")]);
        assert_eq!(env.target_version, "17");
    }
}
