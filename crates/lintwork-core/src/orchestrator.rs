//! Drives one analysis invocation.
//!
//! ```text
//! Init → ResolvingRules → PartitioningCache → {Dispatching → Merging}* → Reporting → Success | Failure
//! ```
//!
//! Files whose content fingerprint is in the cache are served from it; the
//! rest are split into batches and handed to the [`AnalyzerWorker`], at most
//! [`ExecutionOptions::parallelism`] batches at a time. Any worker error fails
//! the invocation; outstanding batches are aborted and the cache file is
//! left untouched.

use crate::cache::{CacheStats, FingerprintCache};
use crate::fingerprint::{CacheKey, SourceFingerprint};
use crate::request::{AnalysisRequest, RequestError};
use crate::ruleset::{ResolvedRuleSet, RuleSetCatalog, RuleSetError, RuleSetResolver};
use crate::types::{Violation, ViolationReport};
use crate::worker::{AnalyzerWorker, WorkerBatch, WorkerEnvironment, WorkerError, WorkerOutput};

use miette::Diagnostic;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Default number of files per analyzer batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Concurrency settings of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Maximum number of batches analyzed at once.
    pub parallelism: usize,
    /// Maximum number of files per batch.
    pub batch_size: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            parallelism: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Phases of an invocation, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Turning rule configuration into a rule set.
    ResolvingRules,
    /// Fingerprinting sources and querying the cache.
    PartitioningCache,
    /// Running analyzer batches.
    Dispatching,
    /// Combining cached and fresh results.
    Merging,
    /// Writing the cache and echoing the report.
    Reporting,
}

/// Final state of a completed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    /// No violations, or violations are ignored.
    Success,
    /// Violations were found and failures are not ignored.
    Failure,
}

/// Everything a completed invocation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    /// Merged, sorted report.
    pub report: ViolationReport,
    /// Result of the failure policy.
    pub terminal: TerminalState,
    /// Cache statistics.
    pub cache: CacheStats,
    /// Number of analyzer batches dispatched.
    pub batches: usize,
}

impl AnalysisOutcome {
    /// Whether the invocation passed the failure policy.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.terminal == TerminalState::Success
    }

    /// Converts a `Failure` into [`AnalysisError::ViolationsFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal state is `Failure`.
    pub fn into_result(self) -> Result<ViolationReport, AnalysisError> {
        match self.terminal {
            TerminalState::Success => Ok(self.report),
            TerminalState::Failure => Err(AnalysisError::ViolationsFound {
                count: self.report.violations.len(),
            }),
        }
    }
}

/// Errors that end an invocation.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum AnalysisError {
    /// The request failed validation.
    #[error(transparent)]
    #[diagnostic(code(lintwork::request::invalid))]
    InvalidRequest(#[from] RequestError),

    /// A named rule set or resource is not in the catalog.
    #[error("unknown rule set `{name}`")]
    #[diagnostic(
        code(lintwork::rules::unknown_set),
        help("run `lintwork list-rule-sets` to see the available sets")
    )]
    UnknownRuleSet {
        /// The name as configured.
        name: String,
    },

    /// A rule-set document is malformed.
    #[error("invalid rule set {origin}: {message}")]
    #[diagnostic(code(lintwork::rules::invalid_format))]
    InvalidRuleSetFormat {
        /// Path, resource or "inline configuration".
        origin: String,
        /// What is wrong.
        message: String,
    },

    /// A rule-set file could not be read.
    #[error("failed to read rule set file {}", .path.display())]
    #[diagnostic(code(lintwork::rules::io))]
    RuleSetUnreadable {
        /// The file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A source file could not be read for fingerprinting.
    #[error("failed to read source file {}", .path.display())]
    #[diagnostic(code(lintwork::source::unreadable))]
    SourceUnreadable {
        /// The file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An analyzer batch failed.
    #[error("analyzer batch {batch} failed")]
    #[diagnostic(
        code(lintwork::worker::failed),
        help("check the analyzer configuration in the [analyzer] section")
    )]
    WorkerFailed {
        /// Batch sequence number.
        batch: usize,
        /// What went wrong.
        #[source]
        source: WorkerError,
    },

    /// A batch task panicked.
    #[error("analyzer task aborted: {message}")]
    #[diagnostic(code(lintwork::worker::aborted))]
    WorkerAborted {
        /// Panic or cancellation message.
        message: String,
    },

    /// Violations were found and failures are not ignored.
    #[error("{count} rule violation(s) found")]
    #[diagnostic(
        code(lintwork::violations),
        help("set `ignore_failures = true` to report without failing")
    )]
    ViolationsFound {
        /// Number of violations.
        count: usize,
    },

    /// The invocation was cancelled before completing.
    #[error("analysis cancelled")]
    #[diagnostic(code(lintwork::cancelled))]
    Cancelled,
}

impl From<RuleSetError> for AnalysisError {
    fn from(err: RuleSetError) -> Self {
        match err {
            RuleSetError::UnknownRuleSet { name } => Self::UnknownRuleSet { name },
            RuleSetError::InvalidRuleSetFormat { origin, message } => {
                Self::InvalidRuleSetFormat { origin, message }
            }
            RuleSetError::Io { path, source } => Self::RuleSetUnreadable { path, source },
        }
    }
}

/// Runs analysis invocations with one worker and one rule-set catalog.
pub struct Orchestrator<W> {
    worker: Arc<W>,
    catalog: Arc<dyn RuleSetCatalog>,
    options: ExecutionOptions,
}

impl<W: AnalyzerWorker> Orchestrator<W> {
    /// Creates an orchestrator with default execution options.
    #[must_use]
    pub fn new(worker: W, catalog: Arc<dyn RuleSetCatalog>) -> Self {
        Self {
            worker: Arc::new(worker),
            catalog,
            options: ExecutionOptions::default(),
        }
    }

    /// Sets the execution options.
    #[must_use]
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// The worker.
    #[must_use]
    pub fn worker(&self) -> &W {
        &self.worker
    }

    /// The execution options.
    #[must_use]
    pub fn options(&self) -> ExecutionOptions {
        self.options
    }

    /// Runs one invocation to completion.
    ///
    /// Violations never produce an `Err`; they are reflected in
    /// [`AnalysisOutcome::terminal`].
    ///
    /// # Errors
    ///
    /// Returns an error if rule resolution fails, a source file cannot be
    /// read or any analyzer batch fails.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, AnalysisError> {
        debug!("Phase: {:?}", Phase::ResolvingRules);
        let rules = Arc::new(RuleSetResolver::new(self.catalog.as_ref()).resolve(request.rules())?);
        info!(
            "Resolved {} rule(s), fingerprint {}",
            rules.len(),
            rules.fingerprint()
        );

        let environment = request.environment_fingerprint();
        let cache = match request.cache_file() {
            Some(path) if request.incremental() => {
                FingerprintCache::open(path, rules.fingerprint().clone(), environment)
            }
            _ => FingerprintCache::disabled(rules.fingerprint().clone(), environment),
        };

        debug!("Phase: {:?}", Phase::PartitioningCache);
        let mut live: Vec<(PathBuf, SourceFingerprint)> = Vec::with_capacity(request.sources().len());
        let mut per_file: Vec<(PathBuf, Vec<Violation>)> = Vec::new();
        let mut misses: Vec<PathBuf> = Vec::new();

        for source in request.sources() {
            let content =
                tokio::fs::read(source)
                    .await
                    .map_err(|e| AnalysisError::SourceUnreadable {
                        path: source.clone(),
                        source: e,
                    })?;
            let fingerprint = SourceFingerprint::of_bytes(&content);
            let key = CacheKey::new(fingerprint.clone(), rules.fingerprint().clone());

            match cache.lookup(source, &key) {
                Some(violations) => per_file.push((source.clone(), violations)),
                None => misses.push(source.clone()),
            }
            live.push((source.clone(), fingerprint));
        }

        let from_cache = per_file.len();
        info!(
            "{} file(s) to analyze, {} served from cache",
            misses.len(),
            from_cache
        );

        let fingerprints: HashMap<&PathBuf, &SourceFingerprint> =
            live.iter().map(|(path, fp)| (path, fp)).collect();
        let environment = Arc::new(request.worker_environment());

        debug!("Phase: {:?}", Phase::Dispatching);
        let (batches, processing_errors) = {
            let mut processing_errors = Vec::new();
            let batches = self
                .dispatch(&misses, &rules, &environment, |files, output| {
                    debug!("Phase: {:?}", Phase::Merging);
                    let failed: HashSet<PathBuf> = output
                        .processing_errors
                        .iter()
                        .map(|e| e.file.clone())
                        .collect();
                    for error in &output.processing_errors {
                        warn!(
                            "{}: analyzer could not process file: {}",
                            error.file.display(),
                            error.message
                        );
                    }

                    let mut by_file: HashMap<PathBuf, Vec<Violation>> =
                        files.iter().map(|f| (f.clone(), Vec::new())).collect();
                    for violation in output.violations {
                        by_file
                            .entry(violation.file.clone())
                            .or_default()
                            .push(violation);
                    }

                    for (file, violations) in by_file {
                        if !failed.contains(&file) {
                            if let Some(fp) = fingerprints.get(&file) {
                                let key = CacheKey::new((*fp).clone(), rules.fingerprint().clone());
                                cache.update(&file, &key, &violations);
                            }
                        }
                        per_file.push((file, violations));
                    }
                    processing_errors.extend(output.processing_errors);
                })
                .await?;
            (batches, processing_errors)
        };

        let report =
            ViolationReport::merge(per_file, processing_errors).with_counts(misses.len(), from_cache);

        debug!("Phase: {:?}", Phase::Reporting);
        match cache.flush(&live) {
            Ok(written) if cache.is_enabled() => debug!("Cache updated with {} record(s)", written),
            Ok(_) => {}
            Err(e) => warn!("Failed to write cache: {}", e),
        }

        let console = request.console();
        if console.enabled {
            report.print_report(console.colored);
        }

        let terminal = if report.has_violations() && !request.ignore_failures() {
            TerminalState::Failure
        } else {
            TerminalState::Success
        };

        if report.has_violations() {
            if request.ignore_failures() {
                warn!(
                    "{} violation(s) found; failures are ignored",
                    report.violations.len()
                );
            } else {
                info!("{} violation(s) found", report.violations.len());
            }
        } else {
            info!("No violations found");
        }

        Ok(AnalysisOutcome {
            report,
            terminal,
            cache: cache.stats(),
            batches,
        })
    }

    /// Runs one invocation unless `cancel` completes first.
    ///
    /// On cancellation all outstanding batches are aborted (killing their
    /// analyzer processes) and the cache file is not written.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Cancelled`] if `cancel` wins, otherwise the
    /// same errors as [`Self::run`].
    pub async fn run_until_cancelled<F>(
        &self,
        request: &AnalysisRequest,
        cancel: F,
    ) -> Result<AnalysisOutcome, AnalysisError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            outcome = self.run(request) => outcome,
            () = cancel => {
                warn!("Analysis cancelled; cache left unchanged");
                Err(AnalysisError::Cancelled)
            }
        }
    }

    /// Runs the batches and feeds each successful output to `on_output` as it
    /// arrives. Returns the number of batches.
    async fn dispatch<F>(
        &self,
        misses: &[PathBuf],
        rules: &Arc<ResolvedRuleSet>,
        environment: &Arc<WorkerEnvironment>,
        mut on_output: F,
    ) -> Result<usize, AnalysisError>
    where
        F: FnMut(&[PathBuf], WorkerOutput),
    {
        if misses.is_empty() {
            return Ok(0);
        }

        let semaphore = Arc::new(Semaphore::new(self.options.parallelism.max(1)));
        let mut tasks = JoinSet::new();
        let mut batches = 0;

        for (id, files) in misses.chunks(self.options.batch_size.max(1)).enumerate() {
            let batch = WorkerBatch {
                id,
                files: files.to_vec(),
                rules: Arc::clone(rules),
                environment: Arc::clone(environment),
            };
            let worker = Arc::clone(&self.worker);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                debug!("Batch {}: analyzing {} file(s)", batch.id, batch.files.len());
                let result = worker.analyze(&batch).await;
                (batch, result)
            });
            batches += 1;
        }
        info!("Dispatched {} batch(es)", batches);

        while let Some(joined) = tasks.join_next().await {
            let (batch, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tasks.shutdown().await;
                    return Err(AnalysisError::WorkerAborted {
                        message: e.to_string(),
                    });
                }
            };

            match result {
                Ok(output) => {
                    debug!(
                        "Batch {}: {} violation(s), {} processing error(s)",
                        batch.id,
                        output.violations.len(),
                        output.processing_errors.len()
                    );
                    on_output(&batch.files, output);
                }
                Err(source) => {
                    warn!("Batch {} failed: {}; aborting remaining batches", batch.id, source);
                    tasks.shutdown().await;
                    return Err(AnalysisError::WorkerFailed {
                        batch: batch.id,
                        source,
                    });
                }
            }
        }

        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::{RuleDefinition, RuleSetDefinition, StaticCatalog};
    use crate::types::Priority;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn catalog() -> Arc<dyn RuleSetCatalog> {
        Arc::new(StaticCatalog::new().with_set(RuleSetDefinition::new(
            "errorprone",
            "",
            vec![RuleDefinition::new("EmptyCatchBlock", Priority::MEDIUM)],
        )))
    }

    /// Reports one violation per file whose content contains "catch {}".
    #[derive(Default)]
    struct ScanWorker {
        dispatched: AtomicUsize,
    }

    impl AnalyzerWorker for ScanWorker {
        async fn analyze(&self, batch: &WorkerBatch) -> Result<WorkerOutput, WorkerError> {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            let mut output = WorkerOutput::default();
            for file in &batch.files {
                let content = tokio::fs::read_to_string(file).await?;
                if content.contains("catch {}") {
                    output.violations.push(Violation::new(
                        file.clone(),
                        1,
                        "EmptyCatchBlock",
                        Priority::MEDIUM,
                        "empty catch",
                    ));
                }
            }
            Ok(output)
        }
    }

    struct FailingWorker;

    impl AnalyzerWorker for FailingWorker {
        async fn analyze(&self, _batch: &WorkerBatch) -> Result<WorkerOutput, WorkerError> {
            Err(WorkerError::AnalyzerFailed {
                status: "exit status: 1".to_string(),
                diagnostics: String::new(),
            })
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn request(dir: &TempDir, sources: Vec<PathBuf>, ignore: bool) -> AnalysisRequest {
        AnalysisRequest::builder()
            .sources(sources)
            .target_version("17")
            .rule_set("errorprone")
            .ignore_failures(ignore)
            .cache_file(dir.path().join("cache/lintwork.cache"))
            .build()
            .unwrap()
    }

    fn three_files(dir: &TempDir) -> Vec<PathBuf> {
        vec![
            write(dir.path(), "A.java", "class A {}"),
            write(dir.path(), "B.java", "class B { void f() { try {} catch {} } }"),
            write(dir.path(), "C.java", "class C {}"),
        ]
    }

    #[tokio::test]
    async fn violation_fails_unless_ignored() {
        let dir = TempDir::new().unwrap();
        let files = three_files(&dir);

        let orchestrator = Orchestrator::new(ScanWorker::default(), catalog());
        let failing = orchestrator
            .run(&request(&dir, files.clone(), false))
            .await
            .unwrap();
        assert_eq!(failing.terminal, TerminalState::Failure);
        assert_eq!(failing.report.violations.len(), 1);
        assert_eq!(failing.report.violations[0].file, files[1]);
        assert!(matches!(
            failing.into_result(),
            Err(AnalysisError::ViolationsFound { count: 1 })
        ));

        let ignoring = Orchestrator::new(ScanWorker::default(), catalog())
            .run(&request(&dir, files, true))
            .await
            .unwrap();
        assert_eq!(ignoring.terminal, TerminalState::Success);
        assert_eq!(ignoring.report.violations.len(), 1);
    }

    #[tokio::test]
    async fn batches_respect_batch_size() {
        let dir = TempDir::new().unwrap();
        let files: Vec<PathBuf> = (0..5)
            .map(|i| write(dir.path(), &format!("F{i}.java"), &format!("class F{i} {{}}")))
            .collect();

        let orchestrator = Orchestrator::new(ScanWorker::default(), catalog()).with_options(
            ExecutionOptions {
                parallelism: 2,
                batch_size: 2,
            },
        );
        let outcome = orchestrator.run(&request(&dir, files, false)).await.unwrap();
        assert_eq!(outcome.batches, 3);
        assert_eq!(orchestrator.worker().dispatched.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.report.files_analyzed, 5);
    }

    #[tokio::test]
    async fn worker_failure_is_fatal_and_keeps_cache() {
        let dir = TempDir::new().unwrap();
        let files = three_files(&dir);
        let req = request(&dir, files, true);

        let err = Orchestrator::new(FailingWorker, catalog())
            .run(&req)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::WorkerFailed {
                source: WorkerError::AnalyzerFailed { .. },
                ..
            }
        ));
        assert!(!req.cache_file().unwrap().exists());
    }

    #[tokio::test]
    async fn unreadable_source_is_fatal() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, vec![dir.path().join("Missing.java")], false);
        let err = Orchestrator::new(ScanWorker::default(), catalog())
            .run(&req)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::SourceUnreadable { .. }));
    }

    #[tokio::test]
    async fn unknown_rule_set_is_fatal() {
        let req = AnalysisRequest::builder()
            .target_version("17")
            .rule_set("nope")
            .incremental(false)
            .build()
            .unwrap();
        let err = Orchestrator::new(ScanWorker::default(), catalog())
            .run(&req)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownRuleSet { .. }));
    }

    #[tokio::test]
    async fn empty_source_set_succeeds_without_dispatch() {
        let dir = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(ScanWorker::default(), catalog());
        let outcome = orchestrator
            .run(&request(&dir, Vec::new(), false))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.batches, 0);
        assert_eq!(orchestrator.worker().dispatched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_returns_cancelled() {
        let dir = TempDir::new().unwrap();
        let files = three_files(&dir);
        let req = request(&dir, files, false);

        let err = Orchestrator::new(ScanWorker::default(), catalog())
            .run_until_cancelled(&req, std::future::ready(()))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
    }
}
