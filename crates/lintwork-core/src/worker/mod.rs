//! Isolated analyzer execution.
//!
//! The orchestrator hands each batch of files to an [`AnalyzerWorker`]. The
//! production implementation is [`ProcessWorker`], which runs the external
//! analyzer as a child process with its own classpath and a minimal
//! environment. The project classpath travels separately as `auxclasspath`.

use crate::ruleset::ResolvedRuleSet;
use crate::types::{ProcessingError, Violation};

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod process;
pub mod protocol;

pub use process::{ProcessWorker, ProcessWorkerConfig};

/// Inputs shared by every batch of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerEnvironment {
    /// The analyzer's own libraries.
    pub analyzer_classpath: Vec<PathBuf>,
    /// The project classpath, passed to the analyzer for type resolution.
    pub auxclasspath: Vec<PathBuf>,
    /// Language level of the analyzed sources.
    pub target_version: String,
}

/// A group of files analyzed in one worker invocation.
#[derive(Debug, Clone)]
pub struct WorkerBatch {
    /// Sequence number within the invocation.
    pub id: usize,
    /// Files to analyze.
    pub files: Vec<PathBuf>,
    /// Rules to apply.
    pub rules: Arc<ResolvedRuleSet>,
    /// Classpaths and target version.
    pub environment: Arc<WorkerEnvironment>,
}

/// Results of one successful batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerOutput {
    /// Violations, each naming a file of the batch.
    pub violations: Vec<Violation>,
    /// Files the analyzer could not process.
    pub processing_errors: Vec<ProcessingError>,
}

/// Runs the analyzer over one batch.
///
/// A returned error fails the whole batch; implementations must not report
/// partial results.
pub trait AnalyzerWorker: Send + Sync + 'static {
    /// Analyzes every file of `batch` with its rule set.
    fn analyze(
        &self,
        batch: &WorkerBatch,
    ) -> impl Future<Output = Result<WorkerOutput, WorkerError>> + Send;
}

/// Worker failures. Every variant fails the invocation.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The analyzer could not be started.
    #[error("failed to start analyzer `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The analyzer crashed or exited with an unexpected status.
    #[error("analyzer failed ({status}){}", format_diagnostics(.diagnostics))]
    AnalyzerFailed {
        /// Exit status description.
        status: String,
        /// Captured (truncated) stderr.
        diagnostics: String,
    },

    /// The analyzer's output could not be interpreted.
    #[error("malformed analyzer output: {reason}")]
    MalformedOutput {
        /// What is wrong with the output.
        reason: String,
    },

    /// The analyzer exceeded its wall-clock budget and was killed.
    #[error("analyzer timed out after {}s", .budget.as_secs_f64())]
    TimedOut {
        /// The configured budget.
        budget: Duration,
    },

    /// The analyzer classpath cannot be passed to a child process.
    #[error("invalid analyzer classpath: {0}")]
    InvalidClasspath(String),

    /// IO failure while talking to the analyzer.
    #[error("analyzer IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_diagnostics(diagnostics: &str) -> String {
    let trimmed = diagnostics.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
