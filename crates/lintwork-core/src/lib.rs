//! # lintwork-core
//!
//! Incremental static-analysis engine.
//!
//! An external analyzer is run over a set of source files; results are cached
//! per file content so unchanged files are not analyzed again. This crate
//! provides:
//!
//! - [`RuleSetResolver`] turning rule configuration into a [`ResolvedRuleSet`]
//! - [`FingerprintCache`] mapping content fingerprints to violation lists
//! - [`AnalyzerWorker`] and the out-of-process [`ProcessWorker`]
//! - [`Orchestrator`] combining the three and applying the failure policy
//!
//! ## Example
//!
//! ```ignore
//! use lintwork_core::{AnalysisRequest, Orchestrator, ProcessWorker, ProcessWorkerConfig};
//!
//! let request = AnalysisRequest::builder()
//!     .sources(["src/main/java/App.java"])
//!     .target_version("17")
//!     .rule_set("errorprone")
//!     .cache_file("build/lintwork/incremental.cache")
//!     .build()?;
//!
//! let worker = ProcessWorker::new(ProcessWorkerConfig::new("/opt/analyzer/bin/run"));
//! let outcome = Orchestrator::new(worker, catalog).run(&request).await?;
//! outcome.report.print_report(false);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
mod config;
mod fingerprint;
mod orchestrator;
mod request;
pub mod ruleset;
mod types;
pub mod worker;

pub use cache::{CacheError, CacheStats, FingerprintCache, LoadState};
pub use config::{expand_classpath, AnalysisConfig, AnalyzerConfig, Config, ConfigError};
pub use fingerprint::{CacheKey, EnvironmentFingerprint, RuleSetFingerprint, SourceFingerprint};
pub use orchestrator::{
    AnalysisError, AnalysisOutcome, ExecutionOptions, Orchestrator, Phase, TerminalState,
    DEFAULT_BATCH_SIZE,
};
pub use request::{AnalysisRequest, AnalysisRequestBuilder, ConsoleOutput, RequestError};
pub use ruleset::{
    DuplicatePolicy, ResolvedRule, ResolvedRuleSet, RuleConfig, RuleDefinition, RuleSetCatalog,
    RuleSetDefinition, RuleSetError, RuleSetResolver, RuleSetSource, StaticCatalog,
};
pub use types::{Priority, PriorityError, ProcessingError, Violation, ViolationReport};
pub use worker::{
    AnalyzerWorker, ProcessWorker, ProcessWorkerConfig, WorkerBatch, WorkerEnvironment,
    WorkerError, WorkerOutput,
};
