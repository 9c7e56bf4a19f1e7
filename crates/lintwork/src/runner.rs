//! Runs one analysis for a project root and configuration.
//!
//! Used by the CLI and by build scripts that want a blocking entry point.
//! Sources are discovered from the configured patterns, the analyzer process
//! is configured from `[analyzer]`, and Ctrl-C cancels the run without
//! touching the cache.

use crate::discovery::{DiscoveryError, SourceDiscovery};
use lintwork_core::{
    AnalysisError, AnalysisOutcome, AnalysisRequest, AnalyzerWorker, Config, ConfigError,
    ConsoleOutput, Orchestrator, ProcessWorker, RuleSetCatalog,
};
use miette::Diagnostic;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Errors from preparing or running a check.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum CheckError {
    /// The configuration could not be turned into a request or worker.
    #[error(transparent)]
    #[diagnostic(
        code(lintwork::config),
        help("run `lintwork init` to create a starting configuration")
    )]
    Config(#[from] ConfigError),

    /// Source discovery failed.
    #[error(transparent)]
    #[diagnostic(code(lintwork::discovery))]
    Discovery(#[from] DiscoveryError),

    /// The async runtime could not be started.
    #[error("failed to start async runtime")]
    #[diagnostic(code(lintwork::runtime))]
    Runtime(#[source] std::io::Error),

    /// The analysis itself failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Analysis(#[from] AnalysisError),
}

impl From<lintwork_core::RequestError> for CheckError {
    fn from(e: lintwork_core::RequestError) -> Self {
        Self::Analysis(AnalysisError::InvalidRequest(e))
    }
}

/// Builds the request for `root` from `config`: discovers sources and
/// resolves every relative path against `root`. The console echo is only
/// enabled if `console_output` is also set in the configuration.
///
/// # Errors
///
/// Returns an error if a pattern is invalid, the rule configuration file is
/// unreadable or the request fails validation.
pub fn prepare_request(
    root: &Path,
    config: &Config,
    console: ConsoleOutput,
) -> Result<AnalysisRequest, CheckError> {
    let sources = SourceDiscovery::from_config(&config.analysis)?.discover(root)?;
    if sources.is_empty() {
        warn!(
            "No source files matched {:?} under {}",
            config.analysis.sources,
            root.display()
        );
    }

    let request = config
        .request_builder(root)?
        .sources(sources)
        .console(ConsoleOutput {
            enabled: console.enabled && config.analysis.console_output,
            colored: console.colored,
        })
        .build()?;
    debug!(
        "Prepared request: {} source(s), target {}",
        request.sources().len(),
        request.target_version()
    );
    Ok(request)
}

/// Runs a check with a caller-supplied worker and the built-in catalog.
///
/// # Errors
///
/// Returns an error if preparation or analysis fails. A `Failure` terminal
/// state is returned as `Ok`.
pub async fn check_with_worker<W: AnalyzerWorker>(
    root: &Path,
    config: &Config,
    console: ConsoleOutput,
    worker: W,
) -> Result<AnalysisOutcome, CheckError> {
    let request = prepare_request(root, config, console)?;
    let catalog: Arc<dyn RuleSetCatalog> = Arc::new(lintwork_rulesets::builtin_catalog());
    let orchestrator =
        Orchestrator::new(worker, catalog).with_options(config.execution_options());

    info!(
        "Checking {} with {} source file(s)",
        root.display(),
        request.sources().len()
    );
    Ok(orchestrator
        .run_until_cancelled(&request, interrupted())
        .await?)
}

/// Runs a check with the analyzer process from `[analyzer]`.
///
/// # Errors
///
/// Returns an error if no analyzer is configured, or if preparation or
/// analysis fails.
pub async fn check(
    root: &Path,
    config: &Config,
    console: ConsoleOutput,
) -> Result<AnalysisOutcome, CheckError> {
    let worker = ProcessWorker::new(config.worker_config(root)?);
    check_with_worker(root, config, console, worker).await
}

/// Blocking form of [`check`] on a fresh multi-threaded runtime.
///
/// # Errors
///
/// Returns an error if the runtime cannot be started, or as [`check`].
pub fn run_check(
    root: &Path,
    config: &Config,
    console: ConsoleOutput,
) -> Result<AnalysisOutcome, CheckError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CheckError::Runtime)?;
    runtime.block_on(check(root, config, console))
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Interrupted");
}
