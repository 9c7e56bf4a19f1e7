//! Out-of-process analyzer worker.

use super::protocol::{self, WorkerRequest};
use super::{AnalyzerWorker, WorkerBatch, WorkerError, WorkerOutput};

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Default wall-clock budget per batch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Exit code the analyzer uses for "completed, violations found".
pub const DEFAULT_VIOLATION_EXIT_CODE: i32 = 4;

const MAX_DIAGNOSTIC_BYTES: usize = 4096;

/// How to launch the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessWorkerConfig {
    /// Analyzer executable.
    pub program: PathBuf,
    /// Fixed arguments.
    pub args: Vec<String>,
    /// Budget per batch; the process is killed when it runs out.
    pub timeout: Duration,
    /// Parent environment variables passed through to the analyzer.
    pub inherit_env: Vec<String>,
    /// Exit codes other than 0 that still mean success.
    pub violation_exit_codes: Vec<i32>,
    /// Working directory of the analyzer.
    pub working_dir: Option<PathBuf>,
}

impl ProcessWorkerConfig {
    /// Creates a config with default timeout and exit codes.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            inherit_env: Vec::new(),
            violation_exit_codes: vec![DEFAULT_VIOLATION_EXIT_CODE],
            working_dir: None,
        }
    }

    /// Sets the fixed arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-batch budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the environment allow-list.
    #[must_use]
    pub fn with_inherit_env<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherit_env = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the exit codes accepted besides 0.
    #[must_use]
    pub fn with_violation_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.violation_exit_codes = codes;
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Runs each batch in a fresh child process.
///
/// The child starts from an empty environment. It gets `CLASSPATH` set to the
/// analyzer classpath and the variables named in
/// [`ProcessWorkerConfig::inherit_env`], nothing else. Dropping the
/// in-flight future (timeout or cancellation) kills the child.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    config: ProcessWorkerConfig,
}

impl ProcessWorker {
    /// Creates a worker.
    #[must_use]
    pub fn new(config: ProcessWorkerConfig) -> Self {
        Self { config }
    }

    /// The launch configuration.
    #[must_use]
    pub fn config(&self) -> &ProcessWorkerConfig {
        &self.config
    }

    fn command(&self, batch: &WorkerBatch) -> Result<Command, WorkerError> {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let classpath = &batch.environment.analyzer_classpath;
        if !classpath.is_empty() {
            let joined = std::env::join_paths(classpath)
                .map_err(|e| WorkerError::InvalidClasspath(e.to_string()))?;
            command.env("CLASSPATH", joined);
        }

        for name in &self.config.inherit_env {
            if let Some(value) = std::env::var_os(name) {
                command.env(name, value);
            }
        }

        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        Ok(command)
    }

    fn accepts(&self, code: Option<i32>) -> bool {
        match code {
            Some(0) => true,
            Some(code) => self.config.violation_exit_codes.contains(&code),
            None => false,
        }
    }
}

impl AnalyzerWorker for ProcessWorker {
    async fn analyze(&self, batch: &WorkerBatch) -> Result<WorkerOutput, WorkerError> {
        let request = serde_json::to_vec(&WorkerRequest::for_batch(batch)).map_err(|e| {
            WorkerError::MalformedOutput {
                reason: format!("cannot encode request: {e}"),
            }
        })?;

        let mut child = self
            .command(batch)?
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;
        debug!(
            "Batch {}: started analyzer for {} file(s)",
            batch.id,
            batch.files.len()
        );

        let stdin = child.stdin.take();
        let run = async move {
            let write = async {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(&request).await?;
                    stdin.shutdown().await?;
                }
                Ok::<(), std::io::Error>(())
            };
            let (written, output) = tokio::join!(write, child.wait_with_output());
            if let Err(e) = written {
                // The analyzer may exit before reading its input; its status decides.
                debug!("Batch {}: writing request failed: {}", batch.id, e);
            }
            output
        };

        let output = tokio::time::timeout(self.config.timeout, run)
            .await
            .map_err(|_| WorkerError::TimedOut {
                budget: self.config.timeout,
            })??;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !self.accepts(output.status.code()) {
            return Err(WorkerError::AnalyzerFailed {
                status: output.status.to_string(),
                diagnostics: truncate(&stderr, MAX_DIAGNOSTIC_BYTES),
            });
        }
        if !stderr.trim().is_empty() {
            debug!("Batch {}: analyzer stderr: {}", batch.id, stderr.trim());
        }

        protocol::parse_response(&output.stdout, &batch.files)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… [truncated]", &text[..end])
}
