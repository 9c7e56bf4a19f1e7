//! Check command implementation.

use anyhow::Result;
use lintwork::{AnalysisError, Config, ConsoleOutput, TerminalState};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_VIOLATIONS};
use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Command-line settings that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ignore_failures: bool,
    pub no_incremental: bool,
    pub rule_sets: Option<Vec<String>>,
    pub exclude: Vec<String>,
}

impl Overrides {
    /// Applies the overrides to a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if self.ignore_failures {
            config.analysis.ignore_failures = true;
        }
        if self.no_incremental {
            config.analysis.incremental = false;
        }
        if let Some(sets) = &self.rule_sets {
            config.analysis.rule_sets = sets
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        config.analysis.exclude.extend(self.exclude.iter().cloned());
    }
}

/// Runs the check command.
pub fn run(
    path: &Path,
    format: OutputFormat,
    overrides: &Overrides,
    source: &ConfigSource,
) -> Result<ExitCode> {
    let mut config = source.load()?;
    overrides.apply(&mut config);

    let console = ConsoleOutput {
        enabled: format == OutputFormat::Text,
        colored: std::io::stdout().is_terminal(),
    };

    let outcome = match lintwork::run_check(path, &config, console) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            return Ok(ExitCode::from(EXIT_ERROR));
        }
    };

    if format != OutputFormat::Text {
        super::output::print(&outcome, format)?;
    }

    let stats = outcome.cache;
    if config.analysis.incremental {
        tracing::info!(
            "Cache: {} hit(s), {} miss(es) ({:.0}% hit rate), {} batch(es) run",
            stats.hits,
            stats.misses,
            stats.hit_rate(),
            outcome.batches
        );
    }

    match outcome.terminal {
        TerminalState::Success => Ok(ExitCode::SUCCESS),
        TerminalState::Failure => {
            let count = outcome.report.violations.len();
            eprintln!(
                "{:?}",
                miette::Report::new(AnalysisError::ViolationsFound { count })
            );
            Ok(ExitCode::from(EXIT_VIOLATIONS))
        }
    }
}
