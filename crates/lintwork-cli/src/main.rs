//! lintwork CLI tool.
//!
//! Usage:
//! ```bash
//! lintwork check [OPTIONS] [PATH]
//! lintwork list-rule-sets
//! lintwork init
//! lintwork cache info|clear
//! ```
//!
//! Exit codes: 0 success, 1 rule violations, 2 any other error.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Incremental static analysis with cached, isolated analyzer runs
#[derive(Parser)]
#[command(name = "lintwork")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "LINTWORK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the project's sources
    Check {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Report violations without failing
        #[arg(long)]
        ignore_failures: bool,

        /// Analyze every file, neither reading nor writing the cache
        #[arg(long)]
        no_incremental: bool,

        /// Rule sets to apply instead of the configured ones (comma-separated)
        #[arg(long, value_delimiter = ',')]
        rule_sets: Option<Vec<String>>,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// List built-in rule sets and packaged rule-set resources
    ListRuleSets {
        /// Also list the rules in each set
        #[arg(long)]
        rules: bool,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Inspect or remove the incremental cache
    Cache {
        /// Project root (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum CacheAction {
    /// Show the cache file's header and record counts
    Info,
    /// Delete the cache file
    Clear,
}

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report.
    #[default]
    Text,
    /// JSON document with the report, terminal state and cache statistics.
    Json,
    /// One line per violation.
    Compact,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(commands::EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Check {
            path,
            format,
            ignore_failures,
            no_incremental,
            rule_sets,
            exclude,
        } => {
            let overrides = commands::check::Overrides {
                ignore_failures,
                no_incremental,
                rule_sets,
                exclude,
            };
            let source = config_resolver::resolve(&path, config);
            commands::check::run(&path, format, &overrides, &source)
        }
        Commands::ListRuleSets { rules } => {
            commands::list_rule_sets::run(rules);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { force } => {
            commands::init::run(std::path::Path::new("."), force)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cache { path, action } => {
            let source = config_resolver::resolve(&path, config);
            match action {
                CacheAction::Info => commands::cache::info(&path, &source)?,
                CacheAction::Clear => commands::cache::clear(&path, &source)?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
