//! # lintwork
//!
//! Incremental static analysis for build pipelines.
//!
//! This is the facade crate: it re-exports the engine from `lintwork-core`,
//! the built-in catalog from `lintwork-rulesets`, and adds source discovery
//! plus a ready-made runner.
//!
//! ## Quick Start
//!
//! ```toml
//! # lintwork.toml
//! [analysis]
//! sources = ["src/main/java/**/*.java"]
//! rule_sets = ["errorprone", "bestpractices"]
//!
//! [analyzer]
//! program = "/opt/analyzer/bin/run"
//! classpath = ["/opt/analyzer/lib/*.jar"]
//! ```
//!
//! ```rust,ignore
//! use lintwork::{Config, ConsoleOutput};
//! use std::path::Path;
//!
//! let config = Config::from_file(Path::new("lintwork.toml"))?;
//! let outcome = lintwork::run_check(Path::new("."), &config, ConsoleOutput::default())?;
//! if !outcome.is_success() {
//!     std::process::exit(1);
//! }
//! ```
//!
//! ## Programmatic Usage
//!
//! Any [`AnalyzerWorker`] can stand in for the analyzer process:
//!
//! ```rust,ignore
//! let outcome = lintwork::check_with_worker(root, &config, console, MyWorker).await?;
//! ```

#![forbid(unsafe_code)]

pub use lintwork_core::*;

/// Built-in rule sets and packaged rule-set resources.
pub mod rulesets {
    pub use lintwork_rulesets::*;
}

mod discovery;
mod runner;

pub use discovery::{DiscoveryError, SourceDiscovery};
pub use runner::{check, check_with_worker, prepare_request, run_check, CheckError};
