//! Rule-set resolution.
//!
//! ```text
//! named sets ──┐
//! rule-set files ─┼─► RuleSetResolver ─► ResolvedRuleSet (sorted, fingerprinted)
//! inline config ─┘        ▲
//!                  RuleSetCatalog
//! ```

use std::path::PathBuf;

pub mod catalog;
pub mod model;
pub mod resolver;
pub mod xml;

pub use catalog::{RuleSetCatalog, StaticCatalog};
pub use model::{
    DuplicatePolicy, ResolvedRule, ResolvedRuleSet, RuleDefinition, RuleSetDefinition,
};
pub use resolver::{RuleConfig, RuleSetResolver, RuleSetSource};

/// Errors from resolving rule configuration. All of them abort the invocation.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    /// A named set (or packaged resource) is not in the catalog.
    #[error("unknown rule set `{name}`")]
    UnknownRuleSet {
        /// The name as written in the configuration.
        name: String,
    },

    /// A rule-set document is malformed.
    #[error("invalid rule set {origin}: {message}")]
    InvalidRuleSetFormat {
        /// Path, resource name or "inline configuration".
        origin: String,
        /// What is wrong.
        message: String,
    },

    /// A rule-set file could not be read.
    #[error("failed to read rule set file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}
