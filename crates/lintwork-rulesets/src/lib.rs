//! # lintwork-rulesets
//!
//! Built-in rule-set catalog for lintwork.
//!
//! ## Available Sets
//!
//! | Name | Alias | Description |
//! |------|-------|-------------|
//! | `bestpractices` | `category/java/bestpractices.xml` | Generally accepted best practices |
//! | `codestyle` | `category/java/codestyle.xml` | Naming and formatting conventions |
//! | `design` | `category/java/design.xml` | Structural problems |
//! | `documentation` | `category/java/documentation.xml` | Comment requirements |
//! | `errorprone` | `category/java/errorprone.xml` | Likely bugs |
//! | `multithreading` | `category/java/multithreading.xml` | Concurrency hazards |
//! | `performance` | `category/java/performance.xml` | Inefficient code |
//! | `security` | `category/java/security.xml` | Potential vulnerabilities |
//!
//! Packaged rule-set documents are available as `resource:rulesets/quickstart.xml`
//! and `resource:rulesets/strict.xml`.
//!
//! ## Usage
//!
//! ```ignore
//! use lintwork_core::{Orchestrator, RuleSetCatalog};
//! use std::sync::Arc;
//!
//! let catalog: Arc<dyn RuleSetCatalog> = Arc::new(lintwork_rulesets::builtin_catalog());
//! let orchestrator = Orchestrator::new(worker, catalog);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod sets;

pub use sets::{
    all_sets, best_practices, code_style, design, documentation, error_prone, multithreading,
    performance, security, SET_NAMES,
};

use lintwork_core::StaticCatalog;
use tracing::debug;

/// Rule sets used when the configuration names none.
pub const DEFAULT_RULE_SETS: &[&str] = &["errorprone"];

/// Packaged rule-set documents, by resource name.
pub const RESOURCES: &[(&str, &str)] = &[
    (
        "rulesets/quickstart.xml",
        include_str!("../resources/rulesets/quickstart.xml"),
    ),
    (
        "rulesets/strict.xml",
        include_str!("../resources/rulesets/strict.xml"),
    ),
];

/// Prefix of the long alias form of set names.
const ALIAS_PREFIX: &str = "category/java/";

/// Builds the catalog of all built-in sets, their aliases and packaged
/// resources.
#[must_use]
pub fn builtin_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    for set in all_sets() {
        let name = set.name().to_string();
        catalog = catalog
            .with_alias(format!("{ALIAS_PREFIX}{name}.xml"), name.clone())
            .with_set(set);
    }
    for (name, content) in RESOURCES {
        catalog = catalog.with_resource(*name, *content);
    }
    debug!(
        "Built-in catalog: {} rule set(s), {} resource(s)",
        SET_NAMES.len(),
        RESOURCES.len()
    );
    catalog
}
