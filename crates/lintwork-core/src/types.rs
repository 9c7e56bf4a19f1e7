//! Core types for violations and reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Rule priority: 1 (most severe) through 5 (least severe).
///
/// The same scale is used for rule definitions, the configured threshold and
/// the violations reported by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// The most severe priority.
    pub const HIGHEST: Self = Self(1);
    /// The default priority for rules that do not declare one.
    pub const MEDIUM: Self = Self(3);
    /// The least severe priority.
    pub const LOWEST: Self = Self(5);

    /// Creates a priority from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, PriorityError> {
        match u8::try_from(value) {
            Ok(v @ 1..=5) => Ok(Self(v)),
            _ => Err(PriorityError::OutOfRange(value)),
        }
    }

    /// Returns the numeric value.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Whether a rule at this priority survives the given threshold.
    #[must_use]
    pub fn is_within(self, threshold: Self) -> bool {
        self.0 <= threshold.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl TryFrom<i64> for Priority {
    type Error = PriorityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.0
    }
}

impl FromStr for Priority {
    type Err = PriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| PriorityError::NotANumber(s.to_string()))?;
        Self::new(value)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Invalid priority values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriorityError {
    /// Numeric value outside `1..=5`.
    #[error("priority {0} is out of range, expected 1 (highest) to 5 (lowest)")]
    OutOfRange(i64),

    /// Value is not an integer.
    #[error("priority `{0}` is not a number")]
    NotANumber(String),
}

/// A single rule breach reported for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Path of the offending source file, as given in the request.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed), when the analyzer reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Rule identifier (e.g., "EmptyCatchBlock").
    pub rule: String,
    /// Priority of the breached rule.
    pub priority: Priority,
    /// Human-readable message.
    pub message: String,
}

impl Violation {
    /// Creates a new violation without column information.
    #[must_use]
    pub fn new(
        file: impl Into<PathBuf>,
        line: usize,
        rule: impl Into<String>,
        priority: Priority,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column: None,
            rule: rule.into(),
            priority,
            message: message.into(),
        }
    }

    /// Sets the column.
    #[must_use]
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Formats the violation for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        let position = match self.column {
            Some(column) => format!("{}:{}:{column}", self.file.display(), self.line),
            None => format!("{}:{}", self.file.display(), self.line),
        };
        format!(
            "{position}: [P{}] {} {}",
            self.priority, self.rule, self.message
        )
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

/// A file the analyzer could not process (e.g., a syntax error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingError {
    /// File that failed.
    pub file: PathBuf,
    /// Analyzer-provided reason.
    pub message: String,
}

/// The merged, ordered result of one invocation.
///
/// Violations are sorted by file path, then line, then column. The order does
/// not depend on which files were served from the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationReport {
    /// All violations, sorted.
    pub violations: Vec<Violation>,
    /// Files the analyzer reported as unprocessable, sorted by path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processing_errors: Vec<ProcessingError>,
    /// Number of files sent to the analyzer.
    pub files_analyzed: usize,
    /// Number of files served from the cache.
    pub files_from_cache: usize,
}

impl ViolationReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a report from per-file violation lists.
    ///
    /// Each file contributes its list as a whole; a file listed twice keeps the
    /// last list. The resulting order is independent of iteration order.
    #[must_use]
    pub fn merge<I>(per_file: I, mut processing_errors: Vec<ProcessingError>) -> Self
    where
        I: IntoIterator<Item = (PathBuf, Vec<Violation>)>,
    {
        let by_file: BTreeMap<PathBuf, Vec<Violation>> = per_file.into_iter().collect();

        let mut violations: Vec<Violation> = by_file.into_values().flatten().collect();
        violations.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.line.cmp(&b.line))
                .then(a.column.cmp(&b.column))
        });

        processing_errors.sort_by(|a, b| a.file.cmp(&b.file));

        Self {
            violations,
            processing_errors,
            files_analyzed: 0,
            files_from_cache: 0,
        }
    }

    /// Sets the analyzed / cached file counts.
    #[must_use]
    pub fn with_counts(mut self, files_analyzed: usize, files_from_cache: usize) -> Self {
        self.files_analyzed = files_analyzed;
        self.files_from_cache = files_from_cache;
        self
    }

    /// Returns true if any violation was reported.
    #[must_use]
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Total number of files covered by this report.
    #[must_use]
    pub fn files_checked(&self) -> usize {
        self.files_analyzed + self.files_from_cache
    }

    /// Counts violations per priority; index 0 holds priority 1.
    #[must_use]
    pub fn count_by_priority(&self) -> [usize; 5] {
        let mut counts = [0; 5];
        for v in &self.violations {
            counts[usize::from(v.priority.get() - 1)] += 1;
        }
        counts
    }

    /// Renders the report for a console, optionally with ANSI colors.
    #[must_use]
    pub fn render_console(&self, colored: bool) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for v in &self.violations {
            if colored {
                let color = match v.priority.get() {
                    1 | 2 => "\x1b[31m",
                    3 => "\x1b[33m",
                    _ => "\x1b[34m",
                };
                let _ = writeln!(out, "{color}{v}\x1b[0m");
            } else {
                let _ = writeln!(out, "{v}");
            }
        }

        for e in &self.processing_errors {
            let _ = writeln!(
                out,
                "{}: processing error: {}",
                e.file.display(),
                e.message
            );
        }

        let _ = writeln!(
            out,
            "Found {} violation(s) in {} file(s) ({} from cache)",
            self.violations.len(),
            self.files_checked(),
            self.files_from_cache
        );
        out
    }

    /// Prints the report to stdout.
    pub fn print_report(&self, colored: bool) {
        print!("{}", self.render_console(colored));
    }
}
