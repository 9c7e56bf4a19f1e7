//! JSON messages exchanged with the analyzer process.
//!
//! Request (stdin):
//!
//! ```json
//! {"protocol":1,"target_version":"17","files":["src/A.java"],
//!  "auxclasspath":["libs/x.jar"],"rules":[{"id":"EmptyCatchBlock","priority":3}]}
//! ```
//!
//! Response (stdout):
//!
//! ```json
//! {"violations":[{"file":"src/A.java","line":12,"rule":"EmptyCatchBlock","priority":3,"message":"…"}],
//!  "errors":[{"file":"src/B.java","message":"parse error"}]}
//! ```

use super::{WorkerBatch, WorkerError, WorkerOutput};
use crate::ruleset::ResolvedRule;
use crate::types::{ProcessingError, Violation};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: u32 = 1;

/// A batch request as written to the analyzer's stdin.
#[derive(Debug, Serialize)]
pub struct WorkerRequest<'a> {
    /// Always [`PROTOCOL_VERSION`].
    pub protocol: u32,
    /// Language level.
    pub target_version: &'a str,
    /// Files to analyze.
    pub files: &'a [PathBuf],
    /// Project classpath for type resolution.
    pub auxclasspath: &'a [PathBuf],
    /// Rules to apply, sorted by identifier.
    pub rules: &'a [ResolvedRule],
}

impl<'a> WorkerRequest<'a> {
    /// Builds the request for a batch.
    #[must_use]
    pub fn for_batch(batch: &'a WorkerBatch) -> Self {
        Self {
            protocol: PROTOCOL_VERSION,
            target_version: &batch.environment.target_version,
            files: &batch.files,
            auxclasspath: &batch.environment.auxclasspath,
            rules: batch.rules.rules(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkerResponse {
    violations: Vec<Violation>,
    #[serde(default)]
    errors: Vec<ProcessingError>,
}

/// Parses and validates the analyzer's stdout for a batch.
///
/// # Errors
///
/// Returns [`WorkerError::MalformedOutput`] if the output is empty, is not a
/// response document, carries an invalid priority or names a file outside
/// the batch.
pub fn parse_response(stdout: &[u8], files: &[PathBuf]) -> Result<WorkerOutput, WorkerError> {
    let malformed = |reason: String| WorkerError::MalformedOutput { reason };

    let text = std::str::from_utf8(stdout).map_err(|e| malformed(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(malformed("no output".to_string()));
    }

    let response: WorkerResponse =
        serde_json::from_str(text.trim()).map_err(|e| malformed(e.to_string()))?;

    let batch: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();
    let outside = |file: &Path| !batch.contains(file);

    if let Some(v) = response.violations.iter().find(|v| outside(&v.file)) {
        return Err(malformed(format!(
            "violation for {} which is not part of the batch",
            v.file.display()
        )));
    }
    if let Some(v) = response.violations.iter().find(|v| v.line == 0) {
        return Err(malformed(format!("line 0 reported for {}", v.file.display())));
    }
    if let Some(e) = response.errors.iter().find(|e| outside(&e.file)) {
        return Err(malformed(format!(
            "processing error for {} which is not part of the batch",
            e.file.display()
        )));
    }

    Ok(WorkerOutput {
        violations: response.violations,
        processing_errors: response.errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::ResolvedRuleSet;
    use crate::types::Priority;
    use crate::worker::WorkerEnvironment;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn files() -> Vec<PathBuf> {
        vec![PathBuf::from("src/A.java"), PathBuf::from("src/B.java")]
    }

    fn parse_err(stdout: &str) -> String {
        match parse_response(stdout.as_bytes(), &files()) {
            Err(WorkerError::MalformedOutput { reason }) => reason,
            other => panic!("expected MalformedOutput, got {other:?}"),
        }
    }

    #[test]
    fn request_carries_auxclasspath_separately() {
        let batch = WorkerBatch {
            id: 0,
            files: files(),
            rules: Arc::new(ResolvedRuleSet::new(vec![ResolvedRule {
                id: "EmptyCatchBlock".to_string(),
                priority: Priority::MEDIUM,
                properties: BTreeMap::new(),
                message: None,
            }])),
            environment: Arc::new(WorkerEnvironment {
                analyzer_classpath: vec![PathBuf::from("/opt/analyzer.jar")],
                auxclasspath: vec![PathBuf::from("libs/dep.jar")],
                target_version: "17".to_string(),
            }),
        };

        let json = serde_json::to_value(WorkerRequest::for_batch(&batch)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "protocol": 1,
                "target_version": "17",
                "files": ["src/A.java", "src/B.java"],
                "auxclasspath": ["libs/dep.jar"],
                "rules": [{"id": "EmptyCatchBlock", "priority": 3}],
            })
        );
    }

    #[test]
    fn parses_violations_and_errors() {
        let output = parse_response(
            br#"{"violations":[{"file":"src/A.java","line":4,"column":2,"rule":"R","priority":1,"message":"m"}],
                "errors":[{"file":"src/B.java","message":"parse error"}]}"#,
            &files(),
        )
        .unwrap();

        assert_eq!(output.violations.len(), 1);
        assert_eq!(output.violations[0].column, Some(2));
        assert_eq!(output.violations[0].priority, Priority::HIGHEST);
        assert_eq!(output.processing_errors[0].message, "parse error");
    }

    #[test]
    fn errors_field_is_optional() {
        let output = parse_response(br#"{"violations":[]}"#, &files()).unwrap();
        assert_eq!(output, WorkerOutput::default());
    }

    #[test]
    fn rejects_empty_output() {
        assert_eq!(parse_err("  \n"), "no output");
    }

    #[test]
    fn rejects_non_json() {
        parse_err("Exception in thread main");
    }

    #[test]
    fn rejects_invalid_priority() {
        let reason = parse_err(
            r#"{"violations":[{"file":"src/A.java","line":1,"rule":"R","priority":7,"message":"m"}]}"#,
        );
        assert!(reason.contains("out of range"));
    }

    #[test]
    fn rejects_file_outside_batch() {
        let reason = parse_err(
            r#"{"violations":[{"file":"src/Z.java","line":1,"rule":"R","priority":3,"message":"m"}]}"#,
        );
        assert!(reason.contains("src/Z.java"));
    }

    #[test]
    fn rejects_line_zero() {
        parse_err(
            r#"{"violations":[{"file":"src/A.java","line":0,"rule":"R","priority":3,"message":"m"}]}"#,
        );
    }
}
