//! Init command implementation.

use anyhow::{bail, Context, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# lintwork configuration
# Relative paths resolve against the project root.

[analysis]
# Source files to analyze, relative to the project root
sources = ["src/main/java/**/*.java"]

# Glob patterns to exclude
exclude = ["**/generated/**"]

# Respect .gitignore files
respect_gitignore = true

# Project classpath handed to the analyzer for type resolution (globs allowed)
# classpath = ["build/classes/java/main", "libs/*.jar"]

# Language level of the sources
target_version = "17"

# Built-in rule sets (see `lintwork list-rule-sets`)
rule_sets = ["errorprone"]

# Rule-set XML files; `resource:` names a packaged file
# rule_set_files = ["config/ruleset.xml", "resource:rulesets/quickstart.xml"]

# Inline rule-set XML file
# rule_set_config = "config/inline-rules.xml"

# Report rules with priority 1 (highest) through this value
rule_priority = 5

# Which definition wins when a rule is configured twice:
# "highest-severity" or "last-definition"
duplicate_policy = "highest-severity"

console_output = true
ignore_failures = false

# Reuse results for unchanged files
incremental = true
cache_file = "build/lintwork/incremental.cache"

# Concurrent analyzer processes (default: available CPUs)
# parallelism = 4
batch_size = 50

[analyzer]
# Command that reads a JSON request on stdin and writes violations to stdout
# program = "/opt/analyzer/bin/run"
# args = []

# The analyzer's own classpath, kept separate from the project classpath
# classpath = ["/opt/analyzer/lib/*.jar"]

timeout_secs = 300
inherit_env = ["JAVA_HOME"]
violation_exit_codes = [4]
"#;

/// Config file written by `init`.
const CONFIG_NAME: &str = "lintwork.toml";

/// Runs the init command in `dir`.
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_NAME);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {CONFIG_NAME}");
    println!("\nNext steps:");
    println!("  1. Set [analyzer] program and classpath in {CONFIG_NAME}");
    println!("  2. Run: lintwork check");

    Ok(())
}
