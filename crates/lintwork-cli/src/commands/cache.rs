//! Cache maintenance commands.

use anyhow::{Context, Result};
use lintwork::cache::{self, CacheFileInfo};
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::config_resolver::ConfigSource;

fn cache_path(root: &Path, source: &ConfigSource) -> Result<PathBuf> {
    let config = source.load()?;
    Ok(root.join(config.analysis.cache_file))
}

/// Prints the cache file's header and record counts.
pub fn info(root: &Path, source: &ConfigSource) -> Result<()> {
    let path = cache_path(root, source)?;
    let info = cache::inspect(&path)
        .with_context(|| format!("Failed to inspect {}", path.display()))?;
    match info {
        Some(info) => print!("{}", render_info(&info)),
        None => println!("No cache file at {}", path.display()),
    }
    Ok(())
}

/// Removes the cache file.
pub fn clear(root: &Path, source: &ConfigSource) -> Result<()> {
    let path = cache_path(root, source)?;
    if cache::clear(&path).with_context(|| format!("Failed to remove {}", path.display()))? {
        println!("Removed {}", path.display());
    } else {
        println!("No cache file at {}", path.display());
    }
    Ok(())
}

fn render_info(info: &CacheFileInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Cache file:   {}", info.path.display());
    let _ = writeln!(out, "Size:         {} bytes", info.size);
    let _ = writeln!(
        out,
        "Schema:       v{}{}",
        info.schema_version,
        if info.compatible {
            ""
        } else {
            " (incompatible, will be rebuilt)"
        }
    );
    let _ = writeln!(out, "Rule set:     {}", info.ruleset_fingerprint);
    let _ = writeln!(out, "Environment:  {}", info.environment_fingerprint);
    let _ = writeln!(
        out,
        "Records:      {} file(s), {} violation(s)",
        info.records, info.violations
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn cache_path_follows_config() {
        let tmp = TempDir::new().unwrap();
        let config = tmp.path().join("lintwork.toml");
        fs::write(&config, "[analysis]\ncache_file = \".cache/lw\"\n").unwrap();

        let path = cache_path(tmp.path(), &ConfigSource::Project(config)).unwrap();
        assert_eq!(path, tmp.path().join(".cache/lw"));

        let path = cache_path(tmp.path(), &ConfigSource::Default).unwrap();
        assert_eq!(path, tmp.path().join("build/lintwork/incremental.cache"));
    }

    #[test]
    fn clear_missing_file_is_ok() {
        let tmp = TempDir::new().unwrap();
        clear(tmp.path(), &ConfigSource::Default).unwrap();
        info(tmp.path(), &ConfigSource::Default).unwrap();
    }

    #[test]
    fn render_marks_incompatible_schema() {
        let info = CacheFileInfo {
            path: PathBuf::from("build/lintwork/incremental.cache"),
            size: 512,
            schema_version: 0,
            compatible: false,
            ruleset_fingerprint: "ab12".to_string(),
            environment_fingerprint: "cd34".to_string(),
            records: 3,
            violations: 7,
        };
        let text = render_info(&info);
        assert!(text.contains("v0 (incompatible, will be rebuilt)"));
        assert!(text.contains("3 file(s), 7 violation(s)"));
    }
}
