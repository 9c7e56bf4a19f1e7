//! Persistent fingerprint cache for incremental analysis.
//!
//! # File format
//!
//! JSON Lines. The first line is a header, every following line is one record:
//!
//! ```text
//! {"schema_version":1,"ruleset_fingerprint":"…","environment_fingerprint":"…"}
//! {"file":"src/A.java","fingerprint":"…","violations":[…]}
//! {"file":"src/B.java","fingerprint":"…","violations":[]}
//! ```
//!
//! Loading never fails: a missing file, a header that does not match the
//! current invocation or a single unreadable record yields an empty cache.
//! Updates are buffered in memory and written on [`FingerprintCache::flush`]
//! through a temporary file that replaces the old one.

use crate::fingerprint::{CacheKey, EnvironmentFingerprint, RuleSetFingerprint, SourceFingerprint};
use crate::types::{Priority, Violation};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Cache format version (bump when the record layout changes).
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from writing or inspecting a cache file.
///
/// Reading a cache for an invocation never produces these; see
/// [`FingerprintCache::open`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// IO failure on the cache file or its directory.
    #[error("cache file {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A record could not be encoded.
    #[error("failed to encode cache record: {0}")]
    Encode(#[from] serde_json::Error),

    /// The header of an inspected file is unreadable.
    #[error("cache file {path} is corrupt: {message}")]
    Corrupt {
        /// Path involved.
        path: PathBuf,
        /// What is wrong.
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheHeader {
    schema_version: u32,
    ruleset_fingerprint: RuleSetFingerprint,
    environment_fingerprint: EnvironmentFingerprint,
}

/// A violation as stored in the cache, without its file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedViolation {
    line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
    rule: String,
    priority: Priority,
    message: String,
}

impl CachedViolation {
    /// Re-attaches a file path.
    #[must_use]
    pub fn into_violation(self, file: &Path) -> Violation {
        Violation {
            file: file.to_path_buf(),
            line: self.line,
            column: self.column,
            rule: self.rule,
            priority: self.priority,
            message: self.message,
        }
    }
}

impl From<&Violation> for CachedViolation {
    fn from(v: &Violation) -> Self {
        Self {
            line: v.line,
            column: v.column,
            rule: v.rule.clone(),
            priority: v.priority,
            message: v.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheRecord {
    file: PathBuf,
    fingerprint: SourceFingerprint,
    violations: Vec<CachedViolation>,
}

/// What happened when the cache file was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Incremental analysis is off; nothing was read.
    Disabled,
    /// No cache file exists yet.
    Missing,
    /// The file was read; holds the number of records.
    Loaded(usize),
    /// The file exists but was discarded.
    Invalidated(String),
}

/// Cache statistics for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// `lookup` calls on an enabled cache.
    pub lookups: usize,
    /// Lookups that returned cached violations.
    pub hits: usize,
    /// Lookups that found nothing.
    pub misses: usize,
    /// `update` calls on an enabled cache.
    pub updates: usize,
    /// `lookup`/`update` calls ignored because the cache is disabled.
    pub bypassed: usize,
}

impl CacheStats {
    /// Hit rate in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            (self.hits as f64 / self.lookups as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    lookups: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
    updates: AtomicUsize,
    bypassed: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
        }
    }
}

/// Cache of per-file violation lists keyed by content fingerprint.
///
/// `lookup` and `update` take `&self` and may be called from any task.
#[derive(Debug)]
pub struct FingerprintCache {
    path: Option<PathBuf>,
    header: CacheHeader,
    load_state: LoadState,
    entries: HashMap<SourceFingerprint, Vec<CachedViolation>>,
    pending: RwLock<HashMap<PathBuf, CacheRecord>>,
    counters: Counters,
}

impl FingerprintCache {
    /// Opens the cache file at `path` for an invocation with the given rule
    /// set and environment.
    ///
    /// Never fails. Anything that prevents reuse of the file is logged and
    /// results in an empty cache; the file is rewritten on the next flush.
    #[must_use]
    pub fn open(
        path: impl Into<PathBuf>,
        rules: RuleSetFingerprint,
        environment: EnvironmentFingerprint,
    ) -> Self {
        let path = path.into();
        let header = CacheHeader {
            schema_version: SCHEMA_VERSION,
            ruleset_fingerprint: rules,
            environment_fingerprint: environment,
        };

        let (load_state, entries) = match load(&path, &header) {
            Ok(None) => {
                debug!("No cache file at {}", path.display());
                (LoadState::Missing, HashMap::new())
            }
            Ok(Some(entries)) => {
                info!(
                    "Loaded {} cache record(s) from {}",
                    entries.len(),
                    path.display()
                );
                (LoadState::Loaded(entries.len()), entries.into_iter().collect())
            }
            Err(reason) => {
                warn!(
                    "Discarding cache file {}: {}; all files will be analyzed",
                    path.display(),
                    reason
                );
                (LoadState::Invalidated(reason), HashMap::new())
            }
        };

        Self {
            path: Some(path),
            header,
            load_state,
            entries,
            pending: RwLock::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// A cache that never reads, writes or remembers anything.
    #[must_use]
    pub fn disabled(rules: RuleSetFingerprint, environment: EnvironmentFingerprint) -> Self {
        Self {
            path: None,
            header: CacheHeader {
                schema_version: SCHEMA_VERSION,
                ruleset_fingerprint: rules,
                environment_fingerprint: environment,
            },
            load_state: LoadState::Disabled,
            entries: HashMap::new(),
            pending: RwLock::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Whether results are read and persisted.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// How the cache file was loaded.
    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Returns the cached violations for `key`, attributed to `file`.
    ///
    /// A hit may come from a different path with identical content.
    #[must_use]
    pub fn lookup(&self, file: &Path, key: &CacheKey) -> Option<Vec<Violation>> {
        if !self.is_enabled() {
            Counters::bump(&self.counters.bypassed);
            return None;
        }
        Counters::bump(&self.counters.lookups);

        let hit = if key.rules() == &self.header.ruleset_fingerprint {
            self.entries.get(key.source())
        } else {
            None
        };

        match hit {
            Some(cached) => {
                Counters::bump(&self.counters.hits);
                debug!("Cache hit: {}", file.display());
                Some(
                    cached
                        .iter()
                        .cloned()
                        .map(|c| c.into_violation(file))
                        .collect(),
                )
            }
            None => {
                Counters::bump(&self.counters.misses);
                None
            }
        }
    }

    /// Records fresh results for `file`. The last update per file wins.
    pub fn update(&self, file: &Path, key: &CacheKey, violations: &[Violation]) {
        if !self.is_enabled() {
            Counters::bump(&self.counters.bypassed);
            return;
        }
        if key.rules() != &self.header.ruleset_fingerprint {
            warn!(
                "Ignoring cache update for {} under a different rule set",
                file.display()
            );
            return;
        }
        Counters::bump(&self.counters.updates);

        let record = CacheRecord {
            file: file.to_path_buf(),
            fingerprint: key.source().clone(),
            violations: violations.iter().map(CachedViolation::from).collect(),
        };
        self.pending.write().insert(file.to_path_buf(), record);
    }

    /// Writes the cache for the given live files and returns the number of
    /// records written.
    ///
    /// Each live file gets its pending update, or else the loaded entry with
    /// the same content fingerprint. Files not listed are dropped. A disabled
    /// cache writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written or renamed into place. The previous file is left intact.
    pub fn flush(&self, live: &[(PathBuf, SourceFingerprint)]) -> Result<usize, CacheError> {
        let Some(path) = &self.path else {
            return Ok(0);
        };

        let records: Vec<CacheRecord> = {
            let pending = self.pending.read();
            live.iter()
                .filter_map(|(file, fingerprint)| match pending.get(file) {
                    Some(record) if &record.fingerprint == fingerprint => Some(record.clone()),
                    _ => self.entries.get(fingerprint).map(|violations| CacheRecord {
                        file: file.clone(),
                        fingerprint: fingerprint.clone(),
                        violations: violations.clone(),
                    }),
                })
                .collect()
        };

        write_atomically(path, &self.header, &records)?;
        debug!("Wrote {} cache record(s) to {}", records.len(), path.display());
        Ok(records.len())
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

fn load(
    path: &Path,
    expected: &CacheHeader,
) -> Result<Option<Vec<(SourceFingerprint, Vec<CachedViolation>)>>, String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(format!("unreadable ({e})")),
    };

    let mut lines = content.lines();
    let header_line = lines.next().ok_or_else(|| "empty file".to_string())?;
    let header: CacheHeader =
        serde_json::from_str(header_line).map_err(|e| format!("bad header ({e})"))?;

    if header.schema_version != expected.schema_version {
        return Err(format!(
            "schema version {} (expected {})",
            header.schema_version, expected.schema_version
        ));
    }
    if header.ruleset_fingerprint != expected.ruleset_fingerprint {
        return Err("rule set changed".to_string());
    }
    if header.environment_fingerprint != expected.environment_fingerprint {
        return Err("analysis environment changed".to_string());
    }

    let mut entries = Vec::new();
    for (index, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: CacheRecord = serde_json::from_str(line)
            .map_err(|e| format!("record {} is unreadable ({e})", index + 1))?;
        entries.push((record.fingerprint, record.violations));
    }

    Ok(Some(entries))
}

fn write_atomically(
    path: &Path,
    header: &CacheHeader,
    records: &[CacheRecord],
) -> Result<(), CacheError> {
    let io_err = |source: std::io::Error| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, header)?;
        writer.write_all(b"\n").map_err(io_err)?;
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n").map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Summary of a cache file on disk, for inspection commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheFileInfo {
    /// Path of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Schema version from the header.
    pub schema_version: u32,
    /// Whether this build can read the file.
    pub compatible: bool,
    /// Rule-set fingerprint from the header.
    pub ruleset_fingerprint: String,
    /// Environment fingerprint from the header.
    pub environment_fingerprint: String,
    /// Number of records.
    pub records: usize,
    /// Number of cached violations across all records.
    pub violations: usize,
}

/// Reads a cache file's header and counts its records.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its header is corrupt.
pub fn inspect(path: &Path) -> Result<Option<CacheFileInfo>, CacheError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let corrupt = |message: String| CacheError::Corrupt {
        path: path.to_path_buf(),
        message,
    };

    let mut lines = content.lines();
    let header_line = lines.next().ok_or_else(|| corrupt("empty file".to_string()))?;
    let header: CacheHeader =
        serde_json::from_str(header_line).map_err(|e| corrupt(e.to_string()))?;

    let mut records = 0;
    let mut violations = 0;
    for line in lines.filter(|l| !l.trim().is_empty()) {
        let record: CacheRecord = serde_json::from_str(line).map_err(|e| corrupt(e.to_string()))?;
        records += 1;
        violations += record.violations.len();
    }

    Ok(Some(CacheFileInfo {
        path: path.to_path_buf(),
        size: content.len() as u64,
        schema_version: header.schema_version,
        compatible: header.schema_version == SCHEMA_VERSION,
        ruleset_fingerprint: header.ruleset_fingerprint.as_str().to_string(),
        environment_fingerprint: header.environment_fingerprint.as_str().to_string(),
        records,
        violations,
    }))
}

/// Deletes a cache file. Returns `false` if there was nothing to delete.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed cache file {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
