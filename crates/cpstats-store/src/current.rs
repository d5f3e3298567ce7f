//! Current-run output: `{ "<platform>": <count or null> }`.
//!
//! Written after every full run and touched by manual entry, so downstream
//! renderers see one schema whatever the provenance.

use std::collections::BTreeMap;
use std::path::Path;

use crate::atomic::write_atomic;
use crate::error::StoreError;

pub type CurrentStats = BTreeMap<String, Option<u32>>;

/// Atomically replace the current-run output file.
///
/// # Errors
///
/// Returns [`StoreError`] on serialization or I/O failure.
pub fn write_current_stats(path: &Path, stats: &CurrentStats) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(stats)?;
    write_atomic(path, json.as_bytes())?;
    tracing::debug!(path = %path.display(), platforms = stats.len(), "current stats written");
    Ok(())
}

/// Read the current-run output file; missing or malformed content is empty.
#[must_use]
pub fn load_current_stats(path: &Path) -> CurrentStats {
    let Ok(content) = std::fs::read_to_string(path) else {
        return CurrentStats::new();
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "current stats file is malformed, rewriting"
        );
        CurrentStats::new()
    })
}

/// Set one platform's value and rewrite the file.
///
/// # Errors
///
/// Same as [`write_current_stats`].
pub fn update_current_stat(path: &Path, platform: &str, count: u32) -> Result<(), StoreError> {
    let mut stats = load_current_stats(path);
    stats.insert(platform.to_string(), Some(count));
    write_current_stats(path, &stats)
}
