//! Snapshot store: the last known-good count per platform.
//!
//! On disk the snapshot is a set of parallel maps keyed by platform name
//! (`counts`, `dates`, `modes`, `last_solved_dates`, `usernames`) plus a
//! `ratings` map. Other top-level keys written by neighbouring tools are
//! carried through untouched. In memory it is one [`SnapshotEntry`] per
//! platform.
//!
//! Reading is lenient per value: a bad date or username degrades that one
//! field, a bad count drops that one platform, and the rest of the file
//! still loads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use cpstats_core::{Rating, SanityBounds, UpdateMode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::atomic::write_atomic;
use crate::error::StoreError;

/// Placeholder date for values whose origin date is unknown.
pub const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 1) {
    Some(date) => date,
    None => panic!("1970-01-01 is a valid date"),
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub count: u32,
    /// Date the count was established, in the operator's timezone.
    pub date: NaiveDate,
    pub mode: UpdateMode,
    /// Date the count last went up. [`EPOCH`] until an increase is observed.
    pub last_solved: Option<NaiveDate>,
    /// Handle the count belongs to, when known.
    pub username: Option<String>,
}

impl SnapshotEntry {
    /// Whether this entry may stand in for `username`'s count. Entries
    /// written before usernames were tracked match any handle.
    #[must_use]
    pub fn belongs_to(&self, username: &str) -> bool {
        self.username
            .as_deref()
            .is_none_or(|stored| stored.eq_ignore_ascii_case(username))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
    ratings: BTreeMap<String, Rating>,
    /// Rating values of an unknown shape, written back as found.
    foreign_ratings: RawMap,
    extra: RawMap,
}

type RawMap = BTreeMap<String, Value>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default, deserialize_with = "object_or_empty")]
    counts: RawMap,
    #[serde(default, deserialize_with = "object_or_empty")]
    dates: RawMap,
    #[serde(default, deserialize_with = "object_or_empty")]
    modes: RawMap,
    #[serde(default, deserialize_with = "object_or_empty")]
    last_solved_dates: RawMap,
    #[serde(default, deserialize_with = "object_or_empty")]
    usernames: RawMap,
    #[serde(default, deserialize_with = "object_or_empty")]
    ratings: RawMap,
    #[serde(flatten)]
    extra: RawMap,
}

/// Any non-object (including `null`) reads as an empty map.
fn object_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RawMap, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => RawMap::new(),
    })
}

fn parse_date(raw: Option<&Value>) -> Option<NaiveDate> {
    raw.and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
}

/// Integer or numeric string that fits a count.
fn parse_count(raw: &Value) -> Option<u32> {
    match raw {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn date_value(date: NaiveDate) -> Value {
    Value::String(date.format(DATE_FORMAT).to_string())
}

impl Snapshot {
    /// Parse the on-disk JSON. Missing or unparsable dates fall back to
    /// [`EPOCH`]; a missing or unknown mode falls back to automatic.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the document is not a snapshot.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let file: SnapshotFile = serde_json::from_str(content)?;

        let entries = file
            .counts
            .into_iter()
            .filter_map(|(platform, raw)| {
                let Some(count) = parse_count(&raw) else {
                    tracing::warn!(
                        platform = %platform,
                        value = %raw,
                        "ignoring unreadable stored count"
                    );
                    return None;
                };
                let mode = match file.modes.get(&platform).and_then(Value::as_str) {
                    Some("manual") => UpdateMode::Manual,
                    _ => UpdateMode::Automatic,
                };
                let username = file
                    .usernames
                    .get(&platform)
                    .and_then(Value::as_str)
                    .filter(|u| !u.trim().is_empty())
                    .map(str::to_string);
                let entry = SnapshotEntry {
                    count,
                    date: parse_date(file.dates.get(&platform)).unwrap_or(EPOCH),
                    mode,
                    last_solved: parse_date(file.last_solved_dates.get(&platform)),
                    username,
                };
                Some((platform, entry))
            })
            .collect();

        let mut ratings = BTreeMap::new();
        let mut foreign_ratings = RawMap::new();
        for (platform, raw) in file.ratings {
            match serde_json::from_value::<Rating>(raw.clone()) {
                Ok(rating) => {
                    ratings.insert(platform, rating);
                }
                Err(_) => {
                    foreign_ratings.insert(platform, raw);
                }
            }
        }

        Ok(Self {
            entries,
            ratings,
            foreign_ratings,
            extra: file.extra,
        })
    }

    /// Render the on-disk JSON (pretty-printed, keys sorted).
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut file = SnapshotFile {
            ratings: self.foreign_ratings.clone(),
            extra: self.extra.clone(),
            ..SnapshotFile::default()
        };

        for (platform, entry) in &self.entries {
            file.counts.insert(platform.clone(), Value::from(entry.count));
            file.dates.insert(platform.clone(), date_value(entry.date));
            file.modes
                .insert(platform.clone(), Value::String(entry.mode.to_string()));
            if let Some(last_solved) = entry.last_solved {
                file.last_solved_dates
                    .insert(platform.clone(), date_value(last_solved));
            }
            if let Some(username) = &entry.username {
                file.usernames
                    .insert(platform.clone(), Value::String(username.clone()));
            }
        }
        for (platform, rating) in &self.ratings {
            file.ratings
                .insert(platform.clone(), serde_json::to_value(rating)?);
        }

        serde_json::to_string_pretty(&file)
    }

    #[must_use]
    pub fn get(&self, platform: &str) -> Option<&SnapshotEntry> {
        self.entries.get(platform)
    }

    /// The entry usable as a fallback for `username` on `platform`, if any.
    #[must_use]
    pub fn fallback_for(&self, platform: &str, username: &str) -> Option<&SnapshotEntry> {
        self.get(platform).filter(|entry| entry.belongs_to(username))
    }

    /// Overwrite `platform`'s entry. Lower counts are accepted as-is; the
    /// `last_solved` date only moves when the count goes up. A `None`
    /// username keeps whatever was recorded before.
    pub fn record(
        &mut self,
        platform: &str,
        count: u32,
        date: NaiveDate,
        mode: UpdateMode,
        username: Option<&str>,
    ) {
        let previous = self.entries.get(platform);

        let last_solved = match previous {
            Some(prev) if count > prev.count => date,
            Some(prev) => prev.last_solved.unwrap_or(EPOCH),
            None => EPOCH,
        };
        let username = username
            .map(str::to_string)
            .or_else(|| previous.and_then(|prev| prev.username.clone()));

        if let Some(prev) = previous {
            if count < prev.count {
                tracing::warn!(
                    platform,
                    previous = prev.count,
                    count,
                    "solved count went down, recording the lower value"
                );
            }
        }

        self.entries.insert(
            platform.to_string(),
            SnapshotEntry {
                count,
                date,
                mode,
                last_solved: Some(last_solved),
                username,
            },
        );
    }

    #[must_use]
    pub fn rating(&self, platform: &str) -> Option<&Rating> {
        self.ratings.get(platform)
    }

    /// Replace `platform`'s stored rating.
    pub fn set_rating(&mut self, platform: &str, rating: Rating) {
        self.foreign_ratings.remove(platform);
        self.ratings.insert(platform.to_string(), rating);
    }

    pub fn ratings(&self) -> impl Iterator<Item = (&str, &Rating)> {
        self.ratings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent known increase across all platforms.
    #[must_use]
    pub fn last_activity(&self) -> Option<(&str, NaiveDate)> {
        self.iter()
            .filter_map(|(platform, entry)| {
                entry
                    .last_solved
                    .filter(|date| *date > EPOCH)
                    .map(|date| (platform, date))
            })
            .max_by_key(|(_, date)| *date)
    }
}

/// File-backed [`Snapshot`] persistence.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot. Never fails: a missing, unreadable, or corrupt file
    /// yields an empty snapshot so the run degrades to "no history".
    #[must_use]
    pub fn load(&self) -> Snapshot {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no snapshot yet, starting empty");
                return Snapshot::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "snapshot unreadable, continuing without history"
                );
                return Snapshot::default();
            }
        };

        match Snapshot::from_json(&content) {
            Ok(snapshot) => {
                tracing::debug!(
                    path = %self.path.display(),
                    entries = snapshot.len(),
                    "snapshot loaded"
                );
                snapshot
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "snapshot is malformed, continuing without history"
                );
                Snapshot::default()
            }
        }
    }

    /// Atomically replace the snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`], [`StoreError::Io`] or
    /// [`StoreError::Persist`]. The previous file is intact on error.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = snapshot.to_json()?;
        write_atomic(&self.path, json.as_bytes())?;
        tracing::info!(
            path = %self.path.display(),
            entries = snapshot.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Record an operator-entered count with manual provenance and persist
    /// it immediately. Returns the updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfBounds`] when `count` is not plausible for
    /// the platform, or any [`SnapshotStore::save`] error.
    pub fn record_manual(
        &self,
        platform: &str,
        count: u32,
        date: NaiveDate,
        bounds: &SanityBounds,
        username: Option<&str>,
    ) -> Result<Snapshot, StoreError> {
        if !bounds.contains(u64::from(count)) {
            return Err(StoreError::OutOfBounds {
                platform: platform.to_string(),
                count,
                bounds: *bounds,
            });
        }

        let mut snapshot = self.load();
        snapshot.record(platform, count, date, UpdateMode::Manual, username);
        self.save(&snapshot)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
