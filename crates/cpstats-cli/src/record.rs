//! Manual entry: `cpstats record <platform> <count>`.

use chrono::NaiveDate;
use cpstats_core::{load_handles, AppConfig, HandlesFile};
use cpstats_scraper::ExtractorRegistry;
use cpstats_store::{update_current_stat, SnapshotStore};

/// Store an operator-entered count with manual provenance and mirror it into
/// the current-run output.
///
/// The platform name is matched case-insensitively and stored under its
/// canonical spelling. The handles file is optional here; when present it
/// supplies the username and any per-platform ceiling.
///
/// # Errors
///
/// Returns an error for an unknown platform, an implausible count, an
/// unreadable handles file, or a failed write.
pub(crate) fn run_record(
    config: &AppConfig,
    platform: &str,
    count: u32,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let registry = ExtractorRegistry::builtin(config.max_reasonable_count);
    let spec = registry.spec(platform).ok_or_else(|| {
        anyhow::anyhow!("unknown platform '{platform}'; run `cpstats platforms` to list them")
    })?;

    let handles: Option<HandlesFile> = if config.handles_path.exists() {
        Some(load_handles(&config.handles_path)?)
    } else {
        None
    };
    let handle = handles.as_ref().and_then(|h| h.find(&spec.name));
    let bounds = handle
        .and_then(|h| h.max_count)
        .map_or(spec.bounds, |max| spec.bounds.with_max(max));
    let date = date.unwrap_or_else(|| config.today());

    let store = SnapshotStore::new(&config.snapshot_path);
    store.record_manual(
        &spec.name,
        count,
        date,
        &bounds,
        handle.map(|h| h.username.as_str()),
    )?;
    update_current_stat(&config.stats_path, &spec.name, count)?;

    tracing::info!(platform = %spec.name, count, %date, "manual count recorded");
    println!("recorded {} = {count} (manual, {date})", spec.name);

    Ok(())
}

#[cfg(test)]
mod tests {
    use cpstats_core::UpdateMode;
    use cpstats_store::load_current_stats;

    use super::*;
    use crate::update::test_support::{config_in, date};

    #[test]
    fn records_under_canonical_name_with_handle() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        std::fs::write(
            &config.handles_path,
            "handles:\n  - platform: Toph\n    username: someone\n",
        )
        .unwrap();

        run_record(&config, "toph", 50, Some(date(2026, 1, 10))).unwrap();

        let snapshot = SnapshotStore::new(&config.snapshot_path).load();
        let entry = snapshot.get("Toph").unwrap();
        assert_eq!(entry.count, 50);
        assert_eq!(entry.mode, UpdateMode::Manual);
        assert_eq!(entry.date, date(2026, 1, 10));
        assert_eq!(entry.username.as_deref(), Some("someone"));
        assert_eq!(load_current_stats(&config.stats_path)["Toph"], Some(50));
    }

    #[test]
    fn rejects_unknown_platform() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_record(&config_in(&dir), "TopCoder", 5, None).unwrap_err();
        assert!(err.to_string().contains("unknown platform"));
    }

    #[test]
    fn rejects_implausible_count_unless_ceiling_raised() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        assert!(run_record(&config, "CSES", 15_000, None).is_err());
        assert!(!config.snapshot_path.exists());

        std::fs::write(
            &config.handles_path,
            "handles:\n  - platform: CSES\n    username: \"165802\"\n    max_count: 20000\n",
        )
        .unwrap();
        run_record(&config, "CSES", 15_000, None).unwrap();
    }
}
