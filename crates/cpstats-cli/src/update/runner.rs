//! Run orchestrator.
//!
//! Loads the snapshot once, resolves every platform with bounded
//! concurrency, merges fresh counts, then persists the snapshot and the
//! current-run output exactly once.

use chrono::NaiveDate;
use cpstats_core::{AppConfig, UpdateMode};
use cpstats_scraper::{Platform, PlatformFetcher};
use cpstats_store::{write_current_stats, SnapshotStore};
use futures::stream::{self, StreamExt};

use super::report::{PlatformReport, Resolution, RunReport};
use super::resolve::resolve_platform;

/// Drive one update run over `platforms`.
///
/// Per-platform failures never abort the run; they surface in the report as
/// fallbacks or missing entries. With `dry_run` nothing is written.
///
/// # Errors
///
/// Returns an error only when persisting the snapshot or the current-run
/// output fails, after every platform has been resolved. The previous files
/// are left intact in that case.
pub(crate) async fn run_update<F: PlatformFetcher>(
    fetcher: &F,
    platforms: &[Platform],
    store: &SnapshotStore,
    config: &AppConfig,
    today: NaiveDate,
    dry_run: bool,
) -> anyhow::Result<RunReport> {
    let mut snapshot = store.load();
    let max_concurrent = config.max_concurrent_platforms.max(1);

    tracing::info!(
        platforms = platforms.len(),
        history = snapshot.len(),
        max_concurrent,
        %today,
        "starting update run"
    );

    let history = &snapshot;
    let resolved: Vec<(usize, PlatformReport)> = stream::iter(platforms.iter().enumerate())
        .map(|(index, platform)| async move {
            (
                index,
                resolve_platform(fetcher, platform, history, today).await,
            )
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    // One slot per platform keeps configuration order regardless of
    // completion order.
    let mut slots: Vec<Option<PlatformReport>> = vec![None; platforms.len()];
    for (index, report) in resolved {
        slots[index] = Some(report);
    }
    let reports: Vec<PlatformReport> = slots.into_iter().flatten().collect();

    for report in reports
        .iter()
        .filter(|r| r.resolution == Resolution::Fresh)
    {
        if let Some(count) = report.count {
            snapshot.record(
                &report.platform,
                count,
                today,
                UpdateMode::Automatic,
                Some(&report.username),
            );
        }
        if let Some(rating) = &report.rating {
            snapshot.set_rating(&report.platform, rating.clone());
        }
    }

    let last_activity = snapshot
        .last_activity()
        .map(|(platform, date)| (platform.to_string(), date));
    let run = RunReport::new(today, reports, last_activity);

    tracing::info!(
        total = run.total,
        fresh = run.fresh_count(),
        cached = run.cached_count(),
        missing = run.missing_count(),
        "update run resolved"
    );

    if run.is_stagnant(config.stagnant_days) {
        if let Some((platform, date)) = &run.last_activity {
            tracing::warn!(
                platform = %platform,
                %date,
                days = ?run.days_since_activity(),
                "no solved count has gone up recently"
            );
        }
    }

    if dry_run {
        tracing::info!("dry run, snapshot and current stats not written");
        return Ok(run);
    }

    store.save(&snapshot)?;
    write_current_stats(&config.stats_path, &run.current_stats())?;

    Ok(run)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
