//! Fallback resolver: turns a live fetch plus history into a reported value.

use chrono::NaiveDate;
use cpstats_core::UpdateMode;
use cpstats_scraper::{FetchOutcome, Platform, PlatformFetcher};
use cpstats_store::Snapshot;

use super::report::{PlatformReport, Resolution};

/// Fetch `platform` live and resolve the result against `snapshot`.
pub(crate) async fn resolve_platform<F: PlatformFetcher>(
    fetcher: &F,
    platform: &Platform,
    snapshot: &Snapshot,
    today: NaiveDate,
) -> PlatformReport {
    let outcome = fetcher.fetch(platform).await;
    apply_fallback(outcome, platform.username(), snapshot, today)
}

/// Pure resolution step.
///
/// A success is reported as-is with today's date and automatic mode, even
/// when it is lower than the stored count, and carries any fetched rating.
/// Any failure reports the stored entry verbatim (count, date and mode
/// untouched); with no usable entry the platform is reported missing.
pub(crate) fn apply_fallback(
    outcome: FetchOutcome,
    username: &str,
    snapshot: &Snapshot,
    today: NaiveDate,
) -> PlatformReport {
    let live_count = outcome.value();
    let FetchOutcome {
        platform,
        status,
        elapsed,
        rating,
    } = outcome;

    if let Some(count) = live_count {
        tracing::info!(platform = %platform, count, elapsed = ?elapsed, "fresh count");
        return PlatformReport {
            platform,
            username: username.to_string(),
            status,
            elapsed,
            resolution: Resolution::Fresh,
            count: Some(count),
            date: Some(today),
            mode: Some(UpdateMode::Automatic),
            fresh: true,
            rating,
        };
    }

    match snapshot.fallback_for(&platform, username) {
        Some(entry) => {
            tracing::warn!(
                platform = %platform,
                status = %status,
                count = entry.count,
                date = %entry.date,
                mode = %entry.mode,
                "live fetch failed, using last known count"
            );
            PlatformReport {
                platform,
                username: username.to_string(),
                status,
                elapsed,
                resolution: Resolution::Fallback,
                count: Some(entry.count),
                date: Some(entry.date),
                mode: Some(entry.mode),
                fresh: entry.date == today,
                rating: None,
            }
        }
        None => {
            if snapshot.get(&platform).is_some() {
                tracing::warn!(
                    platform = %platform,
                    username,
                    "stored count belongs to a different handle, not using it"
                );
            }
            tracing::warn!(
                platform = %platform,
                status = %status,
                "live fetch failed and no history exists"
            );
            PlatformReport {
                platform,
                username: username.to_string(),
                status,
                elapsed,
                resolution: Resolution::Missing,
                count: None,
                date: None,
                mode: None,
                fresh: false,
                rating: None,
            }
        }
    }
}

#[cfg(test)]
#[path = "resolve_test.rs"]
mod tests;
