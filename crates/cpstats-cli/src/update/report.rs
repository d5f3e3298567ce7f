//! Per-run aggregate handed to the renderer.

use std::time::Duration;

use chrono::NaiveDate;
use cpstats_core::{Rating, UpdateMode};
use cpstats_scraper::FetchStatus;
use cpstats_store::CurrentStats;

/// Where a platform's reported value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// This run's live fetch succeeded.
    Fresh,
    /// Live fetch failed; the snapshot entry stands in.
    Fallback,
    /// Live fetch failed and no usable history exists.
    Missing,
}

/// Final outcome for one platform.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlatformReport {
    pub platform: String,
    pub username: String,
    pub status: FetchStatus,
    pub elapsed: Duration,
    pub resolution: Resolution,
    pub count: Option<u32>,
    pub date: Option<NaiveDate>,
    pub mode: Option<UpdateMode>,
    /// `date == today` in the operator's timezone.
    pub fresh: bool,
    /// Rating fetched alongside a fresh count.
    pub rating: Option<Rating>,
}

impl PlatformReport {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.resolution == Resolution::Missing
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RunReport {
    pub today: NaiveDate,
    /// In configuration order.
    pub platforms: Vec<PlatformReport>,
    /// Sum of every present count; missing platforms add nothing.
    pub total: u64,
    /// Most recent date any count went up, and on which platform.
    pub last_activity: Option<(String, NaiveDate)>,
}

impl RunReport {
    pub fn new(
        today: NaiveDate,
        platforms: Vec<PlatformReport>,
        last_activity: Option<(String, NaiveDate)>,
    ) -> Self {
        let total = platforms
            .iter()
            .filter_map(|p| p.count)
            .map(u64::from)
            .sum();
        Self {
            today,
            platforms,
            total,
            last_activity,
        }
    }

    fn count_of(&self, resolution: Resolution) -> usize {
        self.platforms
            .iter()
            .filter(|p| p.resolution == resolution)
            .count()
    }

    pub fn fresh_count(&self) -> usize {
        self.count_of(Resolution::Fresh)
    }

    pub fn cached_count(&self) -> usize {
        self.count_of(Resolution::Fallback)
    }

    pub fn missing_count(&self) -> usize {
        self.count_of(Resolution::Missing)
    }

    pub fn missing(&self) -> impl Iterator<Item = &PlatformReport> {
        self.platforms.iter().filter(|p| p.is_missing())
    }

    /// Platforms whose live fetch took at least `threshold`, slowest first.
    pub fn slow_platforms(&self, threshold: Duration) -> Vec<&PlatformReport> {
        let mut slow: Vec<&PlatformReport> = self
            .platforms
            .iter()
            .filter(|p| p.elapsed >= threshold)
            .collect();
        slow.sort_by(|a, b| b.elapsed.cmp(&a.elapsed));
        slow
    }

    /// Days between the last recorded increase and today.
    pub fn days_since_activity(&self) -> Option<i64> {
        self.last_activity
            .as_ref()
            .map(|(_, date)| (self.today - *date).num_days())
    }

    pub fn is_stagnant(&self, stagnant_days: i64) -> bool {
        self.days_since_activity()
            .is_some_and(|days| days > stagnant_days)
    }

    /// The current-run output document.
    pub fn current_stats(&self) -> CurrentStats {
        self.platforms
            .iter()
            .map(|p| (p.platform.clone(), p.count))
            .collect()
    }
}
