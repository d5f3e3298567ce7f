use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub handles_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub stats_path: PathBuf,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_platforms: usize,
    /// Default exclusive ceiling for a plausible solved count.
    pub max_reasonable_count: u32,
    /// The operator's fixed timezone; "today" is always computed in it.
    pub timezone: FixedOffset,
    pub slow_fetch_secs: u64,
    pub stagnant_days: i64,
}

impl AppConfig {
    /// Calendar date of `now` in the configured timezone.
    #[must_use]
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Today's date in the configured timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }
}
