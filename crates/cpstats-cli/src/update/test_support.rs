use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate};
use cpstats_core::{AppConfig, PatternSpec, PlatformSpec, Rating, SanityBounds};
use cpstats_scraper::{FetchOutcome, FetchSource, FetchStatus, Platform, PlatformFetcher};

/// Offline fetcher answering from a fixed table; unknown platforms get a
/// network error.
#[derive(Default)]
pub(crate) struct StubFetcher {
    answers: HashMap<String, (FetchStatus, Duration)>,
    ratings: HashMap<String, Rating>,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn with(mut self, platform: &str, status: FetchStatus) -> Self {
        self.answers
            .insert(platform.to_string(), (status, Duration::from_millis(5)));
        self
    }

    pub fn with_elapsed(mut self, platform: &str, status: FetchStatus, elapsed: Duration) -> Self {
        self.answers.insert(platform.to_string(), (status, elapsed));
        self
    }

    pub fn with_rating(mut self, platform: &str, rating: Rating) -> Self {
        self.ratings.insert(platform.to_string(), rating);
        self
    }
}

impl PlatformFetcher for StubFetcher {
    async fn fetch(&self, platform: &Platform) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (status, elapsed) = self
            .answers
            .get(platform.name())
            .cloned()
            .unwrap_or_else(|| {
                (
                    FetchStatus::NetworkError {
                        reason: "unreachable".to_string(),
                    },
                    Duration::from_millis(5),
                )
            });
        FetchOutcome {
            platform: platform.name().to_string(),
            status,
            elapsed,
            rating: self.ratings.get(platform.name()).cloned(),
        }
    }
}

pub(crate) fn success(count: u32) -> FetchStatus {
    FetchStatus::Success {
        count,
        source: FetchSource::Page,
    }
}

pub(crate) fn platform(name: &str) -> Platform {
    let spec = PlatformSpec {
        name: name.to_string(),
        endpoint_template: format!("https://{}.example.test/u/{{username}}", name.to_lowercase()),
        api: None,
        patterns: vec![PatternSpec::regex(r"Solved:\s*(\d+)")],
        bounds: SanityBounds::positive(10_000),
        rating: None,
    };
    Platform::compile(spec, "me").unwrap()
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Configuration with every path inside `dir`.
pub(crate) fn config_in(dir: &tempfile::TempDir) -> AppConfig {
    AppConfig {
        handles_path: dir.path().join("handles.yaml"),
        snapshot_path: dir.path().join("last_known_counts.json"),
        stats_path: dir.path().join("stats.json"),
        log_level: "info".to_string(),
        request_timeout_secs: 5,
        user_agent: "cpstats-test/0.1".to_string(),
        max_concurrent_platforms: 2,
        max_reasonable_count: 10_000,
        timezone: FixedOffset::east_opt(6 * 3600).unwrap(),
        slow_fetch_secs: 10,
        stagnant_days: 90,
    }
}
