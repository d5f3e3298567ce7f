//! Fetch executor: one live attempt per platform, API tier then page tier.
//!
//! Nothing here returns `Err`. Every transport, payload, and extraction
//! failure is folded into a [`FetchStatus`] so the caller branches on the
//! outcome kind instead of handling errors.

use std::future::Future;
use std::time::{Duration, Instant};

use cpstats_core::{ApiRequest, ApiSpec, Rating, RatingSpec};

use crate::api::{extract_api_count, extract_rating};
use crate::client::StatsClient;
use crate::extract::{extract_count, Extraction};
use crate::registry::Platform;

/// Which tier produced a successful count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Api,
    Page,
}

impl std::fmt::Display for FetchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchSource::Api => write!(f, "api"),
            FetchSource::Page => write!(f, "page"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// In-bounds count.
    Success { count: u32, source: FetchSource },
    /// The page was retrieved but no pattern produced a candidate.
    NoMatch,
    /// Timeout, DNS/TLS failure, or non-2xx status on the last tier tried.
    NetworkError { reason: String },
    /// A value was extracted but falls outside the sanity bounds.
    InvalidCount { value: u64 },
}

impl FetchStatus {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, FetchStatus::Success { .. })
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStatus::Success { count, source } => write!(f, "ok {count} ({source})"),
            FetchStatus::NoMatch => write!(f, "no match"),
            FetchStatus::NetworkError { reason } => write!(f, "network error: {reason}"),
            FetchStatus::InvalidCount { value } => write!(f, "invalid count {value}"),
        }
    }
}

/// Result of one live fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub platform: String,
    pub status: FetchStatus,
    pub elapsed: Duration,
    /// Contest rating, for platforms that publish one and answered.
    pub rating: Option<Rating>,
}

impl FetchOutcome {
    /// The count, present only on success.
    #[must_use]
    pub fn value(&self) -> Option<u32> {
        match self.status {
            FetchStatus::Success { count, .. } => Some(count),
            _ => None,
        }
    }
}

/// Source of live counts. [`StatsClient`] is the production implementation;
/// the orchestrator is generic over this so runs can be driven offline.
pub trait PlatformFetcher {
    fn fetch(&self, platform: &Platform) -> impl Future<Output = FetchOutcome> + Send;
}

/// What a single tier produced, before the tiers are combined.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Tier {
    Valid(u32),
    OutOfBounds(u64),
    NoMatch,
    Failed(String),
}

impl From<Extraction> for Tier {
    fn from(extraction: Extraction) -> Self {
        match extraction {
            Extraction::Valid { count, .. } => Tier::Valid(count),
            Extraction::OutOfBounds { value } => Tier::OutOfBounds(value),
            Extraction::NoMatch => Tier::NoMatch,
        }
    }
}

impl PlatformFetcher for StatsClient {
    async fn fetch(&self, platform: &Platform) -> FetchOutcome {
        let started = Instant::now();

        let rating = match &platform.spec().rating {
            Some(spec) => self.rating(platform, spec).await,
            None => None,
        };

        let api = match &platform.spec().api {
            Some(api) => Some(self.api_tier(platform, api).await),
            None => None,
        };

        let status = if let Some(Tier::Valid(count)) = api {
            FetchStatus::Success {
                count,
                source: FetchSource::Api,
            }
        } else {
            let page = self.page_tier(platform).await;
            combine(api, page)
        };

        let elapsed = started.elapsed();
        tracing::debug!(
            platform = platform.name(),
            status = %status,
            elapsed = ?elapsed,
            "live fetch finished"
        );

        FetchOutcome {
            platform: platform.name().to_string(),
            status,
            elapsed,
            rating,
        }
    }
}

impl StatsClient {
    /// Best effort: a failed rating lookup never affects the count.
    async fn rating(&self, platform: &Platform, spec: &RatingSpec) -> Option<Rating> {
        let url = platform.rating_url()?;
        match self.fetch_json(&url).await {
            Ok(body) => extract_rating(&body, spec),
            Err(e) => {
                tracing::debug!(platform = platform.name(), error = %e, "rating lookup failed");
                None
            }
        }
    }

    async fn api_tier(&self, platform: &Platform, api: &ApiSpec) -> Tier {
        let Some(url) = platform.api_url() else {
            return Tier::Failed("no API endpoint".to_string());
        };

        let payload = match &api.request {
            ApiRequest::Get => self.fetch_json(&url).await,
            ApiRequest::GraphQl { query } => {
                self.post_graphql(&url, query, platform.username()).await
            }
            ApiRequest::Paged {
                cursor_param,
                cursor_pointer,
                max_pages,
            } => {
                self.fetch_json_paged(&url, cursor_param, cursor_pointer, *max_pages)
                    .await
            }
        };

        let value = payload.and_then(|body| extract_api_count(&body, &api.extraction, &url));
        match value {
            Ok(value) => match u32::try_from(value) {
                Ok(count) if platform.bounds().contains(value) => {
                    tracing::debug!(platform = platform.name(), count, "API tier answered");
                    Tier::Valid(count)
                }
                _ => {
                    tracing::debug!(
                        platform = platform.name(),
                        value,
                        bounds = %platform.bounds(),
                        "API count outside sanity bounds, trying page"
                    );
                    Tier::OutOfBounds(value)
                }
            },
            Err(e) => {
                tracing::debug!(
                    platform = platform.name(),
                    error = %e,
                    "API tier failed, trying page"
                );
                Tier::Failed(e.to_string())
            }
        }
    }

    async fn page_tier(&self, platform: &Platform) -> Tier {
        let url = platform.page_url();
        match self.fetch_page(&url).await {
            Ok(body) => {
                let extraction = extract_count(platform.extractors(), &body, platform.bounds());
                if let Extraction::Valid { count, pattern } = extraction {
                    tracing::debug!(
                        platform = platform.name(),
                        count,
                        pattern,
                        "page pattern matched"
                    );
                }
                Tier::from(extraction)
            }
            Err(e) => {
                tracing::debug!(
                    platform = platform.name(),
                    url = %url,
                    error = %e,
                    "page fetch failed"
                );
                Tier::Failed(e.to_string())
            }
        }
    }
}

/// Fold both tiers into the final status. An out-of-bounds value from either
/// tier outranks a plain failure so a suspicious count is never hidden
/// behind "no match".
fn combine(api: Option<Tier>, page: Tier) -> FetchStatus {
    if let Tier::Valid(count) = page {
        return FetchStatus::Success {
            count,
            source: FetchSource::Page,
        };
    }
    if let Some(Tier::Valid(count)) = api {
        return FetchStatus::Success {
            count,
            source: FetchSource::Api,
        };
    }

    if let Some(Tier::OutOfBounds(value)) = api {
        return FetchStatus::InvalidCount { value };
    }

    match page {
        Tier::OutOfBounds(value) => FetchStatus::InvalidCount { value },
        Tier::Failed(reason) => FetchStatus::NetworkError { reason },
        Tier::NoMatch | Tier::Valid(_) => FetchStatus::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_success_without_api() {
        assert_eq!(
            combine(None, Tier::Valid(42)),
            FetchStatus::Success {
                count: 42,
                source: FetchSource::Page
            }
        );
    }

    #[test]
    fn page_rescues_failed_api() {
        let status = combine(Some(Tier::Failed("timeout".into())), Tier::Valid(7));
        assert!(status.is_success());
    }

    #[test]
    fn api_out_of_bounds_beats_page_no_match() {
        assert_eq!(
            combine(Some(Tier::OutOfBounds(15_000)), Tier::NoMatch),
            FetchStatus::InvalidCount { value: 15_000 }
        );
    }

    #[test]
    fn api_out_of_bounds_beats_page_network_error() {
        assert_eq!(
            combine(Some(Tier::OutOfBounds(0)), Tier::Failed("503".into())),
            FetchStatus::InvalidCount { value: 0 }
        );
    }

    #[test]
    fn page_failure_is_network_error() {
        assert_eq!(
            combine(Some(Tier::NoMatch), Tier::Failed("connect refused".into())),
            FetchStatus::NetworkError {
                reason: "connect refused".into()
            }
        );
    }

    #[test]
    fn page_no_match_after_failed_api() {
        assert_eq!(
            combine(Some(Tier::Failed("bad json".into())), Tier::NoMatch),
            FetchStatus::NoMatch
        );
    }

    #[test]
    fn outcome_value_only_on_success() {
        let ok = FetchOutcome {
            platform: "Beta".into(),
            status: FetchStatus::Success {
                count: 145,
                source: FetchSource::Api,
            },
            elapsed: Duration::ZERO,
            rating: None,
        };
        assert_eq!(ok.value(), Some(145));

        let bad = FetchOutcome {
            status: FetchStatus::InvalidCount { value: 15_000 },
            ..ok
        };
        assert_eq!(bad.value(), None);
    }
}
