//! Declarative per-platform fetch definitions.
//!
//! A [`PlatformSpec`] says where a solved count lives and how to read it.
//! One generic fetch routine in `cpstats-scraper` consumes these records;
//! nothing here performs I/O.

use serde::{Deserialize, Serialize};

/// Exclusive numeric range a freshly extracted count must fall inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanityBounds {
    pub min: i64,
    pub max: i64,
}

impl SanityBounds {
    /// `(0, max)`: zero is rejected along with anything at or above `max`.
    #[must_use]
    pub fn positive(max: u32) -> Self {
        Self {
            min: 0,
            max: i64::from(max),
        }
    }

    /// `(-1, max)`: a legitimate zero is accepted.
    #[must_use]
    pub fn non_negative(max: u32) -> Self {
        Self {
            min: -1,
            max: i64::from(max),
        }
    }

    #[must_use]
    pub fn with_max(self, max: u32) -> Self {
        Self {
            max: i64::from(max),
            ..self
        }
    }

    #[must_use]
    pub fn contains(&self, value: u64) -> bool {
        i64::try_from(value).is_ok_and(|v| v > self.min && v < self.max)
    }
}

impl std::fmt::Display for SanityBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.min, self.max)
    }
}

/// One text-level extraction strategy run against a fetched profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternSpec {
    /// Case-insensitive regex; the first capture group is the count.
    Regex {
        pattern: String,
        /// Let `.` cross newlines.
        #[serde(default)]
        dot_all: bool,
        /// Search the tag-stripped, whitespace-collapsed page text instead of raw HTML.
        #[serde(default)]
        strip_tags: bool,
    },
    /// The nearest `value` element preceding a `label` element whose
    /// trimmed text equals `text` (CSS selectors, document order).
    Labeled {
        label: String,
        text: String,
        value: String,
    },
}

impl PatternSpec {
    #[must_use]
    pub fn regex(pattern: &str) -> Self {
        PatternSpec::Regex {
            pattern: pattern.to_string(),
            dot_all: false,
            strip_tags: false,
        }
    }

    #[must_use]
    pub fn regex_dot_all(pattern: &str) -> Self {
        PatternSpec::Regex {
            pattern: pattern.to_string(),
            dot_all: true,
            strip_tags: false,
        }
    }

    #[must_use]
    pub fn regex_on_text(pattern: &str) -> Self {
        PatternSpec::Regex {
            pattern: pattern.to_string(),
            dot_all: false,
            strip_tags: true,
        }
    }

    #[must_use]
    pub fn labeled(label: &str, text: &str, value: &str) -> Self {
        PatternSpec::Labeled {
            label: label.to_string(),
            text: text.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiRequest {
    Get,
    /// POST `{"query": ..., "variables": {"username": ...}}`.
    #[serde(rename = "graphql")]
    GraphQl { query: String },
    /// Repeated GET over a root-array endpoint that returns a bounded batch
    /// per call. Each request appends `cursor_param=<cursor>`, starting at
    /// zero; the next cursor is one past the largest `cursor_pointer` value
    /// in the batch. An empty batch ends the walk; more than `max_pages`
    /// batches is an error. Batches are concatenated before extraction.
    Paged {
        cursor_param: String,
        cursor_pointer: String,
        max_pages: u32,
    },
}

impl ApiRequest {
    /// Whether the username travels in the URL rather than the request body.
    #[must_use]
    pub fn username_in_url(&self) -> bool {
        !matches!(self, ApiRequest::GraphQl { .. })
    }
}

/// How to read a count out of a structured API payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiExtraction {
    /// JSON pointer to a number (or numeric string).
    Field { pointer: String },
    /// Number of distinct problem keys among accepted submissions.
    ///
    /// `items` points at the submission array (empty for the root),
    /// `verdict` is evaluated per item and compared to `accepted`, and the
    /// `key` pointers are joined to identify a problem.
    DistinctAccepted {
        items: String,
        verdict: String,
        accepted: serde_json::Value,
        key: Vec<String>,
    },
}

/// Where an optional rating lives: one JSON document, four pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSpec {
    pub url_template: String,
    pub current: String,
    pub max: String,
    pub rank: String,
    pub max_rank: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    pub url_template: String,
    pub request: ApiRequest,
    pub extraction: ApiExtraction,
}

/// Static definition of one tracked platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub name: String,
    /// Public profile page; `{username}` / `{username_lower}` placeholders.
    pub endpoint_template: String,
    #[serde(default)]
    pub api: Option<ApiSpec>,
    /// Tried in order; the first in-bounds candidate wins.
    pub patterns: Vec<PatternSpec>,
    pub bounds: SanityBounds,
    #[serde(default)]
    pub rating: Option<RatingSpec>,
}

impl PlatformSpec {
    #[must_use]
    pub fn uses_api(&self) -> bool {
        self.api.is_some()
    }
}

/// Substitute `{username}` and `{username_lower}` in a URL template.
#[must_use]
pub fn expand_template(template: &str, username: &str) -> String {
    template
        .replace("{username_lower}", &username.to_lowercase())
        .replace("{username}", username)
}
