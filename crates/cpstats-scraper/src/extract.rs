//! Page-level count extraction.
//!
//! Patterns are compiled once per run from [`PatternSpec`] descriptors and
//! evaluated in priority order against a fetched page. Profile markup drifts,
//! so each platform carries several redundant patterns; the first candidate
//! inside the platform's sanity bounds wins and later patterns are skipped.

use std::cell::OnceCell;
use std::sync::LazyLock;

use cpstats_core::{PatternSpec, SanityBounds};
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static FIRST_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// A compiled extraction strategy.
#[derive(Debug, Clone)]
pub enum Extractor {
    Regex {
        re: Regex,
        strip_tags: bool,
    },
    Labeled {
        label: Selector,
        text: String,
        value: Selector,
    },
}

/// Result of running a platform's extractors over one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// In-bounds count and the index of the pattern that produced it.
    Valid { count: u32, pattern: usize },
    /// Something matched, but no candidate was inside the bounds. Carries the
    /// first rejected value.
    OutOfBounds { value: u64 },
    NoMatch,
}

impl Extractor {
    /// Compile a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidPattern`] when the regex or a CSS
    /// selector does not parse.
    pub fn compile(platform: &str, spec: &PatternSpec) -> Result<Self, ScraperError> {
        let invalid = |pattern: &str, reason: String| ScraperError::InvalidPattern {
            platform: platform.to_string(),
            pattern: pattern.to_string(),
            reason,
        };

        match spec {
            PatternSpec::Regex {
                pattern,
                dot_all,
                strip_tags,
            } => {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .dot_matches_new_line(*dot_all)
                    .build()
                    .map_err(|e| invalid(pattern, e.to_string()))?;
                if re.captures_len() < 2 {
                    return Err(invalid(pattern, "pattern has no capture group".to_string()));
                }
                Ok(Extractor::Regex {
                    re,
                    strip_tags: *strip_tags,
                })
            }
            PatternSpec::Labeled { label, text, value } => {
                let parse = |selector: &str| {
                    Selector::parse(selector).map_err(|e| invalid(selector, format!("{e:?}")))
                };
                Ok(Extractor::Labeled {
                    label: parse(label)?,
                    text: text.trim().to_string(),
                    value: parse(value)?,
                })
            }
        }
    }

    /// Candidate integer produced by this strategy, if any.
    fn candidate(&self, page: &Page<'_>) -> Option<u64> {
        match self {
            Extractor::Regex { re, strip_tags } => {
                let haystack = if *strip_tags { page.text() } else { page.raw };
                parse_digits(re.captures(haystack)?.get(1)?.as_str())
            }
            Extractor::Labeled { label, text, value } => {
                labeled_value(page.document(), label, text, value)
            }
        }
    }
}

/// A fetched payload with lazily derived views, so several patterns can share
/// one tag-stripped copy and one parsed DOM.
struct Page<'a> {
    raw: &'a str,
    text: OnceCell<String>,
    document: OnceCell<Html>,
}

impl<'a> Page<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            text: OnceCell::new(),
            document: OnceCell::new(),
        }
    }

    fn text(&self) -> &str {
        self.text.get_or_init(|| strip_tags(self.raw))
    }

    fn document(&self) -> &Html {
        self.document.get_or_init(|| Html::parse_document(self.raw))
    }
}

/// Replace tags with spaces and collapse whitespace runs.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    WHITESPACE_RE
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// First run of ASCII digits in `text`.
#[must_use]
pub fn first_int(text: &str) -> Option<u64> {
    parse_digits(FIRST_INT_RE.find(text)?.as_str())
}

/// A digit run as a candidate count. Runs too long for `u64` saturate so
/// they are still rejected as implausible rather than read as no match.
fn parse_digits(digits: &str) -> Option<u64> {
    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

fn labeled_value(document: &Html, label: &Selector, text: &str, value: &Selector) -> Option<u64> {
    let mut last_value: Option<ElementRef<'_>> = None;

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        if label.matches(&element) && element.text().collect::<String>().trim() == text {
            if let Some(count) = last_value.and_then(|v| first_int(&v.text().collect::<String>()))
            {
                return Some(count);
            }
        }

        if value.matches(&element) {
            last_value = Some(element);
        }
    }

    None
}

/// Run `extractors` in order over `body`.
///
/// The first candidate inside `bounds` wins. An out-of-bounds candidate does
/// not stop evaluation; it only decides between `OutOfBounds` and `NoMatch`
/// when nothing valid turns up.
#[must_use]
pub fn extract_count(extractors: &[Extractor], body: &str, bounds: &SanityBounds) -> Extraction {
    let page = Page::new(body);
    let mut rejected: Option<u64> = None;

    for (index, extractor) in extractors.iter().enumerate() {
        let Some(value) = extractor.candidate(&page) else {
            continue;
        };

        match u32::try_from(value) {
            Ok(count) if bounds.contains(value) => {
                return Extraction::Valid {
                    count,
                    pattern: index,
                };
            }
            _ => {
                rejected.get_or_insert(value);
            }
        }
    }

    match rejected {
        Some(value) => Extraction::OutOfBounds { value },
        None => Extraction::NoMatch,
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
